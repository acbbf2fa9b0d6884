use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Explicit category slugs: alphanumeric words joined by single `_` or `-`
    /// - Valid: "Lawyers", "Personal_Injury", "kids-teens", "A1"
    /// - Invalid: "_lead", "trail-", "double__sep", "with space", "a/b"
    pub static ref CATEGORY_SLUG_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9]+(?:[_-][A-Za-z0-9]+)*$").unwrap();

    /// NPI numbers are ten digits
    pub static ref NPI_REGEX: Regex = Regex::new(r"^[0-9]{10}$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_slug_regex_valid() {
        assert!(CATEGORY_SLUG_REGEX.is_match("Lawyers"));
        assert!(CATEGORY_SLUG_REGEX.is_match("Personal_Injury"));
        assert!(CATEGORY_SLUG_REGEX.is_match("kids-teens"));
        assert!(CATEGORY_SLUG_REGEX.is_match("A1"));
    }

    #[test]
    fn test_category_slug_regex_invalid() {
        assert!(!CATEGORY_SLUG_REGEX.is_match("_lead"));
        assert!(!CATEGORY_SLUG_REGEX.is_match("trail-"));
        assert!(!CATEGORY_SLUG_REGEX.is_match("double__sep"));
        assert!(!CATEGORY_SLUG_REGEX.is_match("with space"));
        assert!(!CATEGORY_SLUG_REGEX.is_match("a/b"));
        assert!(!CATEGORY_SLUG_REGEX.is_match(""));
    }

    #[test]
    fn test_npi_regex() {
        assert!(NPI_REGEX.is_match("1234567890"));
        assert!(!NPI_REGEX.is_match("12345"));
        assert!(!NPI_REGEX.is_match("12345abcde"));
    }
}
