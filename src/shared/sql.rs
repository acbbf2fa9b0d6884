//! Helpers for building `LIKE` / `ILIKE` patterns from user input.
//!
//! Every pattern produced here must be used with `ESCAPE '\'`.

/// Escape `\`, `%` and `_` so they match literally
pub fn like_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `%value%`
pub fn contains_pattern(value: &str) -> String {
    format!("%{}%", like_escape(value))
}

/// `value%`
pub fn prefix_pattern(value: &str) -> String {
    format!("{}%", like_escape(value))
}

/// Pattern matching strict descendants of a materialized path: `path/%`
pub fn descendants_pattern(full_slug: &str) -> String {
    format!("{}/%", like_escape(full_slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_escape() {
        assert_eq!(like_escape("plain"), "plain");
        assert_eq!(like_escape("50%_off"), r"50\%\_off");
        assert_eq!(like_escape(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_patterns() {
        assert_eq!(contains_pattern("smith"), "%smith%");
        assert_eq!(prefix_pattern("Law"), "Law%");
        assert_eq!(
            descendants_pattern("Legal/Personal_Injury"),
            r"Legal/Personal\_Injury/%"
        );
    }
}
