//! Slug helpers shared by categories and listings.
//!
//! Categories keep case and join words with `_` (`Beard Care` -> `Beard_Care`),
//! listings use lowercase ASCII joined with `-` (`Smith & Associates` -> `smith-associates`).

use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

lazy_static! {
    static ref NON_ALNUM_RUN: Regex = Regex::new(r"[^A-Za-z0-9]+").unwrap();
    static ref DASH_OR_SPACE_RUN: Regex = Regex::new(r"[-\s]+").unwrap();
}

/// Fallback used when a category name contains no alphanumerics
pub const DEFAULT_CATEGORY_SLUG: &str = "Category";

/// Case-preserving category slug: every non-alphanumeric run becomes `_`, edges trimmed
pub fn make_category_slug(name: &str) -> String {
    let replaced = NON_ALNUM_RUN.replace_all(name.trim(), "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        DEFAULT_CATEGORY_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Lowercase URL slug for listings; returns an empty string when nothing survives
pub fn slugify(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_ascii())
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_ascii_whitespace())
        .collect();

    DASH_OR_SPACE_RUN
        .replace_all(&kept, "-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}

/// `slugify(value)` or `fallback` when the value has no usable characters
pub fn slugify_or(value: &str, fallback: &str) -> String {
    let slug = slugify(value);
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// First free candidate among `base`, `base{sep}{first}`, `base{sep}{first + 1}`, ...
pub fn disambiguate<F>(base: &str, separator: char, first_suffix: u32, is_taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    if !is_taken(base) {
        return base.to_string();
    }

    let mut n = first_suffix;
    loop {
        let candidate = format!("{}{}{}", base, separator, n);
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Collision-free slug for bulk imports: `slugify(name)-` plus 8 random hex chars
pub fn import_slug(name: &str, fallback: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", slugify_or(name, fallback), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_make_category_slug_preserves_case() {
        assert_eq!(make_category_slug("Beard Care"), "Beard_Care");
        assert_eq!(
            make_category_slug("Personal Injury Lawyers"),
            "Personal_Injury_Lawyers"
        );
        assert_eq!(make_category_slug("  --Kids & Teens!! "), "Kids_Teens");
    }

    #[test]
    fn test_make_category_slug_fallback() {
        assert_eq!(make_category_slug(""), "Category");
        assert_eq!(make_category_slug("&&&"), "Category");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Smith & Associates"), "smith-associates");
        assert_eq!(slugify("  Dr. Jane   Doe, MD "), "dr-jane-doe-md");
        assert_eq!(slugify("already-slugged"), "already-slugged");
        assert_eq!(slugify("__edge__"), "edge");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_or_fallback() {
        assert_eq!(slugify_or("???", "business"), "business");
        assert_eq!(slugify_or("Acme", "business"), "acme");
    }

    #[test]
    fn test_disambiguate_category_style() {
        let taken: HashSet<&str> = ["Lawyers", "Lawyers_2"].into_iter().collect();
        assert_eq!(
            disambiguate("Lawyers", '_', 2, |s| taken.contains(s)),
            "Lawyers_3"
        );
        assert_eq!(disambiguate("Doctors", '_', 2, |s| taken.contains(s)), "Doctors");
    }

    #[test]
    fn test_disambiguate_listing_style() {
        let taken: HashSet<&str> = ["acme"].into_iter().collect();
        assert_eq!(disambiguate("acme", '-', 1, |s| taken.contains(s)), "acme-1");
    }

    #[test]
    fn test_import_slug_shape() {
        let slug = import_slug("Acme Law", "business");
        assert!(slug.starts_with("acme-law-"));
        assert_eq!(slug.len(), "acme-law-".len() + 8);
    }
}
