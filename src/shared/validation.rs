use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating report category slugs
    /// Must be lowercase alphanumeric with hyphens
    /// - Valid: "infrastructure", "public-safety", "road2"
    /// - Invalid: "-roads", "roads-", "road--works", "Roads", "road_works"
    pub static ref CATEGORY_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_regex_valid() {
        assert!(CATEGORY_REGEX.is_match("infrastructure"));
        assert!(CATEGORY_REGEX.is_match("public-safety"));
        assert!(CATEGORY_REGEX.is_match("road2"));
        assert!(CATEGORY_REGEX.is_match("a"));
        assert!(CATEGORY_REGEX.is_match("a-b-c"));
    }

    #[test]
    fn test_category_regex_invalid() {
        assert!(!CATEGORY_REGEX.is_match("-roads")); // starts with hyphen
        assert!(!CATEGORY_REGEX.is_match("roads-")); // ends with hyphen
        assert!(!CATEGORY_REGEX.is_match("road--works")); // double hyphen
        assert!(!CATEGORY_REGEX.is_match("Roads")); // uppercase
        assert!(!CATEGORY_REGEX.is_match("road_works")); // underscore
        assert!(!CATEGORY_REGEX.is_match("")); // empty
        assert!(!CATEGORY_REGEX.is_match("road works")); // space
    }
}
