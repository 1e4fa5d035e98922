//! Dot-segment key patterns
//!
//! Keys and patterns are split on `.`. A `*` segment matches exactly one key
//! segment, a trailing `**` matches zero or more remaining segments, and any
//! other segment must equal the key segment exactly.

use std::fmt;

use tamarind_common::{Result, TamarindError};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Single,
    Rest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl KeyPattern {
    /// Parse a pattern
    ///
    /// Rejects empty patterns, empty segments, `**` anywhere but the last
    /// segment, and segments that mix `*` with other characters.
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(TamarindError::validation("pattern must not be empty"));
        }

        let parts: Vec<&str> = pattern.split('.').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let segment = match *part {
                "" => {
                    return Err(TamarindError::validation(format!(
                        "pattern '{}' has an empty segment",
                        pattern
                    )));
                }
                "*" => Segment::Single,
                "**" if i == last => Segment::Rest,
                "**" => {
                    return Err(TamarindError::validation(format!(
                        "pattern '{}' may only use '**' as its final segment",
                        pattern
                    )));
                }
                literal if literal.contains('*') => {
                    return Err(TamarindError::validation(format!(
                        "pattern '{}' mixes '*' with other characters in segment '{}'",
                        pattern, literal
                    )));
                }
                literal => Segment::Literal(literal.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `key` matches; empty keys and keys with empty segments never do
    pub fn matches(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let parts: Vec<&str> = key.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return false;
        }

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Rest => return true,
                Segment::Single => {
                    if i >= parts.len() {
                        return false;
                    }
                }
                Segment::Literal(literal) => {
                    if parts.get(i) != Some(&literal.as_str()) {
                        return false;
                    }
                }
            }
        }
        self.segments.len() == parts.len()
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl std::str::FromStr for KeyPattern {
    type Err = TamarindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn matches(pattern: &str, key: &str) -> bool {
        KeyPattern::parse(pattern).unwrap().matches(key)
    }

    #[test]
    fn test_single_wildcard_matches_one_segment() {
        assert!(matches("db.*", "db.host"));
        assert!(!matches("db.*", "db.primary.host"));
        assert!(!matches("db.*", "db"));
        assert!(!matches("db.*", "cache.host"));
    }

    #[test]
    fn test_inner_wildcard() {
        assert!(matches("api.*.timeout", "api.v2.timeout"));
        assert!(!matches("api.*.timeout", "api.v2.retries"));
        assert!(!matches("api.*.timeout", "api.timeout"));
    }

    #[test]
    fn test_double_star_matches_everything() {
        assert!(matches("**", "anything"));
        assert!(matches("**", "a.b.c"));
        assert!(!matches("**", ""));
    }

    #[test]
    fn test_trailing_double_star() {
        assert!(matches("feature.**", "feature"));
        assert!(matches("feature.**", "feature.checkout"));
        assert!(matches("feature.**", "feature.checkout.v2"));
        assert!(!matches("feature.**", "features.checkout"));
    }

    #[test]
    fn test_exact_literal() {
        assert!(matches("db.host", "db.host"));
        assert!(!matches("db.host", "db.hostname"));
        assert!(!matches("db.host", "db"));
    }

    #[test]
    fn test_malformed_keys_never_match() {
        assert!(!matches("**", "db..host"));
        assert!(!matches("db.*", "db."));
    }

    #[test]
    fn test_parse_rejects_invalid_patterns() {
        assert!(KeyPattern::parse("").is_err());
        assert!(KeyPattern::parse("db..host").is_err());
        assert!(KeyPattern::parse("**.host").is_err());
        assert!(KeyPattern::parse("db.**.host").is_err());
        assert!(KeyPattern::parse("db.host*").is_err());
    }

    proptest! {
        #[test]
        fn prop_literal_pattern_matches_itself(key in "[a-z]{1,6}(\\.[a-z]{1,6}){0,4}") {
            prop_assert!(matches(&key, &key));
            prop_assert!(matches("**", &key));
        }

        #[test]
        fn prop_single_star_count_must_equal_segments(
            key in "[a-z]{1,6}(\\.[a-z]{1,6}){0,4}",
            extra in 1usize..3,
        ) {
            let n = key.split('.').count();
            let exact = vec!["*"; n].join(".");
            let longer = vec!["*"; n + extra].join(".");
            prop_assert!(matches(&exact, &key));
            prop_assert!(!matches(&longer, &key));
        }
    }
}
