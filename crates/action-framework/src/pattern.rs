//! # Patterns
//!
//! A [`Pattern`] is an immutable, ordered set of `key:value` pairs used both to
//! *register* an action (`cmd:A`) and to *address* one when dispatching.
//!
//! ## Matching
//!
//! A registered pattern matches a query when every registered key is present in the
//! query and the values are equal, or the registered value is the wildcard `*`.
//! Extra keys in the query are ignored, so `cmd:A,role:math` is served by a handler
//! registered for `cmd:A` unless something more specific exists.
//!
//! ## Specificity
//!
//! When several registrations match, [`Specificity`] decides:
//! 1. more keys wins,
//! 2. then fewer wildcard values wins (an exact `cmd:A` beats `cmd:*`),
//! 3. then the most recent registration wins (handled by the registry).

use crate::error::FrameworkError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The wildcard value accepted in registered patterns.
pub const WILDCARD: &str = "*";

/// An immutable ordered mapping of pattern keys to values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern(BTreeMap<String, String>);

/// Ranking of a successful match. Larger is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    keys: usize,
    exact: usize,
}

impl Pattern {
    /// Parses the shorthand text form: `cmd:A`, `cmd:A,role:math` or `cmd:A role:math`.
    pub fn parse(text: &str) -> Result<Self, FrameworkError> {
        let mut pairs = BTreeMap::new();
        for part in text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
        {
            let (key, value) = part
                .split_once(':')
                .ok_or_else(|| FrameworkError::InvalidPattern(text.to_string()))?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                return Err(FrameworkError::InvalidPattern(text.to_string()));
            }
            pairs.insert(key.to_string(), value.to_string());
        }
        if pairs.is_empty() {
            return Err(FrameworkError::InvalidPattern(text.to_string()));
        }
        Ok(Self(pairs))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Tests this (registered) pattern against a query.
    ///
    /// Returns `None` when any registered key is missing from the query or carries a
    /// different value.
    pub fn matches(&self, query: &Pattern) -> Option<Specificity> {
        let mut exact = 0;
        for (key, value) in &self.0 {
            let actual = query.0.get(key)?;
            if value == WILDCARD {
                continue;
            }
            if value != actual {
                return None;
            }
            exact += 1;
        }
        Some(Specificity {
            keys: self.0.len(),
            exact,
        })
    }

    /// A short label for logs and chain rendering: the values joined by `/`.
    ///
    /// `cmd:C` renders as `C`.
    pub fn label(&self) -> String {
        self.0.values().cloned().collect::<Vec<_>>().join("/")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{key}:{value}")?;
        }
        Ok(())
    }
}

impl FromStr for Pattern {
    type Err = FrameworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Conversion used by every API that accepts a pattern.
///
/// Implemented for [`Pattern`] itself and for string shorthand, so callers can write
/// `dispatcher.call("cmd:A", payload)`.
pub trait IntoPattern {
    fn into_pattern(self) -> Result<Pattern, FrameworkError>;
}

impl IntoPattern for Pattern {
    fn into_pattern(self) -> Result<Pattern, FrameworkError> {
        Ok(self)
    }
}

impl IntoPattern for &Pattern {
    fn into_pattern(self) -> Result<Pattern, FrameworkError> {
        Ok(self.clone())
    }
}

impl IntoPattern for &str {
    fn into_pattern(self) -> Result<Pattern, FrameworkError> {
        Pattern::parse(self)
    }
}

impl IntoPattern for String {
    fn into_pattern(self) -> Result<Pattern, FrameworkError> {
        Pattern::parse(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shorthand_forms() {
        let a = Pattern::parse("cmd:A,role:math").unwrap();
        let b = Pattern::parse(" role:math  cmd:A ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get("cmd"), Some("A"));
        assert_eq!(a.to_string(), "cmd:A,role:math");
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(Pattern::parse("").is_err());
        assert!(Pattern::parse("cmd").is_err());
        assert!(Pattern::parse("cmd:").is_err());
        assert!(Pattern::parse(":A").is_err());
    }

    #[test]
    fn wildcard_matches_any_value_but_requires_key() {
        let pin = Pattern::parse("cmd:*").unwrap();
        assert!(pin.matches(&Pattern::parse("cmd:A").unwrap()).is_some());
        assert!(pin.matches(&Pattern::parse("role:x").unwrap()).is_none());
    }

    #[test]
    fn exact_is_more_specific_than_wildcard() {
        let query = Pattern::parse("cmd:A").unwrap();
        let exact = Pattern::parse("cmd:A").unwrap().matches(&query).unwrap();
        let wild = Pattern::parse("cmd:*").unwrap().matches(&query).unwrap();
        assert!(exact > wild);
    }

    #[test]
    fn more_keys_beat_fewer_keys() {
        let query = Pattern::parse("cmd:A,role:math").unwrap();
        let narrow = Pattern::parse("cmd:*,role:math").unwrap().matches(&query).unwrap();
        let broad = Pattern::parse("cmd:A").unwrap().matches(&query).unwrap();
        assert!(narrow > broad);
    }

    #[test]
    fn label_uses_values() {
        assert_eq!(Pattern::parse("cmd:C").unwrap().label(), "C");
    }
}
