//! # Action Registry
//!
//! Maps registered [`Pattern`]s to a bound value. The dispatcher keeps two of these:
//! one for local handlers and one for transport routes (client pins), so both use
//! identical precedence rules.
//!
//! Resolution picks the most specific matching registration (see
//! [`Specificity`](crate::pattern::Specificity)); full ties go to the most recent
//! registration.

use crate::error::FrameworkError;
use crate::pattern::Pattern;
use serde::Deserialize;

/// What happens when a pattern is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverridePolicy {
    /// The newer registration replaces the older one.
    #[default]
    LastWins,
    /// The second registration fails with [`FrameworkError::DuplicatePattern`].
    Forbid,
}

/// One binding held by a [`Registry`].
#[derive(Debug, Clone)]
pub struct Registration<T> {
    pub pattern: Pattern,
    pub value: T,
    /// Plugin (or component) that added the binding.
    pub owner: String,
    seq: u64,
}

#[derive(Debug)]
pub struct Registry<T> {
    entries: Vec<Registration<T>>,
    next_seq: u64,
    policy: OverridePolicy,
}

impl<T> Registry<T> {
    pub fn new(policy: OverridePolicy) -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
            policy,
        }
    }

    pub fn register(
        &mut self,
        pattern: Pattern,
        value: T,
        owner: impl Into<String>,
    ) -> Result<(), FrameworkError> {
        if let Some(pos) = self.entries.iter().position(|e| e.pattern == pattern) {
            if self.policy == OverridePolicy::Forbid {
                return Err(FrameworkError::DuplicatePattern(pattern));
            }
            self.entries.remove(pos);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Registration {
            pattern,
            value,
            owner: owner.into(),
            seq,
        });
        Ok(())
    }

    /// Finds the most specific registration matching `query`.
    pub fn resolve(&self, query: &Pattern) -> Option<&Registration<T>> {
        self.entries
            .iter()
            .filter_map(|e| e.pattern.matches(query).map(|s| (s, e.seq, e)))
            .max_by_key(|(rank, seq, _)| (*rank, *seq))
            .map(|(_, _, e)| e)
    }

    pub fn list(&self) -> impl Iterator<Item = &Registration<T>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every binding added by `owner`. Returns how many were removed.
    pub fn remove_owner(&mut self, owner: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.owner != owner);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new(OverridePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Pattern {
        Pattern::parse(s).unwrap()
    }

    #[test]
    fn exact_beats_wildcard_regardless_of_order() {
        let mut reg = Registry::default();
        reg.register(p("cmd:A"), "exact", "a").unwrap();
        reg.register(p("cmd:*"), "wild", "w").unwrap();

        assert_eq!(reg.resolve(&p("cmd:A")).unwrap().value, "exact");
        assert_eq!(reg.resolve(&p("cmd:B")).unwrap().value, "wild");
        assert!(reg.resolve(&p("role:x")).is_none());
    }

    #[test]
    fn more_keys_win() {
        let mut reg = Registry::default();
        reg.register(p("cmd:A,role:math"), "narrow", "n").unwrap();
        reg.register(p("cmd:A"), "broad", "b").unwrap();

        assert_eq!(reg.resolve(&p("cmd:A,role:math")).unwrap().value, "narrow");
        assert_eq!(reg.resolve(&p("cmd:A")).unwrap().value, "broad");
    }

    #[test]
    fn ties_go_to_latest_registration() {
        let mut reg = Registry::default();
        reg.register(p("cmd:*"), "first", "x").unwrap();
        reg.register(p("role:*"), "second", "y").unwrap();

        assert_eq!(reg.resolve(&p("cmd:A,role:b")).unwrap().value, "second");
    }

    #[test]
    fn override_policy() {
        let mut last_wins = Registry::new(OverridePolicy::LastWins);
        last_wins.register(p("cmd:A"), 1, "x").unwrap();
        last_wins.register(p("cmd:A"), 2, "y").unwrap();
        assert_eq!(last_wins.len(), 1);
        assert_eq!(last_wins.resolve(&p("cmd:A")).unwrap().value, 2);

        let mut forbid = Registry::new(OverridePolicy::Forbid);
        forbid.register(p("cmd:A"), 1, "x").unwrap();
        let err = forbid.register(p("cmd:A"), 2, "y").unwrap_err();
        assert!(matches!(err, FrameworkError::DuplicatePattern(_)));
    }

    #[test]
    fn remove_owner_in_bulk() {
        let mut reg = Registry::default();
        reg.register(p("cmd:A"), (), "plugin-a").unwrap();
        reg.register(p("cmd:B"), (), "plugin-a").unwrap();
        reg.register(p("cmd:C"), (), "plugin-c").unwrap();

        assert_eq!(reg.remove_owner("plugin-a"), 2);
        assert_eq!(reg.len(), 1);
        reg.clear();
        assert!(reg.is_empty());
    }
}
