//! Records every place an error was seen: inside a chain link that received a failed
//! child completion, or in a node's global error hook.

use action_framework::{ActError, CallInfo, ErrorKind, ErrorObserver, Pattern};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Site {
    /// A handler saw its child fail.
    Link { pattern: String },
    /// A node's error hook ran for a failed call.
    Hook { node: &'static str, pattern: String },
}

#[derive(Debug, Clone)]
pub struct Observation {
    pub site: Site,
    pub kind: ErrorKind,
    pub message: String,
    pub chain: Vec<String>,
}

impl Observation {
    fn new(site: Site, err: &ActError) -> Self {
        Self {
            site,
            kind: err.kind,
            message: err.message.clone(),
            chain: err.chain_labels(),
        }
    }
}

/// Shared, append-only observation log.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Arc<Mutex<Vec<Observation>>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_link(&self, at: &Pattern, err: &ActError) {
        self.push(Observation::new(
            Site::Link {
                pattern: at.to_string(),
            },
            err,
        ));
    }

    /// An error observer that records into this log under `node`.
    pub fn hook(&self, node: &'static str) -> impl ErrorObserver {
        let log = self.clone();
        move |err: &ActError, call: &CallInfo| {
            log.push(Observation::new(
                Site::Hook {
                    node,
                    pattern: call.pattern.to_string(),
                },
                err,
            ))
        }
    }

    pub fn all(&self) -> Vec<Observation> {
        self.lock().clone()
    }

    /// Patterns of the links that saw a child fail, in order.
    pub fn links(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|o| match &o.site {
                Site::Link { pattern } => Some(pattern.clone()),
                Site::Hook { .. } => None,
            })
            .collect()
    }

    /// Patterns reported by `node`'s error hook.
    pub fn hooks(&self, node: &str) -> Vec<String> {
        let mut seen: Vec<String> = self
            .lock()
            .iter()
            .filter_map(|o| match &o.site {
                Site::Hook { node: n, pattern } if *n == node => Some(pattern.clone()),
                _ => None,
            })
            .collect();
        // Hooks of independent calls may interleave.
        seen.sort();
        seen
    }

    fn push(&self, observation: Observation) {
        self.lock().push(observation);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Observation>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
