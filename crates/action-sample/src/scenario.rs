//! The error-propagation scenarios the sample runs, each a different wiring of the
//! same `A → B → C` chain.

use crate::plugins::{OnChildError, Tail};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// C fails; B and A forward. The client sees C's error with chain `[C, B, A]`.
    ForwardedError,
    /// C has no handler; the `NotFound` error is forwarded without waiting for a timeout.
    MissingHandler,
    /// C never completes. C's timer, capped below B's and A's deadlines, fires first and
    /// the timeout is forwarded with chain `[C, B, A]`.
    SilentHandler,
    /// C fails; B sees it and forwards, A extinguishes it. The client gets `Ok`.
    ObservedAtIntermediate,
    /// C reports failure inside a successful result. No error exists anywhere.
    ErrorInResult,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::ForwardedError,
        Scenario::MissingHandler,
        Scenario::SilentHandler,
        Scenario::ObservedAtIntermediate,
        Scenario::ErrorInResult,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::ForwardedError => "forwarded-error",
            Scenario::MissingHandler => "missing-handler",
            Scenario::SilentHandler => "silent-handler",
            Scenario::ObservedAtIntermediate => "observed-at-intermediate",
            Scenario::ErrorInResult => "error-in-result",
        }
    }

    /// Error policy of A, error policy of B, behavior of C.
    pub fn wiring(&self) -> (OnChildError, OnChildError, Tail) {
        use OnChildError::{Extinguish, Forward};
        match self {
            Scenario::ForwardedError => (Forward, Forward, Tail::Fail),
            Scenario::MissingHandler => (Forward, Forward, Tail::Missing),
            Scenario::SilentHandler => (Forward, Forward, Tail::Silent),
            Scenario::ObservedAtIntermediate => (Extinguish, Forward, Tail::Fail),
            Scenario::ErrorInResult => (Forward, Forward, Tail::ErrorInResult),
        }
    }

    /// Whether the root caller should receive an error.
    pub fn expects_error(&self) -> bool {
        matches!(
            self,
            Scenario::ForwardedError | Scenario::MissingHandler | Scenario::SilentHandler
        )
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
