//! # Chain Plugins
//!
//! Three plugins wired as a call chain `A → B → C`. Each link calls the next and builds
//! its result from the child's `chain` field:
//!
//! | Plugin | Pattern | Calls | Result on success |
//! |--------|---------|-------|-------------------|
//! | [`a`] | `cmd:A` | `cmd:B` | `"A->B->" + child.chain` |
//! | [`b`] | `cmd:B` | `cmd:C` | `"C->" + child.chain` |
//! | [`c`] | `cmd:C` | – | depends on [`Tail`] |
//!
//! When a child fails, the link logs the error, records it in the [`ErrorLog`](crate::observe::ErrorLog)
//! and then forwards or extinguishes it per [`OnChildError`].

pub mod chain;

pub use chain::{a, b, c, Link, OnChildError, Tail};
