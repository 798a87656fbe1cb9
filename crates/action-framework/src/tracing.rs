//! # Observability & Tracing
//!
//! Every component logs through `tracing` with structured fields, so a failing chain can be
//! followed hop by hop:
//!
//! - `call_id` / `parent`: identity and lineage of a call (short form, first 12 hex digits)
//! - `pattern`: the dispatched pattern
//! - `kind` / `error`: classification and message of a failed completion
//! - `peer` / `addr`: transport endpoints
//!
//! ## Levels
//!
//! | Level | What you see |
//! |-------|--------------|
//! | `info` | Node start/stop, listeners bound, transport clients started |
//! | `warn` | Failed calls, timeouts, transport faults, ignored repeat completions |
//! | `error` | Handler panics, observer panics, unobserved failures closing a node |
//! | `debug` | Every dispatch and completion, route/action registration, connections |
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run -p action-sample
//! RUST_LOG=action_framework=debug cargo run -p action-sample
//! ```
//!
//! A failing forwarded chain at `warn` reads innermost first:
//!
//! ```text
//! WARN Call failed call_id=3f9c0a1b2d4e pattern=cmd:C kind=handler-error error=test elapsed_ms=0
//! WARN Call failed call_id=77ab01cc9e12 pattern=cmd:B kind=handler-error error=test elapsed_ms=1
//! WARN Call failed call_id=c04d5e6f7a8b pattern=cmd:A kind=handler-error error=test elapsed_ms=1
//! ```

/// Installs the global subscriber. Filtering comes from `RUST_LOG`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
