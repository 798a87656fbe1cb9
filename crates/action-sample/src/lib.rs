//! # Action Sample Library
//!
//! The chain plugins, scenarios and two-node lifecycle, exposed for integration testing.

pub mod error;
pub mod lifecycle;
pub mod observe;
pub mod plugins;
pub mod scenario;
