//! Pure comparisons of recompiled templates against on-chain code.
//!
//! Matchers never fail: a missing match is an outcome without a status, so the
//! orchestrator can keep trying fallbacks.

pub mod creation;
pub mod runtime;

pub use creation::{CreationOutcome, Deployment, match_creation};
pub use runtime::{RuntimeOutcome, match_runtime};
