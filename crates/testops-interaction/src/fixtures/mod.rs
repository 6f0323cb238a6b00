//! Fixed deterministic data served when the remote source is unavailable.
//!
//! Every value here has the same shape as the live payload it stands in for.
//! Nothing is random: per-item metrics derive from
//! [`stable_score`](testops_core::coverage::stable_score).

pub mod coverage;
pub mod model;
pub mod plans;
