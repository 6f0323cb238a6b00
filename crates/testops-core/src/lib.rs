//! Domain types and contracts shared by every TestOps Copilot layer.

pub mod coverage;
pub mod dispatch;
pub mod error;
pub mod generation;
pub mod gitlab;
pub mod integration;
pub mod model;
pub mod notification;
pub mod preferences;
pub mod session;
pub mod standards;
pub mod storage;
pub mod test_plan;

pub use error::{ApiError, ErrorCode, Result, TestOpsError};
