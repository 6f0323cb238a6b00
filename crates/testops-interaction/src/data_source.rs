//! Where read paths get their data.
//!
//! Every read method resolves through [`SourceResolver`]: the remote source
//! first, the fixed substitute when the remote one fails. Write paths never
//! go through here and always surface their errors.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use testops_core::error::ApiError;
use tracing::{debug, warn};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DataSource {
    /// Gateway call; the fixed value substitutes on failure.
    #[default]
    Remote,
    /// Fixed deterministic data only. No call is made.
    Fixed,
}

/// A read result together with the source that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: DataSource,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceResolver {
    preferred: DataSource,
}

impl SourceResolver {
    pub fn new(preferred: DataSource) -> Self {
        Self { preferred }
    }

    pub fn preferred(&self) -> DataSource {
        self.preferred
    }

    /// Resolves a read that never fails.
    pub async fn resolve<T, F, Fut>(
        &self,
        operation: &str,
        remote: F,
        fixed: impl FnOnce() -> T,
    ) -> Resolved<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if self.preferred == DataSource::Fixed {
            return serve_fixed(operation, fixed);
        }
        match remote().await {
            Ok(value) => Resolved {
                value,
                source: DataSource::Remote,
            },
            Err(err) => substitute(operation, &err, fixed),
        }
    }

    /// Resolves a read, letting errors selected by `propagate` through
    /// instead of substituting.
    pub async fn try_resolve<T, F, Fut>(
        &self,
        operation: &str,
        remote: F,
        propagate: impl Fn(&ApiError) -> bool,
        fixed: impl FnOnce() -> T,
    ) -> Result<Resolved<T>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if self.preferred == DataSource::Fixed {
            return Ok(serve_fixed(operation, fixed));
        }
        match remote().await {
            Ok(value) => Ok(Resolved {
                value,
                source: DataSource::Remote,
            }),
            Err(err) if propagate(&err) => Err(err),
            Err(err) => Ok(substitute(operation, &err, fixed)),
        }
    }
}

fn serve_fixed<T>(operation: &str, fixed: impl FnOnce() -> T) -> Resolved<T> {
    debug!("[DataSource] {}: serving fixed data", operation);
    Resolved {
        value: fixed(),
        source: DataSource::Fixed,
    }
}

fn substitute<T>(operation: &str, err: &ApiError, fixed: impl FnOnce() -> T) -> Resolved<T> {
    warn!(
        "[DataSource] {} failed ({}), substituting fixed data",
        operation, err
    );
    Resolved {
        value: fixed(),
        source: DataSource::Fixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use testops_core::error::ErrorCode;

    #[tokio::test]
    async fn test_remote_success_is_used() {
        let resolved = SourceResolver::default()
            .resolve("stats", || async { Ok(1) }, || 2)
            .await;
        assert_eq!(resolved.value, 1);
        assert_eq!(resolved.source, DataSource::Remote);
    }

    #[tokio::test]
    async fn test_failure_substitutes_fixed() {
        let resolved = SourceResolver::default()
            .resolve(
                "stats",
                || async { Err(ApiError::network("down")) },
                || 2,
            )
            .await;
        assert_eq!(resolved.value, 2);
        assert_eq!(resolved.source, DataSource::Fixed);
    }

    #[tokio::test]
    async fn test_fixed_preference_skips_remote() {
        let called = AtomicBool::new(false);
        let resolved = SourceResolver::new(DataSource::Fixed)
            .resolve(
                "stats",
                || async {
                    called.store(true, Ordering::SeqCst);
                    Ok(1)
                },
                || 2,
            )
            .await;
        assert_eq!(resolved.value, 2);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_selected_errors_propagate() {
        let err = SourceResolver::default()
            .try_resolve(
                "completion",
                || async { Err::<u32, _>(ApiError::from_code(ErrorCode::RateLimit)) },
                |e| e.code == ErrorCode::RateLimit,
                || 0,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimit);
    }
}
