//! Ordering of overlapping asynchronous dispatches.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// How settlements of overlapping dispatches against the same slice field
/// are committed.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommitPolicy {
    /// Every settlement commits; the last one to settle wins.
    #[default]
    LastSettledWins,
    /// A settlement is dropped when a later dispatch has already committed.
    LastDispatchedWins,
}

impl CommitPolicy {
    /// Whether a settlement of dispatch `sequence` may commit, given the
    /// highest sequence committed so far.
    pub fn admits(self, sequence: u64, last_committed: Option<u64>) -> bool {
        match self {
            Self::LastSettledWins => true,
            Self::LastDispatchedWins => last_committed.is_none_or(|last| sequence > last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_settled_always_admits() {
        assert!(CommitPolicy::LastSettledWins.admits(1, Some(2)));
        assert!(CommitPolicy::LastSettledWins.admits(3, None));
    }

    #[test]
    fn test_last_dispatched_drops_stale() {
        let policy = CommitPolicy::LastDispatchedWins;
        assert!(policy.admits(1, None));
        assert!(policy.admits(3, Some(2)));
        assert!(!policy.admits(1, Some(2)));
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "last_dispatched_wins".parse::<CommitPolicy>().unwrap(),
            CommitPolicy::LastDispatchedWins
        );
    }
}
