//! The client store.
//!
//! The single shared mutable resource. State changes only through
//! [`Store::dispatch`] and [`Store::settle`], both of which run a reducer
//! under the store lock.

mod action;
mod reducer;
mod state;

pub use action::{Action, AuthAction, IntegrationsAction, TestsAction, UiAction};
pub use reducer::auth::SESSION_EXPIRED_MESSAGE;
pub use state::{
    AppState, AuthState, IntegrationsState, RequestStatus, Slice, TestsState, UiState, View,
};

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use testops_core::dispatch::CommitPolicy;
use tracing::debug;

/// Slice fields written by asynchronous operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Session,
    GeneratedCode,
    Coverage,
    Duplicates,
    Validation,
    TestPlans,
    Integrations,
}

impl Field {
    pub fn slice(self) -> Slice {
        match self {
            Field::Session => Slice::Auth,
            Field::GeneratedCode
            | Field::Coverage
            | Field::Duplicates
            | Field::Validation
            | Field::TestPlans => Slice::Tests,
            Field::Integrations => Slice::Integrations,
        }
    }
}

/// Receipt of a started operation, redeemed by [`Store::settle`].
#[derive(Debug)]
#[must_use = "an operation must be settled"]
pub struct Ticket {
    field: Field,
    sequence: u64,
}

impl Ticket {
    pub fn field(&self) -> Field {
        self.field
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

struct Inner {
    state: AppState,
    next_sequence: u64,
    committed: HashMap<Field, u64>,
}

pub struct Store {
    inner: Mutex<Inner>,
    policy: CommitPolicy,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(AppState::default(), CommitPolicy::default())
    }
}

impl Store {
    pub fn new(state: AppState, policy: CommitPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                next_sequence: 0,
                committed: HashMap::new(),
            }),
            policy,
        }
    }

    pub fn policy(&self) -> CommitPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A copy of the whole state.
    pub fn snapshot(&self) -> AppState {
        self.lock().state.clone()
    }

    pub fn select<R>(&self, selector: impl FnOnce(&AppState) -> R) -> R {
        selector(&self.lock().state)
    }

    pub fn dispatch(&self, action: Action) {
        debug!("[Store] {}", action.label());
        reducer::reduce(&mut self.lock().state, action);
    }

    /// Marks an operation on `field` as pending and numbers it.
    pub fn begin(&self, field: Field) -> Ticket {
        let mut inner = self.lock();
        inner.next_sequence += 1;
        let sequence = inner.next_sequence;
        inner.state.status_mut(field.slice()).start();
        debug!("[Store] {:?} pending (#{})", field, sequence);
        Ticket { field, sequence }
    }

    /// Finishes a pending operation and commits `action` if the commit
    /// policy admits it. Returns whether it was committed.
    pub fn settle(&self, ticket: Ticket, action: Action) -> bool {
        let mut inner = self.lock();
        inner.state.status_mut(ticket.field.slice()).finish();

        let last = inner.committed.get(&ticket.field).copied();
        if !self.policy.admits(ticket.sequence, last) {
            debug!(
                "[Store] {:?} #{} dropped, #{} already committed",
                ticket.field,
                ticket.sequence,
                last.unwrap_or_default()
            );
            return false;
        }

        let committed = last.map_or(ticket.sequence, |l| l.max(ticket.sequence));
        inner.committed.insert(ticket.field, committed);
        debug!("[Store] {:?} #{} {}", ticket.field, ticket.sequence, action.label());
        reducer::reduce(&mut inner.state, action);
        true
    }

    /// Ends the current session if there is one. Returns true only for the
    /// caller that actually ended it.
    pub fn end_session(&self) -> bool {
        let mut inner = self.lock();
        if !inner.state.auth.is_authenticated() {
            return false;
        }
        reducer::reduce(&mut inner.state, Action::Auth(AuthAction::SessionExpired));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testops_core::coverage::CoverageSnapshot;

    fn coverage(total: u32) -> Action {
        Action::Tests(TestsAction::CoverageFulfilled(CoverageSnapshot::new(total, 0)))
    }

    fn total(store: &Store) -> Option<u32> {
        store.select(|s| s.tests.coverage.as_ref().map(|c| c.total()))
    }

    #[test]
    fn test_last_settled_wins() {
        let store = Store::default();
        let first = store.begin(Field::Coverage);
        let second = store.begin(Field::Coverage);
        assert!(store.select(|s| s.tests.status.loading));

        assert!(store.settle(second, coverage(2)));
        assert!(store.select(|s| s.tests.status.loading));
        assert!(store.settle(first, coverage(1)));

        assert_eq!(total(&store), Some(1));
        assert!(!store.select(|s| s.tests.status.loading));
    }

    #[test]
    fn test_last_dispatched_wins_drops_stale() {
        let store = Store::new(AppState::default(), CommitPolicy::LastDispatchedWins);
        let first = store.begin(Field::Coverage);
        let second = store.begin(Field::Coverage);

        assert!(store.settle(second, coverage(2)));
        assert!(!store.settle(first, coverage(1)));

        assert_eq!(total(&store), Some(2));
        assert!(!store.select(|s| s.tests.status.loading));
    }

    #[test]
    fn test_fields_are_ordered_independently() {
        let store = Store::new(AppState::default(), CommitPolicy::LastDispatchedWins);
        let coverage_ticket = store.begin(Field::Coverage);
        let plans_ticket = store.begin(Field::TestPlans);

        assert!(store.settle(plans_ticket, Action::Tests(TestsAction::PlansFulfilled(vec![]))));
        assert!(store.settle(coverage_ticket, coverage(3)));
        assert_eq!(total(&store), Some(3));
    }

    #[test]
    fn test_end_session_once() {
        let store = Store::new(
            AppState::seeded(Some("t1".into()), Default::default(), 5),
            CommitPolicy::default(),
        );
        assert!(store.end_session());
        assert!(!store.end_session());
        assert_eq!(store.select(|s| s.ui.current_view), View::Login);
        assert_eq!(store.select(|s| s.ui.notifications.len()), 1);
    }
}
