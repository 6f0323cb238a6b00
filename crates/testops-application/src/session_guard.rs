//! Bridges the gateway's session hooks to the store.

use std::sync::Arc;

use async_trait::async_trait;
use testops_infrastructure::PersistedState;
use testops_interaction::{TokenSource, UnauthorizedHandler};
use tracing::{error, warn};

use crate::store::Store;

pub use crate::store::SESSION_EXPIRED_MESSAGE;

/// Supplies the store's bearer credential to the gateway and ends the
/// session when the backend answers 401.
#[derive(Clone)]
pub struct SessionGuard {
    store: Arc<Store>,
    persisted: PersistedState,
}

impl SessionGuard {
    pub fn new(store: Arc<Store>, persisted: PersistedState) -> Self {
        Self { store, persisted }
    }
}

impl TokenSource for SessionGuard {
    fn bearer_token(&self) -> Option<String> {
        self.store.select(|state| state.auth.token.clone())
    }
}

#[async_trait]
impl UnauthorizedHandler for SessionGuard {
    async fn on_unauthorized(&self) {
        // Concurrent 401s race here; only the first one ends the session.
        if !self.store.end_session() {
            return;
        }
        warn!("[Auth] Session ended by 401");
        if let Err(e) = self.persisted.clear_token().await {
            error!("[Auth] Failed to clear persisted token: {}", e);
        }
    }
}
