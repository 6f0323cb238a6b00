use tracing::warn;

use super::super::action::IntegrationsAction;
use super::super::state::IntegrationsState;

pub fn reduce(state: &mut IntegrationsState, action: IntegrationsAction) {
    match action {
        IntegrationsAction::Connected { id, settings, now } => {
            if let Some(integration) = state.get_mut(&id) {
                integration.connect(settings, &now);
                state.status.error = None;
            } else {
                warn!("[Store] Unknown integration: {}", id);
            }
        }
        IntegrationsAction::Disconnected(id) => {
            if let Some(integration) = state.get_mut(&id) {
                integration.disconnect();
            }
        }
        IntegrationsAction::Synced { id, now } => {
            if let Some(integration) = state.get_mut(&id) {
                if !integration.sync(&now) {
                    warn!("[Store] Sync ignored, {} is not connected", id);
                }
            }
        }
        IntegrationsAction::Failed { id, message } => {
            if let Some(integration) = state.get_mut(&id) {
                integration.mark_error();
            }
            state.status.fail(message);
        }
    }
}
