pub mod auth;
pub mod integrations;
pub mod suite;
pub mod ui;

use super::action::Action;
use super::state::AppState;

pub fn reduce(state: &mut AppState, action: Action) {
    match action {
        Action::Auth(action) => auth::reduce(&mut state.auth, &mut state.ui, action),
        Action::Tests(action) => suite::reduce(&mut state.tests, action),
        Action::Ui(action) => ui::reduce(&mut state.ui, action),
        Action::Integrations(action) => integrations::reduce(&mut state.integrations, action),
    }
}
