//! Application layer: the client store and the operations that drive it.

pub mod bootstrap;
pub mod session_guard;
pub mod store;
pub mod usecase;

pub use bootstrap::Bootstrap;
pub use session_guard::SessionGuard;
pub use store::{Action, AppState, Field, Store, View};
pub use usecase::CopilotUseCase;
