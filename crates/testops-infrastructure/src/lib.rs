pub mod config;
pub mod kv_file_store;
pub mod paths;
pub mod persisted_state;
pub mod secret_storage;
pub mod storage;

pub use crate::config::AppConfig;
pub use crate::kv_file_store::FileKeyValueStore;
pub use crate::paths::TestOpsPaths;
pub use crate::persisted_state::PersistedState;
pub use crate::secret_storage::{SecretConfig, SecretStorage, SecretStorageError};
