pub mod api;
pub mod assets;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod proxy;
pub mod storage;

// Re-export commonly used types for easier testing
pub use crate::api::AppState;
pub use crate::config::Config;
pub use crate::dispatch::{CommandDispatch, SsmDispatcher};
pub use crate::error::RelayError;
pub use crate::storage::{ObjectStore, S3ObjectStore};
