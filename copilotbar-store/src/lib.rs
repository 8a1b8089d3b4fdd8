// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `CopilotBar` Store
//!
//! State management and persistence for the `CopilotBar` application.
//!
//! This crate provides:
//!
//! - **`KeyValueStore`**: The persistent key-value collaborator (`store.json`)
//! - **`HistoryStore`**: 60-day rolling daily usage on top of the key-value store
//! - **`CredentialStore`**: Stored token with environment fallbacks
//! - **`UsageStore`**: Latest snapshot and connection state with watch channels
//! - **`SettingsStore`**: User preferences with persistence
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use copilotbar_store::{HistoryStore, JsonFileStore, UsageStore};
//!
//! let kv = Arc::new(JsonFileStore::open_default());
//! let history = HistoryStore::new(kv.clone());
//! history.record_daily(today, 42).await?;
//!
//! let usage = UsageStore::new();
//! let mut rx = usage.subscribe();
//! while rx.changed().await.is_ok() {
//!     println!("Usage updated!");
//! }
//! ```

pub mod credentials;
pub mod error;
pub mod history;
pub mod kv;
pub mod persistence;
pub mod settings_store;
pub mod usage_store;

pub use credentials::{CredentialSource, CredentialStore, ENV_TOKEN_VARS};
pub use error::StoreError;
pub use history::{HistoryStore, MAX_HISTORY_DAYS};
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore, keys};
pub use persistence::{
    default_config_dir, default_data_path, default_settings_path, ensure_dir, load_json,
    load_json_if_exists, save_json,
};
pub use settings_store::{DEFAULT_API_BASE_URL, LogLevel, RefreshCadence, Settings, SettingsStore};
pub use usage_store::{ConnectionState, UsageStore};
