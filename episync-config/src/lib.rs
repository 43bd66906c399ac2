//! Shared configuration library for episync.
//!
//! Centralizes the typed config model and its environment loading and
//! validation rules, so the CLI and any embedding process read
//! credentials and sync policy the same way. Credentials are opaque
//! here: nothing parses or validates token formats beyond non-emptiness.

pub mod loader;
pub mod models;

pub use loader::{ConfigError, load_from};
pub use models::{AnilistConfig, Config, CrunchyrollConfig, SyncConfig};
