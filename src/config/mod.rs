//! Configuration management module for cronsync
//!
//! Layered loading, lowest priority first:
//! 1. `default.toml`
//! 2. `{environment}.toml`
//! 3. `local.toml` (not committed to version control)
//! 4. `CRONSYNC_*` environment variables
//! 5. `CRON_PATH` / `CRON_IN_DOCKER`, the variables the cron deployment itself sets

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use loader::ConfigLoader;
pub use settings::{CrontabConfig, MailerConfig, Settings, StorageConfig};
