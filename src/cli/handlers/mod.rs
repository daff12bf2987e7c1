//! Command handlers for CLI operations
//!
//! This module contains handlers for different CLI commands,
//! separating command execution logic from parsing and validation.

pub mod backups;
pub mod crontab;
pub mod jobs;

pub use backups::BackupCommandHandler;
pub use crontab::CrontabCommandHandler;
pub use jobs::JobCommandHandler;
