//! Configuration settings structures for cronsync
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "crontab-ui".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_data_dir() -> String {
    "crontabs".to_string()
}

fn default_log_dir() -> String {
    "crontabs/logs".to_string()
}

fn default_backup_prefix() -> String {
    "backup of: ".to_string()
}

fn default_cron_dir() -> String {
    "/tmp".to_string()
}

fn default_install_command() -> String {
    "crontab".to_string()
}

fn default_list_command() -> String {
    "crontab -l".to_string()
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_auto_load_spool_name() -> String {
    "root".to_string()
}

fn default_mailer_program() -> String {
    "cronsync-mailer".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/cronsync.log".to_string()
}

fn default_log_format() -> String {
    "full".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application identity; `name` and `port` together form the tag that
/// prefixes every generated file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application tag
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Port number baked into the tag
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            port: default_port(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Storage Configuration
// ============================================================================

/// Locations of the job store, environment blob, backups and job logs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the store file, the environment file and the backup directory
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory holding the persistent per-job log files
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// File name prefix identifying store snapshots inside the backup directory
    #[serde(default = "default_backup_prefix")]
    pub backup_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_dir: default_log_dir(),
            backup_prefix: default_backup_prefix(),
        }
    }
}

// ============================================================================
// Crontab Configuration
// ============================================================================

/// How the spool file is written and handed to the OS scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrontabConfig {
    /// Scheduler spool directory; also holds capture files and run-now scripts
    #[serde(default = "default_cron_dir")]
    pub cron_dir: String,

    /// The cron daemon loads the spool file by itself; skip the install command
    #[serde(default)]
    pub auto_load: bool,

    /// Command installing a spool file; receives the spool path as its only argument
    #[serde(default = "default_install_command")]
    pub install_command: String,

    /// Command printing the currently installed schedule
    #[serde(default = "default_list_command")]
    pub list_command: String,

    /// Shell used to execute run-now scripts
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Spool file name used in auto-load mode
    #[serde(default = "default_auto_load_spool_name")]
    pub auto_load_spool_name: String,
}

impl Default for CrontabConfig {
    fn default() -> Self {
        Self {
            cron_dir: default_cron_dir(),
            auto_load: false,
            install_command: default_install_command(),
            list_command: default_list_command(),
            shell: default_shell(),
            auto_load_spool_name: default_auto_load_spool_name(),
        }
    }
}

/// External notification program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailerConfig {
    /// Command prefix; the job id and both capture paths are appended
    #[serde(default = "default_mailer_program")]
    pub program: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            program: default_mailer_program(),
        }
    }
}

// ============================================================================
// Logger Settings (compatible with existing LoggerConfig)
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to existing file
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert LoggerSettings to the runtime LoggerConfig
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console_config = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file_config = self.file.into_file_config()?;

        LoggerConfig::new(console_config, file_config, self.level).map_err(|e| {
            ConfigError::ValidationError {
                field: "logger".to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl FileSettings {
    /// Convert FileSettings to FileConfig
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: e.to_string(),
            })?;

        Ok(FileConfig {
            enabled: self.enabled,
            path: PathBuf::from(self.path),
            append: self.append,
            format,
        })
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application identity
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Store, backup and log locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Spool and subprocess configuration
    #[serde(default)]
    pub crontab: CrontabConfig,

    /// Mailer configuration
    #[serde(default)]
    pub mailer: MailerConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,
}
