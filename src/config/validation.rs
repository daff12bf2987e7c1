//! Configuration validation logic

use crate::config::error::ConfigError;
use crate::config::settings::{
    ApplicationConfig, CrontabConfig, FileSettings, LoggerSettings, MailerConfig, Settings,
    StorageConfig,
};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

fn require_non_blank(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: field.to_string(),
            message: "Value must not be empty.".to_string(),
        });
    }
    Ok(())
}

impl ApplicationConfig {
    /// # Validation Rules
    /// - Name must be non-empty and free of path separators (it is part of every file name)
    /// - Port must be between 1 and 65535
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_blank("application.name", &self.name)?;
        if self.name.contains('/') {
            return Err(ConfigError::validation(
                "application.name",
                "Name is used in file names and must not contain '/'.",
            ));
        }

        if self.port == 0 {
            return Err(ConfigError::validation(
                "application.port",
                "Port must be between 1 and 65535.",
            ));
        }

        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_blank("storage.data_dir", &self.data_dir)?;
        require_non_blank("storage.log_dir", &self.log_dir)?;
        // An empty prefix would make every file in the backup directory a backup
        if self.backup_prefix.is_empty() || self.backup_prefix.contains('/') {
            return Err(ConfigError::validation(
                "storage.backup_prefix",
                "Backup prefix must be non-empty and must not contain '/'.",
            ));
        }
        Ok(())
    }
}

impl CrontabConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_blank("crontab.cron_dir", &self.cron_dir)?;
        require_non_blank("crontab.install_command", &self.install_command)?;
        require_non_blank("crontab.list_command", &self.list_command)?;
        require_non_blank("crontab.shell", &self.shell)?;
        require_non_blank("crontab.auto_load_spool_name", &self.auto_load_spool_name)?;
        Ok(())
    }
}

impl MailerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_blank("mailer.program", &self.program)
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        self.file.validate()
    }
}

impl Settings {
    /// Validate every section, returning the first error found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.application.validate()?;
        self.storage.validate()?;
        self.crontab.validate()?;
        self.mailer.validate()?;
        self.logger.validate()?;
        Ok(())
    }
}
