//! Configuration merger for CLI arguments and config files
//!
//! This module handles merging CLI argument overrides with file-based configuration,
//! implementing the configuration precedence logic.

use std::path::Path;

use super::parser::Cli;
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, Environment, Settings};

/// Configuration merger that handles CLI argument integration with file-based configuration
///
/// CLI arguments override configuration file values.
pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Load the base configuration from `config_path`, or from the layered
    /// configuration directory when no path is given.
    ///
    /// # Errors
    /// Returns ConfigError if configuration loading or validation fails
    pub fn from_config_path(
        config_path: Option<&Path>,
        environment: Option<Environment>,
    ) -> Result<Self, ConfigError> {
        let loader = match config_path {
            Some(path) => {
                Self::validate_config_file_access(path)?;
                ConfigLoader::from_file(path)
            }
            None => ConfigLoader::new()?,
        };
        let loader = match environment {
            Some(environment) => loader.with_environment(environment),
            None => loader,
        };

        Ok(Self::new(loader.load()?))
    }

    fn validate_config_file_access(path: &Path) -> Result<(), ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::file_not_found(path.display().to_string()));
        }

        std::fs::File::open(path).map(|_| ()).map_err(|e| {
            ConfigError::validation(
                "config_file".to_string(),
                format!("Cannot read configuration file '{}': {}", path.display(), e),
            )
        })
    }

    /// Apply CLI overrides on top of the base configuration and validate
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_verbose_and_quiet_override_level() {
        let merger = ConfigurationMerger::new(Settings::default());

        let cli = Cli::try_parse_from(["cronsync", "--verbose"]).unwrap();
        assert_eq!(merger.merge_cli_args(&cli).unwrap().logger.level, "debug");

        let cli = Cli::try_parse_from(["cronsync", "--quiet"]).unwrap();
        assert_eq!(merger.merge_cli_args(&cli).unwrap().logger.level, "error");

        let cli = Cli::try_parse_from(["cronsync"]).unwrap();
        assert_eq!(merger.merge_cli_args(&cli).unwrap().logger.level, "info");
    }

    #[test]
    fn test_merge_validates() {
        let mut settings = Settings::default();
        settings.crontab.shell = " ".to_string();
        let merger = ConfigurationMerger::new(settings);

        let cli = Cli::try_parse_from(["cronsync"]).unwrap();
        assert!(merger.merge_cli_args(&cli).is_err());
    }

    #[test]
    fn test_from_config_file() {
        let _lock = crate::config::loader::tests::ENV_MUTEX.lock().unwrap();
        let _guard = crate::config::loader::tests::EnvGuard::clean();

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[crontab]\nshell = \"sh\"\n\n[storage]\nbackup_prefix = \"snap \"").unwrap();

        let merger =
            ConfigurationMerger::from_config_path(Some(file.path()), Some(Environment::Test))
                .unwrap();
        let cli = Cli::try_parse_from(["cronsync"]).unwrap();
        let settings = merger.merge_cli_args(&cli).unwrap();
        assert_eq!(settings.crontab.shell, "sh");
        assert_eq!(settings.storage.backup_prefix, "snap ");
        assert_eq!(settings.crontab.install_command, "crontab");
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            ConfigurationMerger::from_config_path(Some(Path::new("/no/such.toml")), None),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
