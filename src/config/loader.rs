//! Configuration loader for cronsync
//!
//! `ConfigLoader` stacks the TOML layers and environment overrides in
//! precedence order and hands back validated `Settings`.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

const CONFIG_DIR_ENV: &str = "CRONSYNC_CONFIG_DIR";

const CONFIG_FILE_ENV: &str = "CRONSYNC_CONFIG_FILE";

const DEFAULT_CONFIG_DIR: &str = "config";

const ENV_PREFIX: &str = "CRONSYNC";

/// Separator for nested keys: `CRONSYNC_CRONTAB__CRON_DIR` -> `crontab.cron_dir`
const ENV_SEPARATOR: &str = "__";

/// Scheduler spool directory chosen by the deployment
pub const CRON_PATH_ENV: &str = "CRON_PATH";

/// Set inside containers whose cron daemon loads the spool file on its own
pub const CRON_IN_DOCKER_ENV: &str = "CRON_IN_DOCKER";

/// Loads layered configuration
///
/// Sources, lowest priority first:
/// 1. `default.toml` (required)
/// 2. `{environment}.toml` (optional)
/// 3. `local.toml` (optional)
/// 4. `CRONSYNC_*` environment variables
/// 5. `CRON_PATH` and `CRON_IN_DOCKER`
#[derive(Debug)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    /// When set, layered loading is skipped and only this file is read
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Create a loader from `CRONSYNC_CONFIG_DIR`, `CRONSYNC_CONFIG_FILE` and
    /// `CRONSYNC_APP_ENV`.
    ///
    /// # Errors
    ///
    /// Returns an error if both `CRONSYNC_CONFIG_DIR` and `CRONSYNC_CONFIG_FILE`
    /// are set.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from);
        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        if config_file.is_some() && config_dir.is_some() {
            return Err(ConfigError::mutual_exclusivity(
                "CRONSYNC_CONFIG_DIR and CRONSYNC_CONFIG_FILE cannot both be set. \
                 Use CRONSYNC_CONFIG_DIR for layered configuration or \
                 CRONSYNC_CONFIG_FILE for a single configuration file.",
            ));
        }

        Ok(Self {
            config_dir: config_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            config_file,
            environment: AppEnvironment::from_env(),
        })
    }

    /// Loader reading exactly one file, ignoring `CRONSYNC_CONFIG_DIR`
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: Some(path.into()),
            environment: AppEnvironment::from_env(),
        }
    }

    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    /// Load, apply deployment overrides and validate.
    ///
    /// In layered mode a missing config directory is not an error: the
    /// built-in defaults plus environment variables are used instead.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let config = self.build_config()?;
        let mut settings: Settings = config.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e))
        })?;

        Self::apply_deployment_overrides(&mut settings);
        settings.validate()?;

        Ok(settings)
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = Config::builder();

        let builder = if let Some(ref config_file) = self.config_file {
            Self::add_file_source(builder, config_file, true)?
        } else if self.config_dir.is_dir() {
            self.build_layered_config(builder)?
        } else {
            tracing::debug!(
                dir = %self.config_dir.display(),
                "Configuration directory missing, using built-in defaults"
            );
            builder
        };

        Self::add_env_source(builder).build().map_err(ConfigError::from)
    }

    fn build_layered_config(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let default_path = self.config_dir.join("default.toml");
        let builder = Self::add_file_source(builder, &default_path, true)?;

        let env_path = self
            .config_dir
            .join(format!("{}.toml", self.environment.as_str()));
        let builder = Self::add_file_source(builder, &env_path, false)?;

        let local_path = self.config_dir.join("local.toml");
        Self::add_file_source(builder, &local_path, false)
    }

    fn add_file_source(
        builder: ConfigBuilder<DefaultState>,
        path: &Path,
        required: bool,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        if required && !path.exists() {
            return Err(ConfigError::file_not_found(format!(
                "Required configuration file not found: {}",
                path.display()
            )));
        }

        Ok(builder.add_source(
            File::new(path.to_str().unwrap_or_default(), FileFormat::Toml).required(required),
        ))
    }

    fn add_env_source(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
        builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        )
    }

    /// `CRON_PATH` selects the spool directory; `CRON_IN_DOCKER` (any value)
    /// turns on auto-load mode.
    fn apply_deployment_overrides(settings: &mut Settings) {
        if let Ok(cron_path) = std::env::var(CRON_PATH_ENV) {
            tracing::info!(cron_path = %cron_path, "Path to cron files set using environment variables");
            settings.crontab.cron_dir = cron_path;
        }
        if std::env::var_os(CRON_IN_DOCKER_ENV).is_some() {
            settings.crontab.auto_load = true;
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: None,
            environment: AppEnvironment::default(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests touching process environment variables must not interleave
    pub(crate) static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn setup_config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            fs::write(temp_dir.path().join(name), content).expect("Failed to write config file");
        }
        temp_dir
    }

    /// Restores every touched variable on drop
    pub(crate) struct EnvGuard {
        vars_to_restore: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        pub(crate) fn new() -> Self {
            Self {
                vars_to_restore: Vec::new(),
            }
        }

        pub(crate) fn set(&mut self, key: &str, value: &str) {
            self.vars_to_restore
                .push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::set_var(key, value);
            }
        }

        pub(crate) fn remove(&mut self, key: &str) {
            self.vars_to_restore
                .push((key.to_string(), std::env::var(key).ok()));
            unsafe {
                std::env::remove_var(key);
            }
        }

        /// Clear every variable the loader reads
        pub(crate) fn clean() -> Self {
            let mut env = Self::new();
            for key in [
                CONFIG_DIR_ENV,
                CONFIG_FILE_ENV,
                AppEnvironment::ENV_VAR,
                CRON_PATH_ENV,
                CRON_IN_DOCKER_ENV,
                "CRONSYNC_CRONTAB__CRON_DIR",
                "CRONSYNC_APPLICATION__PORT",
            ] {
                env.remove(key);
            }
            env
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, original_value) in self.vars_to_restore.iter().rev() {
                unsafe {
                    match original_value {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }

    const DEFAULT_TOML: &str = r#"
[application]
name = "crontab-ui"
port = 8000

[storage]
data_dir = "crontabs"

[crontab]
cron_dir = "/tmp"
install_command = "crontab"

[logger]
level = "info"
"#;

    #[test]
    fn test_mutual_exclusivity_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut env = EnvGuard::clean();
        env.set(CONFIG_DIR_ENV, "/custom/config");
        env.set(CONFIG_FILE_ENV, "/path/to/config.toml");

        match ConfigLoader::new() {
            Err(ConfigError::MutualExclusivityError(msg)) => {
                assert!(msg.contains("CRONSYNC_CONFIG_DIR"));
            }
            other => panic!("Expected MutualExclusivityError, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_config_dir_falls_back_to_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut env = EnvGuard::clean();
        env.set(CONFIG_DIR_ENV, "/definitely/not/here");

        let settings = ConfigLoader::new().unwrap().load().unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_missing_default_toml_in_existing_dir() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut env = EnvGuard::clean();
        let temp_dir = setup_config_dir(&[]);
        env.set(CONFIG_DIR_ENV, temp_dir.path().to_str().unwrap());

        let result = ConfigLoader::new().unwrap().load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(msg)) if msg.contains("default.toml")));
    }

    #[test]
    fn test_layer_precedence() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut env = EnvGuard::clean();
        let temp_dir = setup_config_dir(&[
            ("default.toml", DEFAULT_TOML),
            ("production.toml", "[application]\nport = 9000\n[crontab]\nshell = \"sh\"\n"),
            ("local.toml", "[application]\nport = 9100\n"),
        ]);
        env.set(CONFIG_DIR_ENV, temp_dir.path().to_str().unwrap());
        env.set(AppEnvironment::ENV_VAR, "production");
        env.set("CRONSYNC_CRONTAB__CRON_DIR", "/var/spool/cron");

        let settings = ConfigLoader::new().unwrap().load().unwrap();
        assert_eq!(settings.application.port, 9100);
        assert_eq!(settings.crontab.shell, "sh");
        assert_eq!(settings.crontab.cron_dir, "/var/spool/cron");
        assert_eq!(settings.application.name, "crontab-ui");
    }

    #[test]
    fn test_cron_path_and_docker_overrides() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut env = EnvGuard::clean();
        let temp_dir = setup_config_dir(&[("single.toml", DEFAULT_TOML)]);
        env.set("CRONSYNC_CRONTAB__CRON_DIR", "/from/prefix");
        env.set(CRON_PATH_ENV, "/etc/crontabs");
        env.set(CRON_IN_DOCKER_ENV, "1");

        let settings = ConfigLoader::from_file(temp_dir.path().join("single.toml"))
            .load()
            .unwrap();
        assert_eq!(settings.crontab.cron_dir, "/etc/crontabs");
        assert!(settings.crontab.auto_load);
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _env = EnvGuard::clean();
        let temp_dir = setup_config_dir(&[("bad.toml", "[application]\nport = 0\n")]);

        let result = ConfigLoader::from_file(temp_dir.path().join("bad.toml")).load();
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError { field, .. }) if field == "application.port"
        ));
    }
}
