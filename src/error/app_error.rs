use std::path::Path;

use thiserror::Error;

use crate::config::error::ConfigError;

/// Application-wide error type for the crontab engine.
///
/// Every store, filesystem and subprocess failure bubbles up as one of these
/// variants to the immediate caller. Unparsable scheduler lines met during an
/// import are not errors and never show up here.
#[derive(Error, Debug)]
pub enum AppError {
    /// The job store could not be loaded or reloaded
    #[error("Job store unavailable: {path}")]
    StoreUnavailable {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// A spool, environment, script, backup or store file could not be written
    #[error("Failed to write {path}")]
    WriteFailure {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// A spawned process exited unsuccessfully or could not be spawned
    #[error("Command `{command}` failed{}: {stderr}", status.map(|s| format!(" with status {}", s)).unwrap_or_default())]
    SubprocessFailure {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn store_unavailable(path: &Path, source: impl Into<anyhow::Error>) -> Self {
        AppError::StoreUnavailable {
            path: path.display().to_string(),
            source: source.into(),
        }
    }

    pub fn write_failure(path: &Path, source: impl Into<anyhow::Error>) -> Self {
        AppError::WriteFailure {
            path: path.display().to_string(),
            source: source.into(),
        }
    }

    pub fn job_not_found(id: &str) -> Self {
        AppError::NotFound {
            entity: "Job".to_string(),
            field: "id".to_string(),
            value: id.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code used by the CLI when a command fails.
    ///
    /// A failed run-now keeps the job's own status so shell callers see the
    /// same code the job produced.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::SubprocessFailure {
                status: Some(code), ..
            } if *code != 0 => *code,
            AppError::NotFound { .. } => 2,
            AppError::Validation { .. } | AppError::Configuration { .. } => 64,
            _ => 1,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        let key = match &error {
            ConfigError::ValidationError { field, .. } => field.clone(),
            _ => "settings".to_string(),
        };
        AppError::Configuration {
            key,
            source: anyhow::Error::from(error),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subprocess_failure_keeps_job_status() {
        let err = AppError::SubprocessFailure {
            command: "bash run.sh".to_string(),
            status: Some(3),
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("with status 3"));
    }

    #[test]
    fn test_subprocess_failure_without_status() {
        let err = AppError::SubprocessFailure {
            command: "crontab /tmp/x".to_string(),
            status: None,
            stderr: "killed".to_string(),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "Command `crontab /tmp/x` failed: killed");
    }

    #[test]
    fn test_not_found_display() {
        let err = AppError::job_not_found("abc");
        assert_eq!(err.to_string(), "Resource not found: Job with id=abc");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_config_error_conversion_keeps_field() {
        let err: AppError = ConfigError::validation("crontab.shell", "empty").into();
        match err {
            AppError::Configuration { key, .. } => assert_eq!(key, "crontab.shell"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
