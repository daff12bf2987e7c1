use thiserror::Error;

use crate::error::AppError;

/// Problems with a job's own fields, found before anything touches the store
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid cron expression: {0}")]
    InvalidSchedule(String),

    #[error("Command must not be empty")]
    EmptyCommand,

    #[error("Mailing settings must be a JSON object: {0}")]
    InvalidMailing(String),
}

impl From<JobError> for AppError {
    fn from(error: JobError) -> Self {
        let field = match error {
            JobError::InvalidSchedule(_) => "schedule",
            JobError::EmptyCommand => "command",
            JobError::InvalidMailing(_) => "mailing",
        };
        AppError::validation(field, error.to_string())
    }
}

pub type JobResult<T> = Result<T, JobError>;
