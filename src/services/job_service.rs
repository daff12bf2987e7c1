//! Job service for business logic operations.

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::jobs::{Job, JobDraft, JobError, JobListing, PathScheme, Purpose, schedule};
use crate::repositories::JobStore;
use crate::services::read_environment;

/// Shown instead of a log when a job never logged anything
pub const NO_LOG: &str = "No errors logged yet";

/// Job service for handling job-related business logic.
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    paths: Arc<PathScheme>,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, paths: Arc<PathScheme>) -> Self {
        Self { store, paths }
    }

    /// Creates a new job after checking its command and schedule.
    pub async fn create_job(&self, draft: JobDraft) -> AppResult<Job> {
        validate_draft(&draft)?;
        let job = self.store.insert(draft).await?;
        tracing::info!(job_id = %job.id, name = %job.name, "Job created");
        Ok(job)
    }

    /// Replaces a job's editable fields; `id`, `created` and `stopped` are kept.
    pub async fn update_job(&self, id: &str, draft: JobDraft) -> AppResult<Job> {
        validate_draft(&draft)?;
        let job = self.store.update(id, draft).await?;
        tracing::info!(job_id = %job.id, "Job updated");
        Ok(job)
    }

    pub async fn stop_job(&self, id: &str) -> AppResult<Job> {
        self.store.set_stopped(id, true).await
    }

    pub async fn start_job(&self, id: &str) -> AppResult<Job> {
        self.store.set_stopped(id, false).await
    }

    pub async fn remove_job(&self, id: &str) -> AppResult<()> {
        self.store.remove(id).await?;
        tracing::info!(job_id = %id, "Job removed");
        Ok(())
    }

    pub async fn get_job(&self, id: &str) -> AppResult<Job> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::job_not_found(id))
    }

    /// All jobs, newest first, each with its next fire time.
    pub async fn list_jobs(&self) -> AppResult<Vec<JobListing>> {
        let jobs = self.store.find_all().await?;
        Ok(jobs
            .into_iter()
            .map(|job| JobListing {
                next: schedule::next_run(&job.schedule),
                job,
            })
            .collect())
    }

    /// Persistent stderr log of a job.
    pub async fn job_log(&self, id: &str) -> AppResult<String> {
        let path = self.paths.path(id, Purpose::Log);
        match tokio::fs::read_to_string(&path).await {
            Ok(log) => Ok(log),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(NO_LOG.to_string()),
            Err(e) => Err(AppError::Internal {
                source: anyhow::Error::new(e)
                    .context(format!("Failed to read log {}", path.display())),
            }),
        }
    }

    pub async fn environment(&self) -> AppResult<String> {
        read_environment(&self.paths.env_file()).await
    }
}

fn validate_draft(draft: &JobDraft) -> AppResult<()> {
    if draft.command.trim().is_empty() {
        return Err(JobError::EmptyCommand.into());
    }
    schedule::validate(&draft.schedule)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let (_, services) = test_support::services(&dir).await;

        let err = services
            .jobs
            .create_job(JobDraft::new("n", "echo", "every day"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "schedule"));

        let err = services
            .jobs
            .create_job(JobDraft::new("n", "  ", "@daily"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "command"));
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let dir = TempDir::new().unwrap();
        let (_, services) = test_support::services(&dir).await;
        let jobs = &services.jobs;

        let job = jobs
            .create_job(JobDraft::new("boot", "echo up", "@reboot"))
            .await
            .unwrap();
        assert!(jobs.stop_job(&job.id).await.unwrap().stopped);
        assert!(!jobs.start_job(&job.id).await.unwrap().stopped);

        let listing = jobs.list_jobs().await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].next, schedule::NEXT_REBOOT);

        jobs.remove_job(&job.id).await.unwrap();
        assert!(matches!(
            jobs.get_job(&job.id).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_job_log_and_environment_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = test_support::settings_in(&dir);
        let (_, services) = test_support::services_with(&settings).await;

        assert_eq!(services.jobs.job_log("abc").await.unwrap(), NO_LOG);
        assert_eq!(services.jobs.environment().await.unwrap(), "");

        let log = PathScheme::from_settings(&settings).path("abc", Purpose::Log);
        tokio::fs::write(&log, "boom\n").await.unwrap();
        assert_eq!(services.jobs.job_log("abc").await.unwrap(), "boom\n");
    }
}
