//! Service layer for business logic operations.
//!
//! Services are the function-call contract that front ends (the CLI, or
//! any other caller) use to drive the engine. They coordinate the job store,
//! the path scheme and the external scheduler.

mod backup_service;
mod crontab_service;
mod job_service;

pub use backup_service::BackupService;
pub use crontab_service::{CrontabService, MaterializeReport, ReconcileReport, RunOutput};
pub use job_service::JobService;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::jobs::PathScheme;
use crate::repositories::JobStore;

/// Serializes operations that write the store, spool or environment files.
///
/// One instance is shared by every service built over the same job store.
pub type WriterLock = Arc<Mutex<()>>;

/// Aggregates all services for convenient access.
///
/// Cloning is cheap since every service only holds `Arc`s.
#[derive(Clone)]
pub struct Services {
    pub jobs: JobService,
    pub crontab: CrontabService,
    pub backups: BackupService,
}

impl Services {
    /// Creates every service over one store and one writer lock.
    pub fn new(store: Arc<dyn JobStore>, settings: &Settings) -> Self {
        let paths = Arc::new(PathScheme::from_settings(settings));
        let writer: WriterLock = Arc::new(Mutex::new(()));

        Self {
            jobs: JobService::new(Arc::clone(&store), Arc::clone(&paths)),
            crontab: CrontabService::new(
                Arc::clone(&store),
                Arc::clone(&paths),
                settings.crontab.clone(),
                settings.mailer.program.clone(),
                Arc::clone(&writer),
            ),
            backups: BackupService::new(store, paths, writer),
        }
    }
}

/// The shared environment blob; empty when it was never saved
pub(crate) async fn read_environment(path: &Path) -> AppResult<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(env) => Ok(env),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(AppError::Internal {
            source: anyhow::Error::new(e)
                .context(format!("Failed to read environment file {}", path.display())),
        }),
    }
}
