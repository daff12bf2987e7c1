//! Application state.
//!
//! Owns the single job store instance and the services built over it.

use std::sync::Arc;

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::jobs::PathScheme;
use crate::repositories::{FileJobStore, JobStore};
use crate::services::Services;

/// Application state containing all shared services and resources.
///
/// Cloning is cheap since the store and every service live behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// All business logic services
    pub services: Services,
    /// The job store the services share
    pub store: Arc<dyn JobStore>,
    pub paths: Arc<PathScheme>,
}

impl AppState {
    /// Prepare the data directories and load the job store.
    ///
    /// A store that cannot be loaded is fatal: nothing downstream can trust
    /// an unloaded store.
    pub async fn new(settings: &Settings) -> AppResult<Self> {
        let paths = PathScheme::from_settings(settings);

        let log_dir = paths.log_dir();
        tokio::fs::create_dir_all(log_dir)
            .await
            .map_err(|e| AppError::write_failure(log_dir, e))?;

        let store: Arc<dyn JobStore> = Arc::new(FileJobStore::open(paths.store_file()).await?);
        let services = Services::new(Arc::clone(&store), settings);

        Ok(Self {
            services,
            store,
            paths: Arc::new(paths),
        })
    }
}
