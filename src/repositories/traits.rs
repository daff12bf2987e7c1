//! JobStore trait definition.

use std::path::Path;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::jobs::models::{Job, JobDraft};

/// Persistence boundary for job records.
///
/// Implementations assign ids and stamps; callers never choose an id.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Store a new job built from `draft`.
    async fn insert(&self, draft: JobDraft) -> AppResult<Job>;

    /// Replace the editable fields of an existing job.
    async fn update(&self, id: &str, draft: JobDraft) -> AppResult<Job>;

    async fn set_stopped(&self, id: &str, stopped: bool) -> AppResult<Job>;

    async fn remove(&self, id: &str) -> AppResult<()>;

    /// All jobs, newest `created` first.
    async fn find_all(&self) -> AppResult<Vec<Job>>;

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Job>>;

    /// Drop cached state and read the backing file again.
    async fn reload(&self) -> AppResult<()>;

    /// Backing file of the store
    fn path(&self) -> &Path;
}
