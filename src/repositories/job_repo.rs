use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jiff::{Timestamp, Zoned};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::jobs::models::{DISPLAY_TIME_FORMAT, Job, JobDraft};
use crate::repositories::JobStore;

const ID_LENGTH: usize = 16;

/// Share of unreadable lines a store file may contain before loading fails
const CORRUPT_THRESHOLD: f64 = 0.1;

const DELETED_MARKER: &str = "$$deleted";
const INDEX_MARKER: &str = "$$indexCreated";

/// Job store backed by a newline-delimited JSON document file.
///
/// The whole file is rewritten on every mutation, so readers of the file
/// only ever see one document per job.
pub struct FileJobStore {
    path: PathBuf,
    jobs: RwLock<Vec<Job>>,
}

impl FileJobStore {
    /// Open the store at `path`, creating an empty file if none exists.
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let jobs = load(&path).await?;
        tracing::info!(path = %path.display(), jobs = jobs.len(), "Job store loaded");
        Ok(Self {
            path,
            jobs: RwLock::new(jobs),
        })
    }

    /// Write `jobs` to disk, then make them the cached state.
    async fn commit(&self, cache: &mut Vec<Job>, jobs: Vec<Job>) -> AppResult<()> {
        persist(&self.path, &jobs).await?;
        *cache = jobs;
        Ok(())
    }

    async fn modify<F>(&self, id: &str, apply: F) -> AppResult<Job>
    where
        F: FnOnce(&mut Job) + Send,
    {
        let mut cache = self.jobs.write().await;
        let mut jobs = cache.clone();
        let job = jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or_else(|| AppError::job_not_found(id))?;
        apply(job);
        let updated = job.clone();

        self.commit(&mut cache, jobs).await?;
        Ok(updated)
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn insert(&self, draft: JobDraft) -> AppResult<Job> {
        let mut cache = self.jobs.write().await;
        let id = loop {
            let candidate = new_id();
            if !cache.iter().any(|job| job.id == candidate) {
                break candidate;
            }
        };

        let job = Job {
            hook: draft.normalized_hook(),
            name: draft.name,
            command: draft.command,
            schedule: draft.schedule,
            stopped: false,
            timestamp: display_now(),
            logging: draft.logging,
            mailing: draft.mailing,
            created: Timestamp::now().as_millisecond(),
            id,
        };

        let mut jobs = cache.clone();
        jobs.push(job.clone());
        self.commit(&mut cache, jobs).await?;

        tracing::debug!(job_id = %job.id, "Job inserted");
        Ok(job)
    }

    async fn update(&self, id: &str, draft: JobDraft) -> AppResult<Job> {
        let timestamp = display_now();
        self.modify(id, move |job| {
            job.hook = draft.normalized_hook();
            job.name = draft.name;
            job.command = draft.command;
            job.schedule = draft.schedule;
            job.logging = draft.logging;
            job.mailing = draft.mailing;
            job.timestamp = timestamp;
        })
        .await
    }

    async fn set_stopped(&self, id: &str, stopped: bool) -> AppResult<Job> {
        self.modify(id, move |job| job.stopped = stopped).await
    }

    async fn remove(&self, id: &str) -> AppResult<()> {
        let mut cache = self.jobs.write().await;
        if !cache.iter().any(|job| job.id == id) {
            return Err(AppError::job_not_found(id));
        }
        let jobs = cache.iter().filter(|job| job.id != id).cloned().collect();
        self.commit(&mut cache, jobs).await
    }

    async fn find_all(&self) -> AppResult<Vec<Job>> {
        let mut jobs = self.jobs.read().await.clone();
        jobs.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(jobs)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Job>> {
        Ok(self.jobs.read().await.iter().find(|job| job.id == id).cloned())
    }

    async fn reload(&self) -> AppResult<()> {
        let mut cache = self.jobs.write().await;
        *cache = load(&self.path).await?;
        tracing::info!(path = %self.path.display(), jobs = cache.len(), "Job store reloaded");
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn new_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

fn display_now() -> String {
    Zoned::now().strftime(DISPLAY_TIME_FORMAT).to_string()
}

async fn load(path: &Path) -> AppResult<Vec<Job>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::store_unavailable(path, e))?;
            }
            tokio::fs::write(path, "")
                .await
                .map_err(|e| AppError::store_unavailable(path, e))?;
            String::new()
        }
        Err(e) => return Err(AppError::store_unavailable(path, e)),
    };

    parse_documents(&text).map_err(|e| AppError::store_unavailable(path, e))
}

/// Fold store lines into the current set of jobs, in first-seen order.
pub(crate) fn parse_documents(text: &str) -> anyhow::Result<Vec<Job>> {
    let mut jobs: Vec<Option<Job>> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut lines = 0usize;
    let mut corrupt = 0usize;

    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        lines += 1;
        let Ok(Value::Object(document)) = serde_json::from_str::<Value>(line) else {
            corrupt += 1;
            continue;
        };
        if document.contains_key(INDEX_MARKER) {
            continue;
        }
        let Some(id) = document.get("_id").and_then(Value::as_str).map(str::to_string) else {
            corrupt += 1;
            continue;
        };

        if document.get(DELETED_MARKER).and_then(Value::as_bool) == Some(true) {
            if let Some(&index) = positions.get(&id) {
                jobs[index] = None;
            }
            continue;
        }

        match serde_json::from_value::<Job>(Value::Object(document)) {
            Ok(job) => match positions.get(&id) {
                Some(&index) => jobs[index] = Some(job),
                None => {
                    positions.insert(id, jobs.len());
                    jobs.push(Some(job));
                }
            },
            Err(_) => corrupt += 1,
        }
    }

    if lines > 0 && corrupt as f64 / lines as f64 > CORRUPT_THRESHOLD {
        anyhow::bail!("{} of {} lines are corrupt", corrupt, lines);
    }
    if corrupt > 0 {
        tracing::warn!(corrupt, lines, "Skipped corrupt job store lines");
    }

    Ok(jobs.into_iter().flatten().collect())
}

async fn persist(path: &Path, jobs: &[Job]) -> AppResult<()> {
    let mut contents = String::new();
    for job in jobs {
        let line = serde_json::to_string(job).map_err(|e| AppError::write_failure(path, e))?;
        contents.push_str(&line);
        contents.push('\n');
    }
    write_atomic(path, contents).await
}

/// Whole-file write through a sibling temp file and rename.
pub(crate) async fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> AppResult<()> {
    let mut temp = path.as_os_str().to_os_string();
    temp.push("~");
    let temp = PathBuf::from(temp);

    tokio::fs::write(&temp, contents)
        .await
        .map_err(|e| AppError::write_failure(&temp, e))?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| AppError::write_failure(path, e))
}
