//! Snapshots of the job store file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jiff::Zoned;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult};
use crate::jobs::{Job, PathScheme, backup};
use crate::repositories::{JobStore, parse_documents, write_atomic};
use crate::services::WriterLock;

#[derive(Clone)]
pub struct BackupService {
    store: Arc<dyn JobStore>,
    paths: Arc<PathScheme>,
    writer: WriterLock,
}

impl BackupService {
    pub fn new(store: Arc<dyn JobStore>, paths: Arc<PathScheme>, writer: WriterLock) -> Self {
        Self {
            store,
            paths,
            writer,
        }
    }

    /// Copy the store file into a new backup named after the current local time.
    pub async fn backup(&self) -> AppResult<String> {
        self.backup_at(&Zoned::now()).await
    }

    /// Copy the store file into a backup named after `at`.
    ///
    /// An existing backup of the same name is never overwritten.
    pub async fn backup_at(&self, at: &Zoned) -> AppResult<String> {
        let store_file = self.store.path();
        let contents = tokio::fs::read(store_file)
            .await
            .map_err(|e| AppError::store_unavailable(store_file, e))?;

        let dir = self.paths.backup_dir();
        if let Err(e) = tokio::fs::create_dir(&dir).await {
            if e.kind() != ErrorKind::AlreadyExists {
                return Err(AppError::write_failure(&dir, e));
            }
        }

        let name = self.paths.backup_name(at);
        let path = dir.join(&name);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| AppError::write_failure(&path, e))?;
        file.write_all(&contents)
            .await
            .map_err(|e| AppError::write_failure(&path, e))?;
        file.flush()
            .await
            .map_err(|e| AppError::write_failure(&path, e))?;

        tracing::info!(backup = %name, "Backup created");
        Ok(name)
    }

    /// Backup names, newest first
    pub async fn list_backups(&self) -> AppResult<Vec<String>> {
        let dir = self.paths.backup_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::store_unavailable(&dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::store_unavailable(&dir, e))?
        {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(backup::newest_first(&self.paths, names))
    }

    /// Replace the store file with a backup's bytes and reload the store
    pub async fn restore(&self, name: &str) -> AppResult<()> {
        let path = self.backup_path(name)?;
        let contents = read_backup(&path, name).await?;

        let _guard = self.writer.lock().await;
        write_atomic(self.store.path(), contents).await?;
        self.store.reload().await?;
        tracing::info!(backup = %name, "Backup restored");
        Ok(())
    }

    pub async fn delete_backup(&self, name: &str) -> AppResult<()> {
        let path = self.backup_path(name)?;
        tokio::fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => backup_not_found(name),
            _ => AppError::write_failure(&path, e),
        })?;
        tracing::info!(backup = %name, "Backup deleted");
        Ok(())
    }

    /// Jobs contained in a backup, newest first
    pub async fn preview(&self, name: &str) -> AppResult<Vec<Job>> {
        let path = self.backup_path(name)?;
        let contents = read_backup(&path, name).await?;
        let text = String::from_utf8_lossy(&contents);
        let mut jobs =
            parse_documents(&text).map_err(|e| AppError::store_unavailable(&path, e))?;
        jobs.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(jobs)
    }

    /// Copy the store file to `destination`
    pub async fn export_to(&self, destination: &Path) -> AppResult<()> {
        tokio::fs::copy(self.store.path(), destination)
            .await
            .map_err(|e| AppError::write_failure(destination, e))?;
        tracing::info!(path = %destination.display(), "Job store exported");
        Ok(())
    }

    /// Replace the store file with `source` and reload the store.
    ///
    /// The file must read as a job store; nothing is replaced otherwise.
    pub async fn import_from(&self, source: &Path) -> AppResult<()> {
        let contents = tokio::fs::read_to_string(source)
            .await
            .map_err(|e| AppError::store_unavailable(source, e))?;
        parse_documents(&contents)
            .map_err(|e| AppError::validation("import", e.to_string()))?;

        let _guard = self.writer.lock().await;
        write_atomic(self.store.path(), contents).await?;
        self.store.reload().await?;
        tracing::info!(path = %source.display(), "Job store imported");
        Ok(())
    }

    /// Delete the store and environment files, then reload an empty store
    pub async fn reset(&self) -> AppResult<()> {
        let _guard = self.writer.lock().await;
        for path in [self.store.path().to_path_buf(), self.paths.env_file()] {
            tracing::info!(path = %path.display(), "Deleting");
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Unable to delete");
                }
            }
        }
        self.store.reload().await
    }

    fn backup_path(&self, name: &str) -> AppResult<PathBuf> {
        if !self.paths.is_backup_name(name) {
            return Err(AppError::validation(
                "backup",
                format!("'{}' is not a backup name", name),
            ));
        }
        Ok(self.paths.backup_file(name))
    }
}

fn backup_not_found(name: &str) -> AppError {
    AppError::NotFound {
        entity: "Backup".to_string(),
        field: "name".to_string(),
        value: name.to_string(),
    }
}

async fn read_backup(path: &Path, name: &str) -> AppResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => backup_not_found(name),
        _ => AppError::store_unavailable(path, e),
    })
}
