//! Backup command handlers

use std::path::Path;

use crate::cli::handlers::jobs::format_jobs;
use crate::error::AppResult;
use crate::services::BackupService;

pub struct BackupCommandHandler {
    backups: BackupService,
}

impl BackupCommandHandler {
    pub fn new(backups: BackupService) -> Self {
        Self { backups }
    }

    pub async fn backup(&self) -> AppResult<()> {
        let name = self.backups.backup().await?;
        println!("Created {}", name);
        Ok(())
    }

    pub async fn list(&self) -> AppResult<()> {
        let names = self.backups.list_backups().await?;
        if names.is_empty() {
            println!("No backups");
        }
        for name in names {
            println!("{}", name);
        }
        Ok(())
    }

    pub async fn restore(&self, name: &str) -> AppResult<()> {
        self.backups.restore(name).await?;
        println!("Restored {}", name);
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> AppResult<()> {
        self.backups.delete_backup(name).await?;
        println!("Deleted {}", name);
        Ok(())
    }

    pub async fn preview(&self, name: &str) -> AppResult<()> {
        let jobs = self.backups.preview(name).await?;
        if jobs.is_empty() {
            println!("{} holds no jobs", name);
            return Ok(());
        }
        print!("{}", format_jobs(jobs.iter().map(|job| (job, None))));
        Ok(())
    }

    pub async fn export(&self, path: &Path) -> AppResult<()> {
        self.backups.export_to(path).await?;
        println!("Exported to {}", path.display());
        Ok(())
    }

    pub async fn import(&self, path: &Path) -> AppResult<()> {
        self.backups.import_from(path).await?;
        println!("Imported {}", path.display());
        Ok(())
    }

    pub async fn reset(&self) -> AppResult<()> {
        self.backups.reset().await?;
        println!("Job store and environment cleared");
        Ok(())
    }
}
