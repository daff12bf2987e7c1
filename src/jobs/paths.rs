//! Deterministic file locations derived from the application tag.
//!
//! Spool entries reference capture files by these exact paths, so the same
//! settings and job id must always produce the same strings.

use std::path::{Path, PathBuf};

use jiff::{Timestamp, Zoned};

use crate::config::Settings;
use crate::jobs::models::DISPLAY_TIME_FORMAT;

/// Backup names end in this fixed 3-character suffix
pub const BACKUP_SUFFIX: &str = ".db";

const RUN_MARKER: &str = "runjob";

/// What a per-job file is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Stdout,
    Stderr,
    /// Persistent stderr log; lives under the log directory
    Log,
    /// Run-now wrapper script
    Script,
}

impl Purpose {
    fn extension(&self) -> &'static str {
        match self {
            Purpose::Stdout => "stdout",
            Purpose::Stderr => "stderr",
            Purpose::Log => "log",
            Purpose::Script => "sh",
        }
    }
}

/// Capture files of a scheduled job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
    pub log: PathBuf,
}

/// Files of one run-now invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
    pub log: PathBuf,
    pub script: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathScheme {
    /// `<name>-<port>`
    tag: String,
    data_dir: PathBuf,
    log_dir: PathBuf,
    cron_dir: PathBuf,
    backup_prefix: String,
}

impl PathScheme {
    pub fn new(
        app_name: &str,
        port: u16,
        data_dir: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
        cron_dir: impl Into<PathBuf>,
        backup_prefix: impl Into<String>,
    ) -> Self {
        Self {
            tag: format!("{}-{}", app_name, port),
            data_dir: data_dir.into(),
            log_dir: log_dir.into(),
            cron_dir: cron_dir.into(),
            backup_prefix: backup_prefix.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.application.name,
            settings.application.port,
            &settings.storage.data_dir,
            &settings.storage.log_dir,
            &settings.crontab.cron_dir,
            settings.storage.backup_prefix.clone(),
        )
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn backup_prefix(&self) -> &str {
        &self.backup_prefix
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join(format!("{}-crontab.db", self.tag))
    }

    pub fn env_file(&self) -> PathBuf {
        self.data_dir.join(format!("{}-env.db", self.tag))
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join(format!("{}-backups", self.tag))
    }

    pub fn backup_file(&self, name: &str) -> PathBuf {
        self.backup_dir().join(name)
    }

    /// Spool file handed to the scheduler; auto-load daemons read a fixed name
    pub fn spool_file(&self, auto_load_name: Option<&str>) -> PathBuf {
        match auto_load_name {
            Some(name) => self.cron_dir.join(name),
            None => self.cron_dir.join(&self.tag),
        }
    }

    /// Path of a per-job file for a scheduled run
    pub fn path(&self, job_id: &str, purpose: Purpose) -> PathBuf {
        let file = format!("{}-{}.{}", self.tag, job_id, purpose.extension());
        match purpose {
            Purpose::Log => self.log_dir.join(file),
            _ => self.cron_dir.join(file),
        }
    }

    /// Path of a per-job file for a run-now invocation
    pub fn run_path(&self, job_id: &str, purpose: Purpose) -> PathBuf {
        self.cron_dir.join(format!(
            "{}-{}-{}.{}",
            self.tag,
            job_id,
            RUN_MARKER,
            purpose.extension()
        ))
    }

    pub fn job_paths(&self, job_id: &str) -> JobPaths {
        JobPaths {
            stdout: self.path(job_id, Purpose::Stdout),
            stderr: self.path(job_id, Purpose::Stderr),
            log: self.path(job_id, Purpose::Log),
        }
    }

    pub fn run_paths(&self, job_id: &str) -> RunPaths {
        RunPaths {
            stdout: self.run_path(job_id, Purpose::Stdout),
            stderr: self.run_path(job_id, Purpose::Stderr),
            log: self.run_path(job_id, Purpose::Log),
            script: self.run_path(job_id, Purpose::Script),
        }
    }

    /// Backup file name for a snapshot taken at `at`.
    ///
    /// The `+` of a positive UTC offset becomes a space.
    pub fn backup_name(&self, at: &Zoned) -> String {
        let rendered = at.strftime(DISPLAY_TIME_FORMAT).to_string();
        format!(
            "{}{}{}",
            self.backup_prefix,
            rendered.replacen('+', " ", 1),
            BACKUP_SUFFIX
        )
    }

    /// Instant embedded in a backup name, if it carries a readable one
    pub fn backup_instant(&self, name: &str) -> Option<Timestamp> {
        let rest = name.strip_prefix(&self.backup_prefix)?;
        let rendered = rest.get(..rest.len().checked_sub(BACKUP_SUFFIX.len())?)?;
        let restored = rendered.replacen("GMT ", "GMT+", 1);
        Timestamp::strptime(DISPLAY_TIME_FORMAT, &restored).ok()
    }

    /// Backup names are plain file names inside the backup directory
    pub fn is_backup_name(&self, name: &str) -> bool {
        name.starts_with(&self.backup_prefix)
            && !name.contains('/')
            && !name.contains('\\')
            && !name.contains("..")
    }
}
