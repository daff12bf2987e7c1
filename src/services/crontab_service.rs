//! Synchronization between the job store and the OS scheduler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use jiff::Timestamp;
use tokio::sync::watch;

use crate::config::CrontabConfig;
use crate::error::{AppError, AppResult};
use crate::jobs::{JobDraft, PathScheme, import, process, render};
use crate::repositories::JobStore;
use crate::services::{WriterLock, read_environment};

/// Outcome of one materialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeReport {
    pub spool: PathBuf,
    /// Number of job entries written; stopped jobs are not counted
    pub entries: usize,
    /// False when the scheduler auto-loads the spool file itself
    pub installed: bool,
}

/// Output of a successful run-now invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub script: PathBuf,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct CrontabService {
    store: Arc<dyn JobStore>,
    paths: Arc<PathScheme>,
    config: Arc<CrontabConfig>,
    mailer: Arc<str>,
    writer: WriterLock,
}

impl CrontabService {
    pub fn new(
        store: Arc<dyn JobStore>,
        paths: Arc<PathScheme>,
        config: CrontabConfig,
        mailer: String,
        writer: WriterLock,
    ) -> Self {
        Self {
            store,
            paths,
            config: Arc::new(config),
            mailer: mailer.into(),
            writer,
        }
    }

    pub fn spool_file(&self) -> PathBuf {
        let auto_load_name = self
            .config
            .auto_load
            .then_some(self.config.auto_load_spool_name.as_str());
        self.paths.spool_file(auto_load_name)
    }

    /// Render the spool document for the current store without writing it
    pub async fn render(&self, env: &str) -> AppResult<String> {
        let jobs = self.store.find_all().await?;
        Ok(render::spool(
            env,
            &jobs,
            |id| self.paths.job_paths(id),
            &self.mailer,
        ))
    }

    /// Write the environment and spool files, then install the spool.
    ///
    /// Nothing is installed when either write fails. An install failure after
    /// a successful write leaves the scheduler behind the store until the next
    /// successful materialization.
    pub async fn materialize(&self, env: &str) -> AppResult<MaterializeReport> {
        let _guard = self.writer.lock().await;

        let jobs = self.store.find_all().await?;
        let entries = jobs.iter().filter(|job| !job.stopped).count();
        let spool = render::spool(env, &jobs, |id| self.paths.job_paths(id), &self.mailer);

        let env_file = self.paths.env_file();
        tokio::fs::write(&env_file, env)
            .await
            .map_err(|e| AppError::write_failure(&env_file, e))?;

        let spool_file = self.spool_file();
        tokio::fs::write(&spool_file, spool)
            .await
            .map_err(|e| AppError::write_failure(&spool_file, e))?;

        let installed = !self.config.auto_load;
        if installed {
            process::run_line(&self.config.install_command, [&spool_file]).await?;
        }

        tracing::info!(
            spool = %spool_file.display(),
            entries,
            installed,
            "Crontab materialized"
        );
        Ok(MaterializeReport {
            spool: spool_file,
            entries,
            installed,
        })
    }

    /// Materialize with the stored environment blob
    pub async fn autosave(&self) -> AppResult<MaterializeReport> {
        let env = read_environment(&self.paths.env_file()).await?;
        self.materialize(&env).await
    }

    /// Run one job now, outside its schedule.
    ///
    /// A failing job surfaces as [`AppError::SubprocessFailure`] carrying the
    /// job's own exit status.
    pub async fn run_now(&self, id: &str) -> AppResult<RunOutput> {
        let job = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::job_not_found(id))?;
        let env = read_environment(&self.paths.env_file()).await?;

        let paths = self.paths.run_paths(&job.id);
        let script = render::run_script(&env, &job, &paths, &self.mailer);
        tokio::fs::write(&paths.script, script)
            .await
            .map_err(|e| AppError::write_failure(&paths.script, e))?;

        tracing::info!(job_id = %job.id, script = %paths.script.display(), "Running job");
        let output = process::run(&self.config.shell, [&paths.script]).await?;

        Ok(RunOutput {
            script: paths.script,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Merge a scheduler listing into the store.
    ///
    /// A line updates the schedule of every job whose command is a substring
    /// of the line's command, or creates a job when none is. Lines are applied
    /// in order, so jobs created earlier in the batch can match later lines.
    /// Holds the writer lock for the whole batch.
    pub async fn reconcile(&self, listing: &str, batch_started_ms: i64) -> AppResult<ReconcileReport> {
        let _guard = self.writer.lock().await;
        let mut report = ReconcileReport::default();

        for (index, line) in listing.split('\n').enumerate() {
            let Some(parsed) = import::parse_line(line) else {
                report.skipped += 1;
                continue;
            };

            let matches: Vec<_> = self
                .store
                .find_all()
                .await?
                .into_iter()
                .filter(|job| parsed.command.contains(&job.command))
                .collect();

            if matches.is_empty() {
                let draft = JobDraft::new(
                    import::generated_name(batch_started_ms, index),
                    parsed.command.clone(),
                    parsed.schedule.clone(),
                );
                let job = self.store.insert(draft).await?;
                tracing::info!(job_id = %job.id, schedule = %job.schedule, "Imported new job");
                report.created += 1;
                continue;
            }

            for job in matches {
                let draft = job.to_draft().with_schedule(parsed.schedule.clone());
                self.store.update(&job.id, draft).await?;
                tracing::info!(job_id = %job.id, schedule = %parsed.schedule, "Imported schedule");
                report.updated += 1;
            }
        }

        Ok(report)
    }

    /// Read the scheduler's current listing and reconcile it.
    ///
    /// Best effort: failures are logged, never returned.
    pub async fn import_from_system_schedule(&self) {
        let output = match process::run_line(&self.config.list_command, Vec::<String>::new()).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read the scheduler listing");
                return;
            }
        };

        let listing = String::from_utf8_lossy(&output.stdout);
        match self
            .reconcile(&listing, Timestamp::now().as_millisecond())
            .await
        {
            Ok(report) => tracing::info!(
                created = report.created,
                updated = report.updated,
                skipped = report.skipped,
                "Scheduler listing imported"
            ),
            Err(e) => tracing::warn!(error = %e, "Scheduler listing import failed"),
        }
    }

    /// Reload the store from disk
    pub async fn reload(&self) -> AppResult<()> {
        let _guard = self.writer.lock().await;
        self.store.reload().await
    }

    /// Materialize once, then again whenever the store file changes.
    ///
    /// Polls the store file's modification time every `interval` until
    /// `shutdown` turns true or its sender is dropped. Failed saves are
    /// logged and retried on the next change.
    pub async fn watch(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        if let Err(e) = self.autosave().await {
            tracing::error!(error = %e, "Initial autosave failed");
        }

        let store_file = self.store.path().to_path_buf();
        let mut last_seen = modified(&store_file).await;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let current = modified(&store_file).await;
                    if current == last_seen {
                        continue;
                    }
                    last_seen = current;
                    tracing::debug!(path = %store_file.display(), "Job store changed");
                    if let Err(e) = self.autosave().await {
                        tracing::error!(error = %e, "Autosave failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Stopping crontab watch");
                        break;
                    }
                }
            }
        }
    }
}

async fn modified(path: &std::path::Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Purpose;
    use crate::services::test_support;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_materialize_writes_env_and_spool() {
        let dir = TempDir::new().unwrap();
        let (_, services) = test_support::services(&dir).await;

        let active = services
            .jobs
            .create_job(JobDraft::new("a", "echo a", "0 5 * * *"))
            .await
            .unwrap();
        let stopped = services
            .jobs
            .create_job(JobDraft::new("b", "echo b", "@hourly"))
            .await
            .unwrap();
        services.jobs.stop_job(&stopped.id).await.unwrap();

        let report = services.crontab.materialize("SHELL=/bin/bash").await.unwrap();
        assert_eq!(report.entries, 1);
        assert!(report.installed);

        let spool = tokio::fs::read_to_string(&report.spool).await.unwrap();
        assert!(spool.starts_with("SHELL=/bin/bash\n"));
        assert!(spool.contains(&format!("#id: {} | a", active.id)));
        assert!(!spool.contains(&stopped.id));
        assert_eq!(services.jobs.environment().await.unwrap(), "SHELL=/bin/bash");
    }

    #[tokio::test]
    async fn test_materialize_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let (_, services) = test_support::services(&dir).await;
        let mut draft = JobDraft::new("m", "backup.sh", "@daily");
        draft.logging = true;
        draft.mailing = json!({"to": "ops"}).as_object().unwrap().clone();
        services.jobs.create_job(draft).await.unwrap();

        let first = services.crontab.materialize("A=1").await.unwrap();
        let first = tokio::fs::read(&first.spool).await.unwrap();
        let second = services.crontab.autosave().await.unwrap();
        let second = tokio::fs::read(&second.spool).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_auto_load_skips_install() {
        let dir = TempDir::new().unwrap();
        let mut settings = test_support::settings_in(&dir);
        settings.crontab.auto_load = true;
        settings.crontab.install_command = "cronsync-no-such-installer".to_string();
        let (_, services) = test_support::services_with(&settings).await;

        let report = services.crontab.materialize("").await.unwrap();
        assert!(!report.installed);
        assert_eq!(
            report.spool,
            PathBuf::from(&settings.crontab.cron_dir).join("root")
        );
    }

    #[tokio::test]
    async fn test_write_failure_aborts_before_install() {
        let dir = TempDir::new().unwrap();
        let mut settings = test_support::settings_in(&dir);
        settings.crontab.install_command = "cronsync-no-such-installer".to_string();
        let (_, services) = test_support::services_with(&settings).await;
        std::fs::remove_dir(&settings.crontab.cron_dir).unwrap();

        let err = services.crontab.materialize("").await.unwrap_err();
        assert!(matches!(err, AppError::WriteFailure { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_failure_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let mut settings = test_support::settings_in(&dir);
        settings.crontab.install_command = "false".to_string();
        let (_, services) = test_support::services_with(&settings).await;

        let err = services.crontab.materialize("").await.unwrap_err();
        assert!(matches!(err, AppError::SubprocessFailure { status: Some(1), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_now_preserves_job_status() {
        let dir = TempDir::new().unwrap();
        let settings = test_support::settings_in(&dir);
        let (_, services) = test_support::services_with(&settings).await;
        let job = services
            .jobs
            .create_job(JobDraft::new("r", "echo out; echo err >&2; exit 3", "@daily"))
            .await
            .unwrap();

        let err = services.crontab.run_now(&job.id).await.unwrap_err();
        assert!(matches!(err, AppError::SubprocessFailure { status: Some(3), .. }));
        assert_eq!(err.exit_code(), 3);

        let run = PathScheme::from_settings(&settings).run_paths(&job.id);
        assert_eq!(tokio::fs::read_to_string(&run.stdout).await.unwrap(), "out\n");
        assert_eq!(tokio::fs::read_to_string(&run.stderr).await.unwrap(), "err\n");
        assert!(run.script.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_now_success() {
        let dir = TempDir::new().unwrap();
        let (_, services) = test_support::services(&dir).await;
        let job = services
            .jobs
            .create_job(JobDraft::new("r", "echo hello", "@daily"))
            .await
            .unwrap();

        let output = services.crontab.run_now(&job.id).await.unwrap();
        assert_eq!(output.stdout, "hello\n");
    }

    #[tokio::test]
    async fn test_run_now_unknown_job() {
        let dir = TempDir::new().unwrap();
        let (_, services) = test_support::services(&dir).await;
        assert!(matches!(
            services.crontab.run_now("missing").await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reconcile_updates_substring_matches() {
        let dir = TempDir::new().unwrap();
        let (store, services) = test_support::services(&dir).await;
        let existing = services
            .jobs
            .create_job(JobDraft::new("hi", "echo hi", "@hourly"))
            .await
            .unwrap();

        let report = services
            .crontab
            .reconcile("0 5 * * * echo hi there\n", 42)
            .await
            .unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.updated, 1);

        let jobs = store.find_all().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, existing.id);
        assert_eq!(jobs[0].schedule, "0 5 * * *");
        assert_eq!(jobs[0].command, "echo hi");
    }

    #[tokio::test]
    async fn test_reconcile_waits_for_writer_lock() {
        let dir = TempDir::new().unwrap();
        let (store, services) = test_support::services(&dir).await;
        let crontab = services.crontab.clone();

        let guard = services.crontab.writer.lock().await;
        let pending = tokio::spawn(async move {
            crontab.reconcile("@reboot /usr/bin/true\n", 7).await
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!pending.is_finished());
        assert!(store.find_all().await.unwrap().is_empty());

        drop(guard);
        let report = pending.await.unwrap().unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(store.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_creates_for_unmatched_lines() {
        let dir = TempDir::new().unwrap();
        let (store, services) = test_support::services(&dir).await;
        services
            .jobs
            .create_job(JobDraft::new("x", "echo unrelated", "@hourly"))
            .await
            .unwrap();

        let listing = "@reboot /usr/bin/true\nnot a valid line\n";
        let report = services.crontab.reconcile(listing, 1700).await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 0);

        let jobs = store.find_all().await.unwrap();
        assert_eq!(jobs.len(), 2);
        let imported = jobs
            .iter()
            .find(|job| job.command == "/usr/bin/true")
            .unwrap();
        assert_eq!(imported.name, "1700_0");
        assert_eq!(imported.schedule, "@reboot");
        assert!(!imported.stopped);
        assert!(!imported.logging);
        assert!(imported.mailing.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_updates_every_match() {
        let dir = TempDir::new().unwrap();
        let (store, services) = test_support::services(&dir).await;
        for command in ["backup", "backup.sh --all"] {
            services
                .jobs
                .create_job(JobDraft::new("b", command, "@hourly"))
                .await
                .unwrap();
        }

        let report = services
            .crontab
            .reconcile("15 3 * * 1 backup.sh --all", 0)
            .await
            .unwrap();
        assert_eq!(report.updated, 2);
        assert!(
            store
                .find_all()
                .await
                .unwrap()
                .iter()
                .all(|job| job.schedule == "15 3 * * 1")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_import_from_system_schedule() {
        let dir = TempDir::new().unwrap();
        let listing = dir.path().join("listing");
        std::fs::write(&listing, "*/5 * * * * /opt/poll.sh\n").unwrap();

        let mut settings = test_support::settings_in(&dir);
        settings.crontab.list_command = format!("cat {}", listing.display());
        let (store, services) = test_support::services_with(&settings).await;

        services.crontab.import_from_system_schedule().await;
        let jobs = store.find_all().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].schedule, "*/5 * * * *");
    }

    #[tokio::test]
    async fn test_import_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let mut settings = test_support::settings_in(&dir);
        settings.crontab.list_command = "cronsync-no-such-lister".to_string();
        let (store, services) = test_support::services_with(&settings).await;

        services.crontab.import_from_system_schedule().await;
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watch_rematerializes_on_change() {
        let dir = TempDir::new().unwrap();
        let mut settings = test_support::settings_in(&dir);
        settings.crontab.auto_load = true;
        let (_, services) = test_support::services_with(&settings).await;
        let spool = services.crontab.spool_file();

        let (tx, rx) = watch::channel(false);
        let crontab = services.crontab.clone();
        let handle = tokio::spawn(async move {
            crontab.watch(Duration::from_millis(20), rx).await;
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tokio::fs::read_to_string(&spool).await.unwrap(), "");

        let job = services
            .jobs
            .create_job(JobDraft::new("w", "echo watched", "@daily"))
            .await
            .unwrap();
        let store_file = PathScheme::from_settings(&settings).store_file();
        let later = filetime::FileTime::from_unix_time(4_000_000_000, 0);
        filetime::set_file_mtime(&store_file, later).unwrap();

        let mut found = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let contents = tokio::fs::read_to_string(&spool).await.unwrap();
            if contents.contains(&job.id) {
                found = true;
                break;
            }
        }
        assert!(found, "spool was not refreshed");

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn test_log_path_lives_under_log_dir() {
        let dir = TempDir::new().unwrap();
        let settings = test_support::settings_in(&dir);
        let log = PathScheme::from_settings(&settings).path("id", Purpose::Log);
        assert!(log.starts_with(&settings.storage.log_dir));
    }
}
