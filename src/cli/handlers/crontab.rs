//! Crontab command handlers: save, run, import-crontab, watch

use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;

use crate::error::AppResult;
use crate::services::CrontabService;

pub struct CrontabCommandHandler {
    crontab: CrontabService,
}

impl CrontabCommandHandler {
    pub fn new(crontab: CrontabService) -> Self {
        Self { crontab }
    }

    /// Materialize with `env`, or with the saved environment block
    pub async fn save(&self, env: Option<&str>) -> AppResult<()> {
        let report = match env {
            Some(env) => self.crontab.materialize(env).await?,
            None => self.crontab.autosave().await?,
        };
        if report.installed {
            println!(
                "Installed {} job(s) from {}",
                report.entries,
                report.spool.display()
            );
        } else {
            println!(
                "Wrote {} job(s) to {}",
                report.entries,
                report.spool.display()
            );
        }
        Ok(())
    }

    /// Run a job; on failure the caller exits with the job's status
    pub async fn run(&self, id: &str) -> AppResult<()> {
        let output = self.crontab.run_now(id).await?;
        print!("{}", output.stdout);
        eprint!("{}", output.stderr);
        Ok(())
    }

    pub async fn import_crontab(&self) -> AppResult<()> {
        self.crontab.import_from_system_schedule().await;
        Ok(())
    }

    /// Keep the crontab in sync until Ctrl+C or SIGTERM
    pub async fn watch(&self, interval_secs: u64) -> AppResult<()> {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown_signal().await;
            let _ = tx.send(true);
        });

        tracing::info!(interval_secs, "Watching the job store");
        self.crontab
            .watch(Duration::from_secs(interval_secs), rx)
            .await;
        Ok(())
    }
}

/// Waits for Ctrl+C or SIGTERM.
///
/// A signal handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
