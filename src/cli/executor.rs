//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use super::handlers::{BackupCommandHandler, CrontabCommandHandler, JobCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::Settings;
use crate::error::AppResult;
use crate::state::AppState;

/// Execute a CLI command with the given settings
///
/// Loads the job store first; a store that fails to load aborts every
/// command. Without a subcommand the jobs are listed.
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    let state = AppState::new(&settings).await?;
    let services = state.services;

    let jobs = || JobCommandHandler::new(services.jobs.clone());
    let crontab = || CrontabCommandHandler::new(services.crontab.clone());
    let backups = || BackupCommandHandler::new(services.backups.clone());

    match &cli.command {
        None => jobs().list(false).await,
        Some(Commands::List { json }) => jobs().list(*json).await,
        Some(Commands::Add(args)) => jobs().add(args.clone()).await,
        Some(Commands::Edit { id, changes }) => jobs().edit(id, changes.clone()).await,
        Some(Commands::Stop { id }) => jobs().stop(id).await,
        Some(Commands::Start { id }) => jobs().start(id).await,
        Some(Commands::Remove { id }) => jobs().remove(id).await,
        Some(Commands::Log { id }) => jobs().log(id).await,
        Some(Commands::Save { env }) => crontab().save(env.as_deref()).await,
        Some(Commands::Run { id }) => crontab().run(id).await,
        Some(Commands::ImportCrontab) => crontab().import_crontab().await,
        Some(Commands::Watch { interval }) => crontab().watch(*interval).await,
        Some(Commands::Backup) => backups().backup().await,
        Some(Commands::Backups) => backups().list().await,
        Some(Commands::Restore { name }) => backups().restore(name).await,
        Some(Commands::DeleteBackup { name }) => backups().delete(name).await,
        Some(Commands::Preview { name }) => backups().preview(name).await,
        Some(Commands::Export { path }) => backups().export(path).await,
        Some(Commands::Import { path }) => backups().import(path).await,
        Some(Commands::Reset) => backups().reset().await,
    }
}
