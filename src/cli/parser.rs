//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::build;
use crate::jobs::Mailing;

/// Keeps the OS crontab in sync with a job store
#[derive(Parser, Debug)]
#[command(name = "cronsync")]
#[command(about = "Keeps the OS crontab in sync with a job store")]
#[command(long_about = "
cronsync manages shell jobs in a job store and materializes them into the
operating system's crontab, with stdout and stderr of every run captured to
separate files.

EXAMPLES:
    # Add a job and install the crontab
    cronsync add --name nightly --command 'backup.sh' --schedule '0 2 * * *'
    cronsync save

    # Run a job right away
    cronsync run <ID>

    # Snapshot the job store, then restore it later
    cronsync backup
    cronsync backups
    cronsync restore 'backup of: Mon Oct 19 2026 10:48:00 GMT 0200.db'

    # Pull in entries somebody added with `crontab -e`
    cronsync import-crontab

    # Re-install the crontab whenever the job store changes
    cronsync watch --interval 5
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute; `list` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Read this single TOML file instead of the layered configuration
    /// directory. The file must exist and be readable.
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Available values: development (dev), production (prod), test
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Fields of a new job
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Display name
    #[arg(long)]
    pub name: String,

    /// Shell command to run
    #[arg(long)]
    pub command: String,

    /// Five-field cron expression or @reboot, @daily, ...
    #[arg(long)]
    pub schedule: String,

    /// Append captured stderr to the job's log after every run
    #[arg(long)]
    pub logging: bool,

    /// Command receiving the captured stdout on its stdin after every run
    #[arg(long, value_name = "COMMAND")]
    pub hook: Option<String>,

    /// Mailer settings as a JSON object
    #[arg(long, value_name = "JSON", value_parser = super::validation::parse_mailing)]
    pub mailing: Option<Mailing>,
}

/// Fields to change on an existing job; omitted fields keep their value
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub command: Option<String>,

    #[arg(long)]
    pub schedule: Option<String>,

    #[arg(long, value_name = "BOOL")]
    pub logging: Option<bool>,

    /// New hook; an empty string removes it
    #[arg(long, value_name = "COMMAND")]
    pub hook: Option<String>,

    /// New mailer settings; `{}` disables mailing
    #[arg(long, value_name = "JSON", value_parser = super::validation::parse_mailing)]
    pub mailing: Option<Mailing>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List jobs, newest first, with their next run
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Add a job
    Add(JobArgs),
    /// Change fields of a job
    Edit {
        id: String,
        #[command(flatten)]
        changes: EditArgs,
    },
    /// Keep a job in the store but leave it out of the crontab
    Stop { id: String },
    /// Put a stopped job back into the crontab
    Start { id: String },
    /// Delete a job
    Remove { id: String },
    /// Print a job's stderr log
    Log { id: String },
    /// Write the crontab and install it
    ///
    /// Without --env the previously saved environment block is reused.
    Save {
        /// Environment block placed at the top of the crontab
        #[arg(long, value_name = "TEXT")]
        env: Option<String>,
    },
    /// Run a job now; exits with the job's own status
    Run { id: String },
    /// Snapshot the job store
    Backup,
    /// List snapshots, newest first
    Backups,
    /// Replace the job store with a snapshot
    Restore { name: String },
    /// Delete a snapshot
    DeleteBackup { name: String },
    /// Show the jobs inside a snapshot
    Preview { name: String },
    /// Copy the job store to a file
    Export { path: PathBuf },
    /// Replace the job store with a file
    Import { path: PathBuf },
    /// Merge the current OS crontab into the job store
    ImportCrontab,
    /// Delete the job store and the environment block
    Reset,
    /// Save now, then save again whenever the job store changes
    Watch {
        /// Seconds between checks of the job store file
        #[arg(long, value_name = "SECS", default_value_t = 2, value_parser = super::validation::validate_interval)]
        interval: u64,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "production", alias = "prod")]
    Production,
    #[value(name = "test")]
    Test,
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Production => crate::config::Environment::Production,
            Environment::Test => crate::config::Environment::Test,
        }
    }
}
