pub mod backup;
pub mod error;
pub mod import;
pub mod models;
pub mod paths;
pub mod process;
pub mod render;
pub mod schedule;

pub use error::{JobError, JobResult};
pub use models::{Job, JobDraft, JobListing, Mailing};
pub use paths::{JobPaths, PathScheme, Purpose, RunPaths};
