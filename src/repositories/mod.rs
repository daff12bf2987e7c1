//! Repository layer for job persistence.

mod job_repo;
mod traits;

pub use job_repo::FileJobStore;
pub(crate) use job_repo::{parse_documents, write_atomic};
pub use traits::JobStore;
