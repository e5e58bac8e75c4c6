//! # mirror-sync
//!
//! Idempotent delta sync between a desired contribution calendar and the
//! commit history of a mirror repository.
//!
//! Call [`pipeline::run`] to fetch desired counts, scan the repository,
//! plan the shortfall and (in apply mode) write and push the missing commits.

pub mod error;
pub mod git;
pub mod pipeline;
pub mod planner;
pub mod scanner;
pub mod source;
pub mod workdir;
pub mod writer;

pub use error::{GitError, SourceError, SyncError};
pub use git::{GitRepo, LogRecord};
pub use pipeline::{SyncMode, SyncOptions, SyncOutcome, SyncReport};
pub use planner::plan;
pub use scanner::scan;
pub use source::{ActivitySource, FileSource, StaticSource};
pub use workdir::Workdir;
pub use writer::{apply, ApplyReport, ACTIVITY_FILE};
