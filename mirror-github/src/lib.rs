//! # mirror-github
//!
//! GitHub collaborators for the mirror: the contribution calendar of the
//! source account (an [`mirror_sync::ActivitySource`]), the account creation
//! date used for backfills, and provisioning of the mirror repository.

pub mod client;
pub mod contributions;
pub mod error;
pub mod repos;

pub use client::GithubClient;
pub use contributions::{fetch_created_at, GithubActivitySource, MAX_CALENDAR_DAYS};
pub use error::GithubError;
pub use repos::{authenticated_clone_url, RemoteRepo};
