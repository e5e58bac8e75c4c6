//! History scanner: derives actual per-day counts from the commit log.
//!
//! Counts are re-derived from the repository on every run; there is no
//! persisted ledger that could drift from the history it describes.

use mirror_core::{ContributionMap, DateRange, Identity};

use crate::error::SyncError;
use crate::git::GitRepo;

/// Count commits authored by `identity`, bucketed by the UTC date of their
/// author timestamp, for the days inside `range`.
///
/// Single pass over the log. An empty repository yields an empty map, which
/// reads as zero for every day.
pub fn scan(
    repo: &GitRepo,
    identity: &Identity,
    range: &DateRange,
) -> Result<ContributionMap, SyncError> {
    let mut actual = ContributionMap::new();
    let mut foreign = 0usize;
    for record in repo.log_records()? {
        if !identity.matches_email(&record.author_email) {
            foreign += 1;
            continue;
        }
        let day = record.authored_at.date_naive();
        if range.contains(day) {
            actual.increment(day);
        }
    }
    tracing::debug!(
        counted = actual.total(),
        skipped_foreign = foreign,
        range = %range,
        "scanned history"
    );
    Ok(actual)
}
