//! Mirror core library: domain types and range validation.
//!
//! Public API surface:
//! - [`types`]: days, contribution maps, ranges, plans, identities
//! - [`error`]: [`ValidationError`]

pub mod error;
pub mod types;

pub use error::ValidationError;
pub use types::{
    canonical_timestamp, parse_day, AccountName, ContributionMap, DateRange, Day, DeltaPlan,
    Identity, PlanEntry,
};
