//! Domain types for contribution mirroring.
//!
//! A [`Day`] is the atomic unit of accounting. Desired and actual counts are
//! both carried as [`ContributionMap`]s; the difference between them becomes a
//! [`DeltaPlan`] of synthetic commits to create.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A calendar date in UTC.
pub type Day = NaiveDate;

/// Parse a `YYYY-MM-DD` string into a [`Day`].
pub fn parse_day(input: &str) -> Result<Day, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidDate {
            input: input.to_owned(),
        }
    })
}

/// Noon UTC on `day`; the fixed author/committer time of every synthetic commit.
///
/// Noon keeps the commit on the same calendar day for any viewer within ±12h.
pub fn canonical_timestamp(day: Day) -> DateTime<Utc> {
    let naive = day.and_time(NaiveTime::MIN) + Duration::hours(12);
    Utc.from_utc_datetime(&naive)
}

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Login of the account whose public activity is mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountName(pub String);

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for AccountName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Author identity stamped on synthetic commits.
///
/// The history scanner only counts commits authored by this identity, so
/// scaffold commits or commits by other people never inflate the actual count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Case-insensitive email comparison, the way git hosts match authors.
    pub fn matches_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

// ---------------------------------------------------------------------------
// ContributionMap
// ---------------------------------------------------------------------------

/// Per-day contribution counts. Days without an entry count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContributionMap(BTreeMap<Day, u32>);

impl ContributionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `day`, zero when absent.
    pub fn get(&self, day: Day) -> u32 {
        self.0.get(&day).copied().unwrap_or(0)
    }

    pub fn set(&mut self, day: Day, count: u32) {
        self.0.insert(day, count);
    }

    pub fn increment(&mut self, day: Day) {
        *self.0.entry(day).or_insert(0) += 1;
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.0.values().map(|c| u64::from(*c)).sum()
    }

    /// Number of days with a non-zero count.
    pub fn active_days(&self) -> usize {
        self.0.values().filter(|c| **c > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_days() == 0
    }

    /// Copy containing only the days inside `range`.
    pub fn restrict(&self, range: &DateRange) -> Self {
        self.0
            .range(range.start()..=range.end())
            .map(|(day, count)| (*day, *count))
            .collect()
    }

    /// Entries in ascending day order.
    pub fn iter(&self) -> impl Iterator<Item = (Day, u32)> + '_ {
        self.0.iter().map(|(day, count)| (*day, *count))
    }

    /// Merge `other` into `self`; `other` wins on overlapping days.
    pub fn extend_from(&mut self, other: ContributionMap) {
        self.0.extend(other.0);
    }
}

impl FromIterator<(Day, u32)> for ContributionMap {
    fn from_iter<I: IntoIterator<Item = (Day, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// DateRange
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` range of days. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Day,
    end: Day,
}

impl DateRange {
    pub fn new(start: Day, end: Day) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(day: Day) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> Day {
        self.start
    }

    pub fn end(&self) -> Day {
        self.end
    }

    pub fn contains(&self, day: Day) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of days in the range, both ends included.
    pub fn len_days(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }

    /// Every day of the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = Day> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    /// Split into consecutive sub-ranges of at most `max_days` days each.
    pub fn chunks(&self, max_days: u32) -> Result<Vec<DateRange>, ValidationError> {
        if max_days == 0 {
            return Err(ValidationError::ZeroChunk);
        }
        let span = Duration::days(i64::from(max_days) - 1);
        let mut chunks = Vec::new();
        let mut chunk_start = self.start;
        loop {
            let chunk_end = (chunk_start + span).min(self.end);
            chunks.push(DateRange {
                start: chunk_start,
                end: chunk_end,
            });
            match chunk_end.succ_opt() {
                Some(next) if chunk_end < self.end => chunk_start = next,
                _ => break,
            }
        }
        Ok(chunks)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// DeltaPlan
// ---------------------------------------------------------------------------

/// Commits to add for a single day. `count` is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub day: Day,
    pub count: u32,
}

/// Chronologically ordered shortfall between desired and actual counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaPlan {
    pub entries: Vec<PlanEntry>,
}

impl DeltaPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_commits(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.count)).sum()
    }

    pub fn days(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
