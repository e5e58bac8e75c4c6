//! Contribution calendar of the source account.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use mirror_core::{AccountName, ContributionMap, DateRange, Day};
use mirror_sync::{ActivitySource, SourceError};

use crate::client::GithubClient;
use crate::error::GithubError;

/// Longest span `contributionsCollection` accepts in one query.
pub const MAX_CALENDAR_DAYS: u32 = 365;

const CREATED_AT_QUERY: &str = r#"
query($login: String!) {
  user(login: $login) {
    createdAt
  }
}
"#;

const CALENDAR_QUERY: &str = r#"
query($login: String!, $from: DateTime!, $to: DateTime!) {
  user(login: $login) {
    contributionsCollection(from: $from, to: $to) {
      contributionCalendar {
        weeks {
          contributionDays {
            date
            contributionCount
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct UserEnvelope<T> {
    user: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedAtUser {
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarUser {
    contributions_collection: ContributionsCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    contribution_calendar: Calendar,
}

#[derive(Debug, Deserialize)]
struct Calendar {
    weeks: Vec<Week>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Week {
    contribution_days: Vec<CalendarDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarDay {
    date: Day,
    contribution_count: u32,
}

/// Day the account was created; the first day of a backfill.
pub fn fetch_created_at(client: &GithubClient, login: &AccountName) -> Result<Day, GithubError> {
    let envelope: UserEnvelope<CreatedAtUser> =
        client.graphql(CREATED_AT_QUERY, json!({ "login": login.0 }))?;
    let user = envelope
        .user
        .ok_or_else(|| GithubError::UserNotFound(login.0.clone()))?;
    Ok(user.created_at.date_naive())
}

/// Desired counts read from the public contribution calendar.
#[derive(Debug, Clone)]
pub struct GithubActivitySource {
    client: GithubClient,
}

impl GithubActivitySource {
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }

    fn fetch_chunk(&self, login: &AccountName, chunk: &DateRange) -> Result<ContributionMap, GithubError> {
        let variables = json!({
            "login": login.0,
            "from": format!("{}T00:00:00Z", chunk.start()),
            "to": format!("{}T23:59:59Z", chunk.end()),
        });
        let envelope: UserEnvelope<CalendarUser> = self.client.graphql(CALENDAR_QUERY, variables)?;
        let user = envelope
            .user
            .ok_or_else(|| GithubError::UserNotFound(login.0.clone()))?;
        Ok(calendar_counts(user.contributions_collection.contribution_calendar))
    }
}

impl ActivitySource for GithubActivitySource {
    fn desired(&self, account: &AccountName, range: &DateRange) -> Result<ContributionMap, SourceError> {
        let mut merged = ContributionMap::new();
        for chunk in range
            .chunks(MAX_CALENDAR_DAYS)
            .map_err(|e| SourceError::Malformed(e.to_string()))?
        {
            tracing::info!(account = %account, chunk = %chunk, "fetching contribution calendar");
            merged.extend_from(self.fetch_chunk(account, &chunk)?);
        }
        Ok(merged.restrict(range))
    }
}

/// Days with at least one contribution. The calendar pads whole weeks, so
/// callers restrict the result to their range.
fn calendar_counts(calendar: Calendar) -> ContributionMap {
    calendar
        .weeks
        .into_iter()
        .flat_map(|week| week.contribution_days)
        .filter(|day| day.contribution_count > 0)
        .map(|day| (day.date, day.contribution_count))
        .collect()
}
