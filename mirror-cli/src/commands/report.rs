//! Human-readable output shared by `sync` and `scan`.

use std::io::{self, BufRead, Write};

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use mirror_core::{ContributionMap, DeltaPlan};
use mirror_sync::{SyncOutcome, SyncReport};

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "day")]
    day: String,
    #[tabled(rename = "desired")]
    desired: u32,
    #[tabled(rename = "actual")]
    actual: u32,
    #[tabled(rename = "add")]
    add: u32,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "day")]
    day: String,
    #[tabled(rename = "commits")]
    commits: u32,
}

/// Print the result of a sync run. `profile_url` is shown after a push.
pub fn print_sync(report: &SyncReport, profile_url: Option<&str>) {
    match &report.outcome {
        SyncOutcome::Previewed => print_preview(report),
        SyncOutcome::UpToDate if report.desired.is_empty() => {
            println!("No contributions found in the specified date range.");
        }
        SyncOutcome::UpToDate => println!("{}", "Mirror is already up to date.".green()),
        SyncOutcome::PushedBacklog { commits } => println!(
            "{} Mirror is up to date; pushed {commits} {} left over from an earlier run.",
            "✓".green(),
            commits_word(u64::from(*commits))
        ),
        SyncOutcome::Declined => println!("Aborted."),
        SyncOutcome::Applied { created, pushed } => {
            for entry in report.plan.iter() {
                println!(
                    "  {}: +{} {} {}",
                    entry.day,
                    entry.count,
                    commits_word(u64::from(entry.count)),
                    "✓".green()
                );
            }
            println!(
                "{} Created {created} {} across {} days in {}.",
                "✓".green(),
                commits_word(*created as u64),
                report.plan.days(),
                report.range
            );
            if *pushed {
                if let Some(url) = profile_url {
                    println!("Done! View your profile: {url}");
                }
            } else {
                println!("{}", "Push skipped (--no-push).".yellow());
            }
        }
    }
}

fn print_preview(report: &SyncReport) {
    let prefix = "[dry-run]".cyan();
    println!("{prefix} Range: {}", report.range);
    if report.desired.is_empty() {
        println!("{prefix} No contributions found in the specified date range.");
        return;
    }
    if report.plan.is_empty() {
        println!("{prefix} Mirror is already up to date.");
        return;
    }

    let rows: Vec<PlanRow> = report
        .plan
        .iter()
        .map(|entry| PlanRow {
            day: entry.day.to_string(),
            desired: report.desired.get(entry.day),
            actual: report.actual.get(entry.day),
            add: entry.count,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{prefix} Would create {} {} across {} days. Nothing was written.",
        report.plan.total_commits(),
        commits_word(report.plan.total_commits()),
        report.plan.days()
    );
}

/// Per-day counts as a table; used by `scan`.
pub fn print_counts(counts: &ContributionMap) {
    if counts.is_empty() {
        println!("No mirror commits in the specified date range.");
        return;
    }
    let rows: Vec<CountRow> = counts
        .iter()
        .map(|(day, commits)| CountRow {
            day: day.to_string(),
            commits,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} commits across {} days.", counts.total(), counts.active_days());
}

/// Show the plan and ask on stdin. Anything but `y`/`yes` (or EOF) declines.
pub fn confirm(plan: &DeltaPlan) -> bool {
    for entry in plan.iter() {
        println!("  {}: {} {}", entry.day, entry.count, commits_word(u64::from(entry.count)));
    }
    println!(
        "Commits to create: {} across {} days.",
        plan.total_commits(),
        plan.days()
    );
    print!("Proceed? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => is_yes(&answer),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn commits_word(n: u64) -> &'static str {
    if n == 1 {
        "commit"
    } else {
        "commits"
    }
}
