//! Delta planner: the shortfall between desired and actual counts.

use mirror_core::{ContributionMap, DateRange, DeltaPlan, PlanEntry};

/// Compute the commits still missing for each day of `range`.
///
/// A day appears in the plan only when `desired > actual`; over-counted days
/// are left alone, the planner never proposes removing history. Entries come
/// out in ascending day order whatever the input maps look like, so the plan
/// printed by a preview is identical to the one an apply run executes.
pub fn plan(desired: &ContributionMap, actual: &ContributionMap, range: &DateRange) -> DeltaPlan {
    // Days absent from `desired` have a target of zero and cannot be short.
    let entries = desired
        .restrict(range)
        .iter()
        .filter_map(|(day, target)| {
            let count = target.saturating_sub(actual.get(day));
            (count > 0).then_some(PlanEntry { day, count })
        })
        .collect();
    DeltaPlan { entries }
}
