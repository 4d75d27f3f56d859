//! Progress aggregation
//!
//! Pure functions over requirement bills and progress documents. A
//! commodity missing from a progress document counts as fully outstanding.

use crate::db::models::{Commodities, Progress};
use std::collections::BTreeMap;

/// Completion percentage of one project, 0..=100.
///
/// `None` for the bill means the project has no station requirement and is
/// reported as 0. Progress entries for commodities the bill does not require
/// are ignored.
pub fn completion_of(bill: Option<&Commodities>, progress: &Progress) -> u8 {
    let Some(bill) = bill else {
        return 0;
    };

    // i128 sums: remaining is unbounded and requirements may sit at i64::MAX
    let (total_required, total_remaining) = bill.required().fold(
        (0i128, 0i128),
        |(required, remaining), (commodity, quantity)| {
            (
                required + i128::from(quantity),
                remaining + i128::from(progress.remaining_for(commodity, quantity)),
            )
        },
    );

    if total_required <= 0 {
        return 0;
    }

    let delivered = (total_required - total_remaining) as f64;
    let percent = (100.0 * delivered / total_required as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Outstanding quantity per commodity across a system's projects.
///
/// Only projects with a bill and non-empty progress contribute. Commodities
/// whose summed requirement or summed remaining is not positive are left
/// out, so fully delivered commodities disappear. Totals beyond `i64::MAX`
/// are reported as `i64::MAX`.
pub fn system_aggregate<'a, I>(projects: I) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = (Option<&'a Commodities>, &'a Progress)>,
{
    let mut required_totals: BTreeMap<&str, i128> = BTreeMap::new();
    let mut remaining_totals: BTreeMap<&str, i128> = BTreeMap::new();

    for (bill, progress) in projects {
        let Some(bill) = bill else { continue };
        if progress.is_empty() {
            continue;
        }

        for (commodity, quantity) in bill.required() {
            *required_totals.entry(commodity).or_default() += i128::from(quantity);
            *remaining_totals.entry(commodity).or_default() +=
                i128::from(progress.remaining_for(commodity, quantity));
        }
    }

    remaining_totals
        .into_iter()
        .filter(|(commodity, remaining)| {
            *remaining > 0 && required_totals.get(commodity).copied().unwrap_or(0) > 0
        })
        .map(|(commodity, remaining)| {
            let remaining = i64::try_from(remaining).unwrap_or(i64::MAX);
            (commodity.to_string(), remaining)
        })
        .collect()
}
