use std::cmp::Ordering;

use anomscope_core::{AnomalyRecord, to_number};

/// Sort key for records whose cost does not coerce. Below every finite cost,
/// so such records sort last without colliding with a genuine zero.
pub const MISSING_COST_KEY: f64 = f64::NEG_INFINITY;

pub fn cost_sort_key(record: &AnomalyRecord, cost_field: &str) -> f64 {
    to_number(record.get(cost_field)).unwrap_or(MISSING_COST_KEY)
}

/// Reorders `indices` by descending cost. Stable: ties keep input order.
pub fn sort_indices_by_cost(
    records: &[AnomalyRecord],
    indices: &[usize],
    cost_field: &str,
) -> Vec<usize> {
    let mut keyed: Vec<(f64, usize)> = indices
        .iter()
        .map(|index| (cost_sort_key(&records[*index], cost_field), *index))
        .collect();
    keyed.sort_by(|left, right| descending(left.0, right.0));
    keyed.into_iter().map(|(_, index)| index).collect()
}

pub fn sort_records_by_cost<'a>(
    mut records: Vec<&'a AnomalyRecord>,
    cost_field: &str,
) -> Vec<&'a AnomalyRecord> {
    records.sort_by(|left, right| {
        descending(
            cost_sort_key(left, cost_field),
            cost_sort_key(right, cost_field),
        )
    });
    records
}

fn descending(left: f64, right: f64) -> Ordering {
    right.partial_cmp(&left).unwrap_or(Ordering::Equal)
}
