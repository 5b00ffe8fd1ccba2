//! Selection gate: threshold, rank, truncate.
//!
//! Ranking is by total only. Ties keep the order in which the items were
//! handed in, so the result never depends on evaluation completion order.
//! There is no de-duplication; one symbol may carry alerts from several
//! strategies.

use std::collections::BTreeMap;

use crate::domain::Alert;

/// Keep items with `total >= min_total`, sort descending by total (stable),
/// keep at most `max_count`. NaN totals never pass the threshold.
pub fn select<T, F>(items: Vec<T>, min_total: f64, max_count: usize, total: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    let mut kept: Vec<T> = items.into_iter().filter(|x| total(x) >= min_total).collect();
    kept.sort_by(|a, b| total(b).total_cmp(&total(a)));
    kept.truncate(max_count);
    kept
}

/// Gate limits for one pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolGate {
    pub min_total: f64,
    pub max_alerts: usize,
}

/// Apply each pool's gate to the alerts tagged with that pool, then merge the
/// survivors into one list ranked by total.
///
/// Alerts whose pool has no gate are dropped.
pub fn select_by_pool(alerts: Vec<Alert>, gates: &BTreeMap<String, PoolGate>) -> Vec<Alert> {
    let mut by_pool: BTreeMap<&str, Vec<(usize, Alert)>> = BTreeMap::new();
    for (idx, alert) in alerts.into_iter().enumerate() {
        if let Some((name, _)) = gates.get_key_value(alert.setup.pool.as_str()) {
            by_pool.entry(name.as_str()).or_default().push((idx, alert));
        }
    }

    let mut merged: Vec<(usize, Alert)> = Vec::new();
    for (pool, pool_alerts) in by_pool {
        if let Some(gate) = gates.get(pool) {
            merged.extend(select(pool_alerts, gate.min_total, gate.max_alerts, |(_, a)| {
                a.total()
            }));
        }
    }
    // Ties across pools fall back to input order
    merged.sort_by(|(ia, a), (ib, b)| b.total().total_cmp(&a.total()).then(ia.cmp(ib)));
    merged.into_iter().map(|(_, a)| a).collect()
}
