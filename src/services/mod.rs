pub mod account_registry;
pub mod billing_ledger;
pub mod dashboard_service;
pub mod ledger_engine;
pub mod numbering_service;

pub use account_registry::AccountRegistry;
pub use billing_ledger::BillingLedger;
pub use dashboard_service::DashboardService;
pub use ledger_engine::LedgerEngine;
pub use numbering_service::NumberingService;

use crate::error::{ErrorKind, Result};
use crate::observability::get_metrics;
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{error, warn};

/// Counts and logs a failed operation; successful results pass through.
pub(crate) fn track<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        let kind = err.kind();
        get_metrics().record_rejection(operation, kind);
        match kind {
            ErrorKind::Internal => error!(operation, error = %err, "Operation failed"),
            _ => warn!(operation, kind = kind.as_str(), error = %err, "Operation rejected"),
        }
    }
    result
}

/// Buckets child rows by their parent key, preserving row order.
pub(crate) fn group_by<K, V, F>(rows: Vec<V>, key: F) -> HashMap<K, Vec<V>>
where
    K: Eq + Hash,
    F: Fn(&V) -> K,
{
    let mut groups: HashMap<K, Vec<V>> = HashMap::new();
    for row in rows {
        groups.entry(key(&row)).or_default().push(row);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_group_by_preserves_order() {
        let rows = vec![(1, "a"), (2, "b"), (1, "c")];
        let groups = group_by(rows, |row| row.0);

        assert_eq!(groups[&1], vec![(1, "a"), (1, "c")]);
        assert_eq!(groups[&2], vec![(2, "b")]);
    }

    #[test]
    fn test_track_passes_results_through() {
        let ok: Result<i32> = track("test", Ok(7));
        assert_eq!(ok.unwrap(), 7);

        let err: Result<i32> = track("test", Err(AppError::Conflict("taken".to_string())));
        assert_eq!(err.unwrap_err().kind(), ErrorKind::Conflict);
    }
}
