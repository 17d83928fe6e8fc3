//! Headline figures for an uploaded dataset.

use tracing::warn;

use crate::status::RestockStatus;

/// Alert threshold used when none is configured.
pub const DEFAULT_ALERT_THRESHOLD: usize = 5;

/// Item counts per status plus the restock alert.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DatasetSummary {
    /// Number of items in the dataset.
    pub total_items: usize,
    /// Items labeled "Needs Restock".
    pub needs_restock: usize,
    /// Items labeled "No Restock Needed".
    pub no_restock_needed: usize,
    /// Alert fires when `needs_restock` exceeds this.
    pub alert_threshold: usize,
    /// `true` when more than `alert_threshold` items need restocking.
    pub restock_alert: bool,
}

impl DatasetSummary {
    /// Summarize a column of labels.
    #[must_use]
    pub fn from_labels(labels: &[RestockStatus], alert_threshold: usize) -> Self {
        let needs_restock = labels
            .iter()
            .filter(|&&s| s == RestockStatus::NeedsRestock)
            .count();
        let restock_alert = needs_restock > alert_threshold;
        if restock_alert {
            warn!(needs_restock, alert_threshold, "restock alert: items need restocking");
        }
        Self {
            total_items: labels.len(),
            needs_restock,
            no_restock_needed: labels.len() - needs_restock,
            alert_threshold,
            restock_alert,
        }
    }

    /// Return the count for `status`.
    #[must_use]
    pub fn count(&self, status: RestockStatus) -> usize {
        match status {
            RestockStatus::NeedsRestock => self.needs_restock,
            RestockStatus::NoRestockNeeded => self.no_restock_needed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RestockStatus::{NeedsRestock, NoRestockNeeded};

    #[test]
    fn counts_and_alert() {
        let labels = [vec![NeedsRestock; 6], vec![NoRestockNeeded; 3]].concat();
        let summary = DatasetSummary::from_labels(&labels, DEFAULT_ALERT_THRESHOLD);
        assert_eq!(summary.total_items, 9);
        assert_eq!(summary.count(NeedsRestock), 6);
        assert_eq!(summary.count(NoRestockNeeded), 3);
        assert!(summary.restock_alert);
    }

    #[test]
    fn alert_is_strictly_greater() {
        let labels = vec![NeedsRestock; 5];
        assert!(!DatasetSummary::from_labels(&labels, 5).restock_alert);
        assert!(DatasetSummary::from_labels(&labels, 4).restock_alert);
    }

    #[test]
    fn empty_dataset() {
        let summary = DatasetSummary::from_labels(&[], DEFAULT_ALERT_THRESHOLD);
        assert_eq!(summary.total_items, 0);
        assert!(!summary.restock_alert);
    }
}
