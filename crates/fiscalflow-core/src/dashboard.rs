//! Batch-level summary of the extracted records.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::Serialize;

use crate::models::{Direction, InvoiceRecord, InvoiceStatus, TaxField};

/// Count and sums for one direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectionTotals {
    pub count: usize,
    pub total_amount: f64,
    /// Sums of the summary taxes (ICMS, IPI, PIS, COFINS).
    pub taxes: BTreeMap<TaxField, f64>,
}

impl DirectionTotals {
    pub fn tax(&self, field: &TaxField) -> f64 {
        self.taxes.get(field).copied().unwrap_or(0.0)
    }

    fn add(&mut self, record: &InvoiceRecord) {
        self.count += 1;
        self.total_amount += record.total_amount;
        for field in TaxField::SUMMARY.iter() {
            *self.taxes.entry(field.clone()).or_insert(0.0) += record.tax_amounts.get(field);
        }
    }

    fn merge(&mut self, other: DirectionTotals) {
        self.count += other.count;
        self.total_amount += other.total_amount;
        for (field, amount) in other.taxes {
            *self.taxes.entry(field).or_insert(0.0) += amount;
        }
    }
}

/// Dashboard counters for a batch.
///
/// Cancelled records only contribute to `total` and `cancelled`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub authorized: usize,
    pub cancelled: usize,
    pub inbound: DirectionTotals,
    pub outbound: DirectionTotals,
    /// Sum of `vProd` over non-cancelled records.
    pub goods_total: f64,
    /// Normalized process keys seen on non-cancelled records.
    pub unique_processes: BTreeSet<String>,
    /// Non-cancelled outbound records per process key.
    pub outbound_process_counts: BTreeMap<String, usize>,
}

impl DashboardSummary {
    /// Fold one record into the summary.
    pub fn add(mut self, record: &InvoiceRecord) -> Self {
        self.total += 1;
        if record.is_cancelled() {
            self.cancelled += 1;
            return self;
        }
        if record.status == InvoiceStatus::Authorized {
            self.authorized += 1;
        }

        match record.direction {
            Some(Direction::Inbound) => self.inbound.add(record),
            _ => self.outbound.add(record),
        }
        self.goods_total += record.total_goods_amount;

        if record.has_process() {
            self.unique_processes.insert(record.process_key.clone());
            if record.direction != Some(Direction::Inbound) {
                *self
                    .outbound_process_counts
                    .entry(record.process_key.clone())
                    .or_insert(0) += 1;
            }
        }
        self
    }

    /// Combine two partial summaries.
    pub fn merge(mut self, other: DashboardSummary) -> Self {
        self.total += other.total;
        self.authorized += other.authorized;
        self.cancelled += other.cancelled;
        self.inbound.merge(other.inbound);
        self.outbound.merge(other.outbound);
        self.goods_total += other.goods_total;
        self.unique_processes.extend(other.unique_processes);
        for (key, count) in other.outbound_process_counts {
            *self.outbound_process_counts.entry(key).or_insert(0) += count;
        }
        self
    }

    /// Processes with more than one outbound invoice; the operator must
    /// confirm how many to expect before reconciliation.
    pub fn processes_needing_confirmation(&self) -> BTreeMap<&str, usize> {
        self.outbound_process_counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(key, count)| (key.as_str(), *count))
            .collect()
    }
}

/// Summarize a batch in a single pass.
pub fn aggregate(records: &[InvoiceRecord]) -> DashboardSummary {
    records.iter().fold(DashboardSummary::default(), DashboardSummary::add)
}

/// Summarize a batch on the rayon pool.
///
/// Counters are exact; floating-point sums may differ from [`aggregate`] in
/// the last bits because the addition order is not fixed.
pub fn aggregate_parallel(records: &[InvoiceRecord]) -> DashboardSummary {
    records
        .par_iter()
        .fold(DashboardSummary::default, DashboardSummary::add)
        .reduce(DashboardSummary::default, DashboardSummary::merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CancellationSource;
    use pretty_assertions::assert_eq;

    fn record(direction: Direction, total: f64, key: &str) -> InvoiceRecord {
        let mut r = InvoiceRecord::empty("x.xml");
        r.direction = Some(direction);
        r.status = InvoiceStatus::Authorized;
        r.total_amount = total;
        r.total_goods_amount = total;
        r.tax_amounts.insert(TaxField::Icms, total / 10.0);
        r.process_key = key.to_string();
        r
    }

    #[test]
    fn test_cancelled_counts_only() {
        let mut cancelled = record(Direction::Outbound, 999.0, "N/A");
        cancelled.status = InvoiceStatus::Cancelled(CancellationSource::Protocol);
        let records = vec![
            record(Direction::Outbound, 100.0, "N/A"),
            record(Direction::Outbound, 50.0, "N/A"),
            cancelled,
        ];

        let summary = aggregate(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.authorized, 2);
        assert_eq!(summary.outbound.count, 2);
        assert_eq!(summary.outbound.total_amount, 150.0);
        assert_eq!(summary.outbound.tax(&TaxField::Icms), 15.0);
        assert_eq!(summary.goods_total, 150.0);
    }

    #[test]
    fn test_direction_split() {
        let records = vec![
            record(Direction::Inbound, 10.0, "N/A"),
            record(Direction::Outbound, 20.0, "N/A"),
        ];
        let summary = aggregate(&records);
        assert_eq!(summary.inbound.count, 1);
        assert_eq!(summary.inbound.total_amount, 10.0);
        assert_eq!(summary.outbound.total_amount, 20.0);
        assert_eq!(summary.inbound.tax(&TaxField::Ipi), 0.0);
    }

    #[test]
    fn test_processes_needing_confirmation() {
        let records = vec![
            record(Direction::Outbound, 1.0, "AIMP1"),
            record(Direction::Outbound, 1.0, "AIMP1"),
            record(Direction::Outbound, 1.0, "BIMP2"),
            record(Direction::Inbound, 1.0, "BIMP2"),
            record(Direction::Inbound, 1.0, "CIMP3"),
            record(Direction::Inbound, 1.0, "CIMP3"),
        ];
        let summary = aggregate(&records);

        assert_eq!(
            summary.processes_needing_confirmation(),
            BTreeMap::from([("AIMP1", 2)])
        );
        assert_eq!(summary.unique_processes.len(), 3);
    }

    #[test]
    fn test_parallel_matches_sequential_counts() {
        let records: Vec<_> = (0..200)
            .map(|i| {
                let direction = if i % 3 == 0 { Direction::Inbound } else { Direction::Outbound };
                record(direction, 1.0, &format!("P{}IMP1", i % 7))
            })
            .collect();

        let sequential = aggregate(&records);
        let parallel = aggregate_parallel(&records);
        assert_eq!(parallel.total, sequential.total);
        assert_eq!(parallel.outbound.count, sequential.outbound.count);
        assert_eq!(parallel.outbound_process_counts, sequential.outbound_process_counts);
        assert_eq!(parallel.outbound.total_amount, sequential.outbound.total_amount);
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(aggregate(&[]), DashboardSummary::default());
    }
}
