//! Reconciliation of inbound service charges against outbound invoices.
//!
//! An inbound invoice carrying a trading service charge is substantiated by
//! the outbound invoices of the same process. The charge is authorized when
//! the number of outbound invoices found matches what the operator expects,
//! or when the operator was not asked and at least one was found.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ReconciliationInputError;
use crate::models::InvoiceRecord;
use crate::nfe::rules::process_key;

/// Non-cancelled outbound records grouped by normalized process key.
///
/// Records without a resolvable key are left out.
#[derive(Debug, Default)]
pub struct ProcessGroups<'a> {
    groups: BTreeMap<&'a str, Vec<&'a InvoiceRecord>>,
}

impl<'a> ProcessGroups<'a> {
    pub fn build(records: &'a [InvoiceRecord]) -> Self {
        let mut groups: BTreeMap<&'a str, Vec<&'a InvoiceRecord>> = BTreeMap::new();
        for record in records
            .iter()
            .filter(|r| r.is_outbound() && !r.is_cancelled() && r.has_process())
        {
            groups.entry(record.process_key.as_str()).or_default().push(record);
        }
        Self { groups }
    }

    /// Number of outbound invoices found for a key (0 when there is no group).
    pub fn found(&self, key: &str) -> usize {
        self.groups.get(key).map_or(0, Vec::len)
    }

    pub fn get(&self, key: &str) -> Option<&[&'a InvoiceRecord]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.groups.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Operator-confirmed total of outbound invoices per process.
///
/// Labels are normalized on insertion so that `EMALI.IMP001/2025` and
/// `emali imp 001 2025` address the same process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectedCounts(BTreeMap<String, u32>);

impl ExpectedCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the operator's answer for a process label.
    pub fn insert(&mut self, label: &str, expected: i64) -> Result<(), ReconciliationInputError> {
        let key = process_key(label);
        let expected = u32::try_from(expected)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ReconciliationInputError::NonPositiveExpected {
                process_key: key.clone(),
            })?;
        self.0.insert(key, expected);
        Ok(())
    }

    /// Expected count for a normalized key.
    pub fn get(&self, key: &str) -> Option<u32> {
        self.0.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject any expectation below what was already found.
    pub fn validate(&self, groups: &ProcessGroups<'_>) -> Result<(), ReconciliationInputError> {
        for (key, expected) in self.iter() {
            let found = groups.found(key);
            if (expected as usize) < found {
                return Err(ReconciliationInputError::ExpectedBelowFound {
                    process_key: key.to_string(),
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// A service charge that is not yet substantiated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingEntry {
    pub record: InvoiceRecord,
    /// Outbound invoices found for the process.
    pub found: usize,
    /// Operator-confirmed total, when asked.
    pub expected: Option<u32>,
    /// Outbound invoices still to be issued; unknown without an expectation.
    pub to_issue: Option<u32>,
}

/// Partition of the service-charge records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub authorized: Vec<InvoiceRecord>,
    pub pending: Vec<PendingEntry>,
}

/// Reconcile every non-cancelled inbound service charge in the batch.
///
/// Expected counts are validated before any decision is made.
pub fn reconcile(
    records: &[InvoiceRecord],
    expected_counts: &ExpectedCounts,
) -> Result<ReconciliationReport, ReconciliationInputError> {
    let groups = ProcessGroups::build(records);
    expected_counts.validate(&groups)?;

    let mut report = ReconciliationReport::default();

    for record in records
        .iter()
        .filter(|r| r.is_inbound() && !r.is_cancelled() && r.service_charge_amount > 0.0)
    {
        let found = groups.found(&record.process_key);
        let expected = expected_counts.get(&record.process_key);

        let authorized = match expected {
            Some(expected) => found == expected as usize,
            None => found > 0,
        };

        debug!(
            "{}: process {} found {} expected {:?} -> {}",
            record.source_name,
            record.process_key,
            found,
            expected,
            if authorized { "authorized" } else { "pending" }
        );

        if authorized {
            report.authorized.push(record.clone());
        } else {
            report.pending.push(PendingEntry {
                record: record.clone(),
                found,
                expected,
                // `validate` rejected any expectation below `found`.
                to_issue: expected.map(|e| e - found as u32),
            });
        }
    }

    info!(
        "Reconciled {} service charge(s): {} authorized, {} pending",
        report.authorized.len() + report.pending.len(),
        report.authorized.len(),
        report.pending.len()
    );

    Ok(report)
}
