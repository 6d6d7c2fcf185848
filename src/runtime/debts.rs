//! Outstanding debt aggregation across debt sheets

use super::traits::Ledger;
use crate::clients::CollaboratorError;
use crate::ledger::{DEBT_COLUMN_PAIRS, DEBT_FIRST_ROW, DEBT_MARKER};
use crate::workflow::replies;
use std::collections::HashMap;

/// Total owed by one person
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtEntry {
    pub person: String,
    pub total: u64,
}

/// Per-person totals in first-seen order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DebtReport {
    entries: Vec<DebtEntry>,
    index: HashMap<String, usize>,
}

impl DebtReport {
    pub fn entries(&self) -> &[DebtEntry] {
        &self.entries
    }

    /// Add one (name, amount) row. Rows with an empty name or an amount that
    /// isn't a positive whole number are skipped. Totals saturate at `u64::MAX`.
    pub fn record(&mut self, name: &str, amount: &str) {
        let Some(amount) = parse_amount(amount) else {
            return;
        };
        if name.is_empty() {
            return;
        }
        if let Some(&i) = self.index.get(name) {
            let entry = &mut self.entries[i];
            entry.total = entry.total.saturating_add(amount);
        } else {
            self.index.insert(name.to_string(), self.entries.len());
            self.entries.push(DebtEntry {
                person: name.to_string(),
                total: amount,
            });
        }
    }

    /// Pair up a name column with its amount column
    pub fn record_columns(&mut self, names: &[String], amounts: &[String]) {
        for (name, amount) in names.iter().zip(amounts) {
            self.record(name, amount);
        }
    }

    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return replies::NO_DEBTORS.to_string();
        }
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}: {}", e.person, e.total))
            .collect();
        format!("{}\n{}", replies::DEBT_REPORT_HEADER, lines.join("\n"))
    }
}

fn parse_amount(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u64>().ok().filter(|&n| n > 0)
}

/// Read every debt sheet and total the outstanding amounts per person
pub async fn aggregate_debts(ledger: &dyn Ledger) -> Result<DebtReport, CollaboratorError> {
    let mut report = DebtReport::default();

    let sheets = ledger.list_sheets().await?;
    for sheet in sheets.iter().filter(|s| s.title.contains(DEBT_MARKER)) {
        for pair in DEBT_COLUMN_PAIRS {
            let names = ledger.read_column(sheet, pair.name, DEBT_FIRST_ROW).await?;
            let amounts = ledger.read_column(sheet, pair.amount, DEBT_FIRST_ROW).await?;
            report.record_columns(&names, &amounts);
        }
        tracing::debug!(sheet = %sheet.title, "Scanned debt sheet");
    }

    Ok(report)
}
