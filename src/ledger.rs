//! Ledger spreadsheet layout
//!
//! Sheet naming conventions, the fixed column layout of the accounting
//! sheets, and A1 cell addressing.

use crate::workflow::TransactionType;
use std::fmt;

// ============================================================================
// Sheet naming
// ============================================================================

/// Marker contained in every per-event accounting sheet title
pub const INDIVIDUAL_MARKER: &str = "individual";

/// Marker contained in every debt sheet title
pub const DEBT_MARKER: &str = "debt";

pub const INDIVIDUAL_TEMPLATE: &str = "individual template";
pub const EVENT_DEBT_TEMPLATE: &str = "debt(Event) template";
pub const LIVE_DEBT_TEMPLATE: &str = "debt(Live) template";

pub fn individual_sheet_title(name: &str) -> String {
    format!("{name} {INDIVIDUAL_MARKER}")
}

pub fn debt_sheet_title(name: &str) -> String {
    format!("{DEBT_MARKER}({name})")
}

/// Whether a new sheet name clashes with an existing title under either
/// naming convention.
pub fn name_collides<S: AsRef<str>>(name: &str, existing_titles: &[S]) -> bool {
    let individual = individual_sheet_title(name);
    let debt = debt_sheet_title(name);
    existing_titles
        .iter()
        .any(|t| t.as_ref() == individual || t.as_ref() == debt)
}

/// Sheets offered at the start of the accounting dialog, in ledger order.
pub fn accounting_sheet_titles<S: AsRef<str>>(titles: &[S]) -> Vec<String> {
    titles
        .iter()
        .map(AsRef::as_ref)
        .filter(|t| t.contains(INDIVIDUAL_MARKER) && !t.contains(INDIVIDUAL_TEMPLATE))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Cells
// ============================================================================

/// A 1-based cell position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub column: u32,
    pub row: u32,
}

impl CellRef {
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// A1 notation, e.g. `W4`
    pub fn a1(&self) -> String {
        format!("{}{}", column_letters(self.column), self.row)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.a1())
    }
}

/// Convert a 1-based column index to its letter form (1 -> A, 27 -> AA).
pub fn column_letters(column: u32) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Quote a sheet title for use in an A1 range (`'My sheet'!A1`).
pub fn quoted_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Value written into a single cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    /// Stored verbatim, never interpreted
    Text(String),
    /// Parsed by the ledger as user input
    Formula(String),
    Bool(bool),
}

// ============================================================================
// Column layout
// ============================================================================

/// Column that defines the "last used row" of an accounting sheet
pub const ANCHOR_COLUMN: u32 = 1;

/// Absolute columns written for one transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub item: u32,
    pub quantity: u32,
    pub unit_price: u32,
    pub receipts: u32,
    pub paid: u32,
}

impl ColumnLayout {
    /// Expense group, columns A..K
    pub const EXPENSE: ColumnLayout = ColumnLayout::from_base(1);
    /// Income group, columns N..X
    pub const INCOME: ColumnLayout = ColumnLayout::from_base(14);

    const fn from_base(base: u32) -> Self {
        Self {
            item: base,
            quantity: base + 1,
            unit_price: base + 2,
            receipts: base + 4,
            paid: base + 10,
        }
    }

    pub fn for_type(transaction_type: TransactionType) -> Self {
        match transaction_type {
            TransactionType::Expense => Self::EXPENSE,
            TransactionType::Income => Self::INCOME,
        }
    }
}

/// Cell of a new individual sheet that links to its debt sheet total
pub const SUMMARY_LINK_CELL: CellRef = CellRef::new(23, 4);

/// Total cell on a debt sheet
pub const DEBT_TOTAL_CELL: CellRef = CellRef::new(9, 6);

/// Formula linking an individual sheet to the debt sheet of the same name
pub fn debt_link_formula(name: &str) -> String {
    format!("={}!{}", quoted_title(&debt_sheet_title(name)), DEBT_TOTAL_CELL)
}

/// A (name, amount) column pair on a debt sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebtColumns {
    pub name: u32,
    pub amount: u32,
}

/// Primary (A/E) and secondary (K/O) debtor columns
pub const DEBT_COLUMN_PAIRS: [DebtColumns; 2] = [
    DebtColumns { name: 1, amount: 5 },
    DebtColumns { name: 11, amount: 15 },
];

/// First data row on a debt sheet, below the header block
pub const DEBT_FIRST_ROW: u32 = 5;
