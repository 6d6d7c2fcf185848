//! Session state types

use std::path::PathBuf;

// ============================================================================
// Dialog vocabulary
// ============================================================================

/// Kind of ledger sheet set created by the sheet dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetCategory {
    Event,
    Live,
}

impl SheetCategory {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "Event" => Some(Self::Event),
            "Live" => Some(Self::Live),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Event => "Event",
            Self::Live => "Live",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Expense,
    Income,
}

impl TransactionType {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "Expense" => Some(Self::Expense),
            "Income" => Some(Self::Income),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Expense => "Expense",
            Self::Income => "Income",
        }
    }
}

/// Receipt image fetched from the gateway and written to the staging directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub message_id: String,
    pub path: PathBuf,
}

// ============================================================================
// Sessions
// ============================================================================

/// The single dialog a sender may have in flight
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    SheetCreation(SheetCreationSession),
    Accounting(AccountingSession),
}

impl Session {
    pub fn kind(&self) -> &'static str {
        match self {
            Session::SheetCreation(_) => "sheet_creation",
            Session::Accounting(_) => "accounting",
        }
    }

    pub fn as_accounting(&self) -> Option<&AccountingSession> {
        match self {
            Session::Accounting(a) => Some(a),
            Session::SheetCreation(_) => None,
        }
    }
}

/// Sheet dialog: step 1 picks the category, step 2 names the sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetCreationSession {
    ChoosingCategory,
    NamingSheet { category: SheetCategory },
}

impl SheetCreationSession {
    pub fn step(self) -> u8 {
        match self {
            Self::ChoosingCategory => 1,
            Self::NamingSheet { .. } => 2,
        }
    }
}

/// Position in the accounting dialog; each variant names the input awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountingStep {
    SelectSheet,
    ChooseType,
    ItemName,
    Quantity,
    UnitPrice,
    Receipts,
    PaymentConfirmation,
    /// Commit requested; only reachable again after a failed save
    Finalizing,
}

impl AccountingStep {
    pub fn number(self) -> u8 {
        match self {
            Self::SelectSheet => 1,
            Self::ChooseType => 2,
            Self::ItemName => 3,
            Self::Quantity => 4,
            Self::UnitPrice => 5,
            Self::Receipts => 6,
            Self::PaymentConfirmation => 7,
            Self::Finalizing => 8,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::SelectSheet => Some(Self::ChooseType),
            Self::ChooseType => Some(Self::ItemName),
            Self::ItemName => Some(Self::Quantity),
            Self::Quantity => Some(Self::UnitPrice),
            Self::UnitPrice => Some(Self::Receipts),
            Self::Receipts => Some(Self::PaymentConfirmation),
            Self::PaymentConfirmation => Some(Self::Finalizing),
            Self::Finalizing => None,
        }
    }
}

/// Fields collected by the accounting dialog
#[derive(Debug, Clone, PartialEq)]
pub struct AccountingSession {
    pub step: AccountingStep,
    /// Sheets offered at step 1; the answer must be one of them
    pub offered_sheets: Vec<String>,
    pub target_sheet: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub item_name: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub receipt_images: Vec<StagedImage>,
    pub payment_confirmed: bool,
    /// Share links produced by an earlier finalize attempt whose ledger write failed
    pub uploaded_links: Vec<String>,
    /// Row an earlier attempt started writing; a retry completes it in place
    pub partial_row: Option<u32>,
}

impl AccountingSession {
    pub fn new(offered_sheets: Vec<String>) -> Self {
        Self {
            step: AccountingStep::SelectSheet,
            offered_sheets,
            target_sheet: None,
            transaction_type: None,
            item_name: None,
            quantity: None,
            unit_price: None,
            receipt_images: Vec::new(),
            payment_confirmed: false,
            uploaded_links: Vec::new(),
            partial_row: None,
        }
    }

    /// Move to the following step. The final step stays put.
    pub fn advance(&mut self) {
        if let Some(next) = self.step.next() {
            self.step = next;
        }
    }

    /// The ledger row described by this session, once every field is collected
    pub fn entry(&self) -> Option<LedgerEntry> {
        Some(LedgerEntry {
            target_sheet: self.target_sheet.clone()?,
            transaction_type: self.transaction_type?,
            item_name: self.item_name.clone()?,
            quantity: self.quantity.clone()?,
            unit_price: self.unit_price.clone()?,
            payment_confirmed: self.payment_confirmed,
        })
    }
}

/// One accounting row ready to be committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub target_sheet: String,
    pub transaction_type: TransactionType,
    pub item_name: String,
    pub quantity: String,
    pub unit_price: String,
    pub payment_confirmed: bool,
}
