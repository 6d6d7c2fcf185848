//! Effects produced by state transitions

use super::state::{LedgerEntry, SheetCategory, StagedImage};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Answer on the event's reply token
    Reply(String),

    /// Send directly to the sender (reply token may have expired)
    Push(String),

    /// Fetch all sheet titles to check a proposed sheet name
    LoadSheetTitles { name: String },

    /// Run the duplication recipe for a new sheet set
    CreateSheets {
        category: SheetCategory,
        name: String,
    },

    /// List the sheets the accounting dialog can target
    ListAccountingSheets,

    /// Sum outstanding balances across debt sheets and reply with the report
    ReportDebts,

    /// Commit the collected entry and its receipts
    Finalize(FinalizeRequest),

    /// Delete staged receipt files that no session refers to any more
    DiscardStaged(Vec<StagedImage>),
}

/// Snapshot of a completed accounting session handed to the finalizer
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeRequest {
    pub entry: LedgerEntry,
    pub receipts: Vec<StagedImage>,
    /// Links from an earlier attempt, reused instead of uploading again
    pub uploaded_links: Vec<String>,
    /// Row left half-written by an earlier attempt
    pub partial_row: Option<u32>,
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply(text.into())
    }

    pub fn push(text: impl Into<String>) -> Self {
        Effect::Push(text.into())
    }
}
