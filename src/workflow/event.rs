//! Events that drive a sender's dialog

use super::state::StagedImage;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Sender events
    /// Trimmed text from an authorized sender
    Text(String),
    /// Receipt image already written to the staging directory
    Image(StagedImage),

    // Ledger events
    SheetTitlesLoaded {
        name: String,
        titles: Vec<String>,
    },
    SheetsCreated {
        name: String,
    },
    SheetCreationFailed {
        name: String,
    },
    AccountingSheetsListed {
        sheets: Vec<String>,
    },
    SheetListingFailed,

    // Finalizer events
    FinalizeCompleted {
        uploaded: usize,
        paid_flag_failed: bool,
    },
    FinalizeFailed {
        /// Links already uploaded before the ledger write failed
        uploaded_links: Vec<String>,
        /// Row that received some cells before the failure
        partial_row: Option<u32>,
    },
}

impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Event::Text(text.into())
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::Text(_) => "text",
            Event::Image(_) => "image",
            Event::SheetTitlesLoaded { .. } => "sheet_titles_loaded",
            Event::SheetsCreated { .. } => "sheets_created",
            Event::SheetCreationFailed { .. } => "sheet_creation_failed",
            Event::AccountingSheetsListed { .. } => "accounting_sheets_listed",
            Event::SheetListingFailed => "sheet_listing_failed",
            Event::FinalizeCompleted { .. } => "finalize_completed",
            Event::FinalizeFailed { .. } => "finalize_failed",
        }
    }
}
