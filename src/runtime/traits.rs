//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the dispatcher with mock implementations.

use crate::clients::CollaboratorError;
use crate::ledger::{CellRef, CellValue};
use async_trait::async_trait;

/// A sheet inside the ledger spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    pub id: i64,
    pub title: String,
}

/// Spreadsheet holding the accounting and debt sheets
#[async_trait]
pub trait Ledger: Send + Sync {
    /// All sheets in spreadsheet order
    async fn list_sheets(&self) -> Result<Vec<SheetRef>, CollaboratorError>;

    /// Look up a sheet by exact title
    async fn sheet(&self, title: &str) -> Result<SheetRef, CollaboratorError> {
        self.list_sheets()
            .await?
            .into_iter()
            .find(|s| s.title == title)
            .ok_or_else(|| CollaboratorError::not_found(format!("No sheet titled {title}")))
    }

    /// Copy a template sheet under a new title
    async fn duplicate_sheet(
        &self,
        template: &SheetRef,
        new_title: &str,
    ) -> Result<SheetRef, CollaboratorError>;

    /// Values of one column from `from_row` down to its last non-empty cell.
    /// Blank cells in between come back as empty strings.
    async fn read_column(
        &self,
        sheet: &SheetRef,
        column: u32,
        from_row: u32,
    ) -> Result<Vec<String>, CollaboratorError>;

    /// Write a single cell
    async fn write_cell(
        &self,
        sheet: &SheetRef,
        cell: CellRef,
        value: CellValue,
    ) -> Result<(), CollaboratorError>;
}

/// Cloud storage receiving the receipt images
#[async_trait]
pub trait ReceiptStorage: Send + Sync {
    /// Id of the folder named `name` under `parent_id`, created if missing
    async fn find_or_create_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<String, CollaboratorError>;

    /// Upload a file into a folder, returning a shareable link
    async fn upload(
        &self,
        folder_id: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, CollaboratorError>;
}

/// Chat platform the conversations happen on
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Answer an inbound event through its reply token
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), CollaboratorError>;

    /// Send a message to a sender directly
    async fn push(&self, to: &str, text: &str) -> Result<(), CollaboratorError>;

    /// Raw bytes of an inbound media message
    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>, CollaboratorError>;
}
