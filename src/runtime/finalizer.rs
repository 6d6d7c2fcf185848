//! Commit a completed accounting session to storage and the ledger

use super::traits::{Ledger, ReceiptStorage, SheetRef};
use crate::clients::CollaboratorError;
use crate::ledger::{CellRef, CellValue, ColumnLayout, ANCHOR_COLUMN};
use crate::workflow::{FinalizeRequest, LedgerEntry, StagedImage};
use thiserror::Error;

const DEFAULT_RECEIPT_MIME: &str = "image/jpeg";

/// Outcome of a successful commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeReport {
    /// Receipts now stored, including ones uploaded by an earlier attempt
    pub uploaded: usize,
    pub paid_flag_failed: bool,
}

/// The ledger row could not be written
#[derive(Debug, Error)]
#[error("Ledger write failed: {source}")]
pub struct FinalizeFailure {
    pub source: CollaboratorError,
    /// Receipts that did reach storage before the failure
    pub uploaded_links: Vec<String>,
    /// Row that already holds some of the entry's cells
    pub partial_row: Option<u32>,
}

struct RowWriteError {
    source: CollaboratorError,
    partial_row: Option<u32>,
}

pub struct Finalizer<'a> {
    ledger: &'a dyn Ledger,
    storage: &'a dyn ReceiptStorage,
    root_folder_id: &'a str,
}

impl<'a> Finalizer<'a> {
    pub fn new(
        ledger: &'a dyn Ledger,
        storage: &'a dyn ReceiptStorage,
        root_folder_id: &'a str,
    ) -> Self {
        Self {
            ledger,
            storage,
            root_folder_id,
        }
    }

    pub async fn finalize(
        &self,
        request: &FinalizeRequest,
    ) -> Result<FinalizeReport, FinalizeFailure> {
        let entry = &request.entry;

        let mut links = request.uploaded_links.clone();
        links.extend(self.upload_receipts(entry, &request.receipts).await);

        let (sheet, row) = match self.write_row(entry, &links, request.partial_row).await {
            Ok(written) => written,
            Err(RowWriteError { source, partial_row }) => {
                return Err(FinalizeFailure {
                    source,
                    uploaded_links: links,
                    partial_row,
                })
            }
        };
        tracing::info!(sheet = %sheet.title, row, "Accounting row written");

        let mut paid_flag_failed = false;
        if entry.payment_confirmed {
            if let Err(e) = self.mark_paid(&sheet, entry).await {
                tracing::error!(sheet = %sheet.title, error = %e, "Failed to set paid flag");
                paid_flag_failed = true;
            }
        }

        Ok(FinalizeReport {
            uploaded: links.len(),
            paid_flag_failed,
        })
    }

    /// Upload staged receipts into `<sheet>/<item>/`, skipping any that fail
    async fn upload_receipts(&self, entry: &LedgerEntry, receipts: &[StagedImage]) -> Vec<String> {
        if receipts.is_empty() {
            return Vec::new();
        }

        let folder_id = match self.receipt_folder(entry).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    sheet = %entry.target_sheet,
                    item = %entry.item_name,
                    error = %e,
                    "Could not prepare receipt folder, skipping uploads"
                );
                return Vec::new();
            }
        };

        let mut links = Vec::with_capacity(receipts.len());
        for image in receipts {
            match self.upload_one(&folder_id, image).await {
                Ok(link) => {
                    tracing::info!(message_id = %image.message_id, link = %link, "Receipt uploaded");
                    links.push(link);
                }
                Err(e) => {
                    tracing::warn!(
                        message_id = %image.message_id,
                        path = %image.path.display(),
                        error = %e,
                        "Receipt upload failed, skipping"
                    );
                }
            }
        }
        links
    }

    async fn receipt_folder(&self, entry: &LedgerEntry) -> Result<String, CollaboratorError> {
        let sheet_folder = self
            .storage
            .find_or_create_folder(&entry.target_sheet, self.root_folder_id)
            .await?;
        self.storage
            .find_or_create_folder(&entry.item_name, &sheet_folder)
            .await
    }

    async fn upload_one(
        &self,
        folder_id: &str,
        image: &StagedImage,
    ) -> Result<String, CollaboratorError> {
        let bytes = tokio::fs::read(&image.path).await.map_err(|e| {
            CollaboratorError::not_found(format!("{}: {e}", image.path.display()))
        })?;
        let file_name = image
            .path
            .file_name()
            .map_or_else(|| format!("{}.jpg", image.message_id), |n| n.to_string_lossy().into_owned());
        let mime_type = mime_guess::from_path(&image.path)
            .first_raw()
            .unwrap_or(DEFAULT_RECEIPT_MIME);
        self.storage
            .upload(folder_id, &file_name, mime_type, bytes)
            .await
    }

    /// Append the entry below the last used row of the anchor column, or
    /// complete `partial_row` when an earlier attempt stopped halfway
    async fn write_row(
        &self,
        entry: &LedgerEntry,
        links: &[String],
        partial_row: Option<u32>,
    ) -> Result<(SheetRef, u32), RowWriteError> {
        let unstarted = |source| RowWriteError {
            source,
            partial_row,
        };
        let sheet = self.ledger.sheet(&entry.target_sheet).await.map_err(unstarted)?;
        let layout = ColumnLayout::for_type(entry.transaction_type);
        let row = match partial_row {
            Some(row) => {
                tracing::info!(sheet = %sheet.title, row, "Completing partly written row");
                row
            }
            None => self.last_used_row(&sheet).await.map_err(unstarted)? + 1,
        };

        let mut cells = vec![
            (layout.item, CellValue::Text(entry.item_name.clone())),
            (layout.quantity, CellValue::Text(entry.quantity.clone())),
            (layout.unit_price, CellValue::Text(entry.unit_price.clone())),
        ];
        if !links.is_empty() {
            cells.push((layout.receipts, CellValue::Text(links.join(", "))));
        }

        let mut started = partial_row.is_some();
        for (column, value) in cells {
            if let Err(source) = self
                .ledger
                .write_cell(&sheet, CellRef::new(column, row), value)
                .await
            {
                return Err(RowWriteError {
                    source,
                    partial_row: started.then_some(row),
                });
            }
            started = true;
        }
        Ok((sheet, row))
    }

    /// Set the paid flag on the row found by re-reading the anchor column.
    ///
    /// For expense rows this is the row just written. Income rows leave the
    /// anchor column untouched, so the flag lands one row above them.
    async fn mark_paid(&self, sheet: &SheetRef, entry: &LedgerEntry) -> Result<(), CollaboratorError> {
        let layout = ColumnLayout::for_type(entry.transaction_type);
        let row = self.last_used_row(sheet).await?;
        if row == 0 {
            return Err(CollaboratorError::not_found(format!(
                "No used rows in {}",
                sheet.title
            )));
        }
        let cell = CellRef::new(layout.paid, row);
        tracing::info!(sheet = %sheet.title, cell = %cell, "Marking entry as paid");
        self.ledger
            .write_cell(sheet, cell, CellValue::Bool(true))
            .await
    }

    async fn last_used_row(&self, sheet: &SheetRef) -> Result<u32, CollaboratorError> {
        let used = self.ledger.read_column(sheet, ANCHOR_COLUMN, 1).await?.len();
        u32::try_from(used)
            .map_err(|_| CollaboratorError::unknown(format!("{used} rows exceed the sheet limit")))
    }
}
