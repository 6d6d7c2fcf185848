//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{Collaborators, Dispatcher, Inbound, InboundMessage, RetryPolicy};
use crate::auth::AuthGate;
use crate::clients::CollaboratorError;
use crate::db::Database;
use crate::ledger::{CellRef, CellValue};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock Ledger
// ============================================================================

#[derive(Default)]
struct LedgerState {
    sheets: Vec<SheetRef>,
    cells: HashMap<(i64, u32, u32), CellValue>,
    writes: Vec<(String, CellRef, CellValue)>,
    next_id: i64,
    fail_reads: bool,
    fail_writes: bool,
    write_calls: usize,
    fail_write_at: Option<usize>,
}

/// In-memory spreadsheet
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&self, title: &str) -> SheetRef {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let sheet = SheetRef {
            id: state.next_id,
            title: title.to_string(),
        };
        state.sheets.push(sheet.clone());
        sheet
    }

    /// Seed a cell without recording it as a write
    pub fn set(&self, sheet: &SheetRef, column: u32, row: u32, value: CellValue) {
        self.state
            .lock()
            .unwrap()
            .cells
            .insert((sheet.id, column, row), value);
    }

    pub fn get(&self, sheet: &SheetRef, column: u32, row: u32) -> Option<CellValue> {
        self.state
            .lock()
            .unwrap()
            .cells
            .get(&(sheet.id, column, row))
            .cloned()
    }

    pub fn titles(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .sheets
            .iter()
            .map(|s| s.title.clone())
            .collect()
    }

    /// Every `write_cell` call as (sheet title, cell, value)
    pub fn writes(&self) -> Vec<(String, CellRef, CellValue)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Fail only the `n`th write from now on (1-based)
    pub fn fail_write_at(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        state.write_calls = 0;
        state.fail_write_at = Some(n);
    }
}

fn rendered(value: &CellValue) -> String {
    match value {
        CellValue::Text(s) | CellValue::Formula(s) => s.clone(),
        CellValue::Bool(true) => "TRUE".to_string(),
        CellValue::Bool(false) => "FALSE".to_string(),
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn list_sheets(&self) -> Result<Vec<SheetRef>, CollaboratorError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(CollaboratorError::server_error("HTTP 503: unavailable"));
        }
        Ok(state.sheets.clone())
    }

    async fn duplicate_sheet(
        &self,
        template: &SheetRef,
        new_title: &str,
    ) -> Result<SheetRef, CollaboratorError> {
        let mut state = self.state.lock().unwrap();
        if state.sheets.iter().any(|s| s.title == new_title) {
            return Err(CollaboratorError::invalid_request(format!(
                "HTTP 400: sheet {new_title} already exists"
            )));
        }
        if !state.sheets.iter().any(|s| s.id == template.id) {
            return Err(CollaboratorError::not_found("HTTP 404: no such sheet"));
        }

        state.next_id += 1;
        let sheet = SheetRef {
            id: state.next_id,
            title: new_title.to_string(),
        };
        let copied: Vec<_> = state
            .cells
            .iter()
            .filter(|((id, _, _), _)| *id == template.id)
            .map(|((_, column, row), value)| ((sheet.id, *column, *row), value.clone()))
            .collect();
        state.cells.extend(copied);
        state.sheets.push(sheet.clone());
        Ok(sheet)
    }

    async fn read_column(
        &self,
        sheet: &SheetRef,
        column: u32,
        from_row: u32,
    ) -> Result<Vec<String>, CollaboratorError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(CollaboratorError::server_error("HTTP 503: unavailable"));
        }
        let values: HashMap<u32, String> = state
            .cells
            .iter()
            .filter(|((id, col, row), _)| *id == sheet.id && *col == column && *row >= from_row)
            .map(|((_, _, row), value)| (*row, rendered(value)))
            .filter(|(_, value)| !value.is_empty())
            .collect();
        let Some(&last) = values.keys().max() else {
            return Ok(Vec::new());
        };
        Ok((from_row..=last)
            .map(|row| values.get(&row).cloned().unwrap_or_default())
            .collect())
    }

    async fn write_cell(
        &self,
        sheet: &SheetRef,
        cell: CellRef,
        value: CellValue,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state.lock().unwrap();
        state.write_calls += 1;
        if state.fail_writes || state.fail_write_at == Some(state.write_calls) {
            return Err(CollaboratorError::server_error("HTTP 500: write failed"));
        }
        if !state.sheets.iter().any(|s| s.id == sheet.id) {
            return Err(CollaboratorError::not_found("HTTP 404: no such sheet"));
        }
        state
            .cells
            .insert((sheet.id, cell.column, cell.row), value.clone());
        state.writes.push((sheet.title.clone(), cell, value));
        Ok(())
    }
}

// ============================================================================
// Mock Receipt Storage
// ============================================================================

/// One recorded upload
#[derive(Debug, Clone)]
pub struct Upload {
    pub folder_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: usize,
    pub link: String,
}

#[derive(Debug, Clone)]
struct Folder {
    id: String,
    name: String,
    parent_id: String,
}

#[derive(Default)]
struct StorageState {
    folders: Vec<Folder>,
    uploads: Vec<Upload>,
    failing_files: Vec<String>,
}

/// In-memory folder tree
#[derive(Default)]
pub struct MockStorage {
    state: Mutex<StorageState>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn folder_count(&self) -> usize {
        self.state.lock().unwrap().folders.len()
    }

    /// Slash-joined names from below the root down to the folder
    pub fn folder_path(&self, folder_id: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let mut names = Vec::new();
        let mut current = folder_id.to_string();
        while let Some(folder) = state.folders.iter().find(|f| f.id == current) {
            names.push(folder.name.clone());
            current = folder.parent_id.clone();
        }
        if names.is_empty() {
            return None;
        }
        names.reverse();
        Some(names.join("/"))
    }

    /// Make every upload of this file name fail
    pub fn fail_upload(&self, file_name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_files
            .push(file_name.to_string());
    }
}

#[async_trait]
impl ReceiptStorage for MockStorage {
    async fn find_or_create_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<String, CollaboratorError> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .folders
            .iter()
            .find(|f| f.name == name && f.parent_id == parent_id)
        {
            return Ok(existing.id.clone());
        }
        let id = format!("folder-{}", state.folders.len() + 1);
        state.folders.push(Folder {
            id: id.clone(),
            name: name.to_string(),
            parent_id: parent_id.to_string(),
        });
        Ok(id)
    }

    async fn upload(
        &self,
        folder_id: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, CollaboratorError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_files.iter().any(|f| f == file_name) {
            return Err(CollaboratorError::server_error("HTTP 500: upload failed"));
        }
        let link = format!(
            "https://drive.google.com/file/d/file-{}/view?usp=sharing",
            state.uploads.len() + 1
        );
        state.uploads.push(Upload {
            folder_id: folder_id.to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len(),
            link: link.clone(),
        });
        Ok(link)
    }
}

// ============================================================================
// Mock Chat Gateway
// ============================================================================

#[derive(Default)]
struct GatewayState {
    replies: Vec<(String, String)>,
    pushes: Vec<(String, String)>,
    attempts: usize,
    failures: VecDeque<CollaboratorError>,
    content: HashMap<String, Vec<u8>>,
    delays: HashMap<String, Duration>,
}

/// Records outgoing messages and serves seeded image content
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<GatewayState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` send attempts with `error`
    pub fn fail_next(&self, count: usize, error: CollaboratorError) {
        let mut state = self.state.lock().unwrap();
        state
            .failures
            .extend(std::iter::repeat(error).take(count));
    }

    pub fn set_content(&self, message_id: &str, bytes: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .content
            .insert(message_id.to_string(), bytes);
    }

    /// Hold the download of `message_id` for `delay` before answering
    pub fn delay_content(&self, message_id: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(message_id.to_string(), delay);
    }

    /// Send attempts, failed ones included
    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    /// Delivered replies as (reply token, text)
    pub fn replies(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().replies.clone()
    }

    /// Delivered pushes as (recipient, text)
    pub fn pushes(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().pushes.clone()
    }

    fn attempt(&self) -> Result<(), CollaboratorError> {
        let mut state = self.state.lock().unwrap();
        state.attempts += 1;
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), CollaboratorError> {
        self.attempt()?;
        self.state
            .lock()
            .unwrap()
            .replies
            .push((reply_token.to_string(), text.to_string()));
        Ok(())
    }

    async fn push(&self, to: &str, text: &str) -> Result<(), CollaboratorError> {
        self.attempt()?;
        self.state
            .lock()
            .unwrap()
            .pushes
            .push((to.to_string(), text.to_string()));
        Ok(())
    }

    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>, CollaboratorError> {
        let delay = self.state.lock().unwrap().delays.get(message_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state
            .lock()
            .unwrap()
            .content
            .get(message_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::not_found(format!("HTTP 404: no content for {message_id}")))
    }
}

// ============================================================================
// Test Bot
// ============================================================================

/// A dispatcher wired to mocks, an in-memory allow-list and a temporary
/// staging directory
pub struct TestBot {
    pub dispatcher: Arc<Dispatcher>,
    pub ledger: Arc<MockLedger>,
    pub storage: Arc<MockStorage>,
    pub gateway: Arc<MockGateway>,
    next_token: AtomicUsize,
    _staging: tempfile::TempDir,
}

impl TestBot {
    pub const SECRET: &'static str = "test-secret";

    pub fn new() -> Self {
        let ledger = Arc::new(MockLedger::new());
        let storage = Arc::new(MockStorage::new());
        let gateway = Arc::new(MockGateway::new());
        let staging = tempfile::tempdir().unwrap();

        let gate = AuthGate::load(Self::SECRET, Database::open_in_memory().unwrap()).unwrap();
        let collaborators = Collaborators {
            ledger: ledger.clone(),
            storage: storage.clone(),
            gateway: gateway.clone(),
        };
        let policy = RetryPolicy {
            max_attempts: 2,
            backoff: Duration::ZERO,
        };
        let dispatcher = Arc::new(Dispatcher::new(
            gate,
            collaborators,
            policy,
            staging.path().to_path_buf(),
            "root".to_string(),
        ));

        Self {
            dispatcher,
            ledger,
            storage,
            gateway,
            next_token: AtomicUsize::new(1),
            _staging: staging,
        }
    }

    fn reply_token(&self) -> Option<String> {
        Some(format!("reply-{}", self.next_token.fetch_add(1, Ordering::SeqCst)))
    }

    pub async fn text(&self, sender: &str, text: &str) {
        self.dispatcher
            .handle_event(Inbound {
                sender: Some(sender.to_string()),
                reply_token: self.reply_token(),
                message: InboundMessage::Text(text.to_string()),
            })
            .await;
    }

    pub async fn image(&self, sender: &str, message_id: &str) {
        self.dispatcher
            .handle_event(Inbound {
                sender: Some(sender.to_string()),
                reply_token: self.reply_token(),
                message: InboundMessage::Image {
                    message_id: message_id.to_string(),
                },
            })
            .await;
    }

    /// Text of every delivered reply, in order
    pub fn reply_texts(&self) -> Vec<String> {
        self.gateway
            .replies()
            .into_iter()
            .map(|(_, text)| text)
            .collect()
    }
}

impl Default for TestBot {
    fn default() -> Self {
        Self::new()
    }
}
