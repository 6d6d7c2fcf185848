//! Google Sheets v4 ledger

use super::{checked_text, endpoint, http_client, parse_json, CollaboratorError, GoogleAuth};
use crate::ledger::{column_letters, quoted_title, CellRef, CellValue};
use crate::runtime::{Ledger, SheetRef};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================
// Wire types
// ============================================================

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

impl From<SheetProperties> for SheetRef {
    fn from(p: SheetProperties) -> Self {
        SheetRef {
            id: p.sheet_id,
            title: p.title,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchReply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchReply {
    duplicate_sheet: Option<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueUpdate<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: [[Value; 1]; 1],
}

/// Render a returned cell as the text the sheet displays
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Value input option and JSON payload for a write
fn encode_value(value: CellValue) -> (&'static str, Value) {
    match value {
        CellValue::Text(s) => ("RAW", Value::String(s)),
        CellValue::Formula(f) => ("USER_ENTERED", Value::String(f)),
        CellValue::Bool(b) => ("RAW", Value::Bool(b)),
    }
}

/// `'Title'!E5:E`, an open-ended range down one column
fn column_range(title: &str, column: u32, from_row: u32) -> String {
    let letters = column_letters(column);
    format!("{}!{letters}{from_row}:{letters}", quoted_title(title))
}

fn cell_range(title: &str, cell: CellRef) -> String {
    format!("{}!{}", quoted_title(title), cell.a1())
}

// ============================================================
// Client
// ============================================================

pub struct SheetsLedger {
    client: Client,
    auth: Arc<GoogleAuth>,
    spreadsheet_id: String,
    api_base: String,
}

impl SheetsLedger {
    pub fn new(spreadsheet_id: String, auth: Arc<GoogleAuth>) -> Result<Self, CollaboratorError> {
        Self::with_base_url(spreadsheet_id, auth, API_BASE)
    }

    pub fn with_base_url(
        spreadsheet_id: String,
        auth: Arc<GoogleAuth>,
        api_base: &str,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(TIMEOUT)?,
            auth,
            spreadsheet_id,
            api_base: api_base.to_string(),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, CollaboratorError> {
        let token = self.auth.bearer().await?;
        let response = request.bearer_auth(token).send().await?;
        let result = checked_text(response).await;
        if let Err(e) = &result {
            if e.kind == super::CollaboratorErrorKind::Auth {
                self.auth.invalidate().await;
            }
        }
        result
    }
}

#[async_trait]
impl Ledger for SheetsLedger {
    async fn list_sheets(&self) -> Result<Vec<SheetRef>, CollaboratorError> {
        let url = endpoint(&self.api_base, &[self.spreadsheet_id.as_str()])?;
        let body = self
            .send(self.client.get(url).query(&[("fields", "sheets.properties")]))
            .await?;
        let spreadsheet: SpreadsheetResponse = parse_json(&body)?;
        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|s| s.properties.into())
            .collect())
    }

    async fn duplicate_sheet(
        &self,
        template: &SheetRef,
        new_title: &str,
    ) -> Result<SheetRef, CollaboratorError> {
        let batch_path = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = endpoint(&self.api_base, &[batch_path.as_str()])?;
        let request = json!({
            "requests": [{
                "duplicateSheet": {
                    "sourceSheetId": template.id,
                    "newSheetName": new_title,
                }
            }]
        });
        let body = self.send(self.client.post(url).json(&request)).await?;
        let response: BatchUpdateResponse = parse_json(&body)?;
        response
            .replies
            .into_iter()
            .find_map(|r| r.duplicate_sheet)
            .map(|entry| entry.properties.into())
            .ok_or_else(|| CollaboratorError::unknown("duplicateSheet reply missing"))
    }

    async fn read_column(
        &self,
        sheet: &SheetRef,
        column: u32,
        from_row: u32,
    ) -> Result<Vec<String>, CollaboratorError> {
        let range = column_range(&sheet.title, column, from_row);
        let url = endpoint(&self.api_base, &[self.spreadsheet_id.as_str(), "values", range.as_str()])?;
        let body = self
            .send(self.client.get(url).query(&[("majorDimension", "COLUMNS")]))
            .await?;
        let value_range: ValueRange = parse_json(&body)?;
        Ok(value_range
            .values
            .into_iter()
            .next()
            .unwrap_or_default()
            .iter()
            .map(cell_text)
            .collect())
    }

    async fn write_cell(
        &self,
        sheet: &SheetRef,
        cell: CellRef,
        value: CellValue,
    ) -> Result<(), CollaboratorError> {
        let range = cell_range(&sheet.title, cell);
        let url = endpoint(&self.api_base, &[self.spreadsheet_id.as_str(), "values", range.as_str()])?;
        let (input_option, value) = encode_value(value);
        let update = ValueUpdate {
            range: &range,
            major_dimension: "ROWS",
            values: [[value]],
        };
        self.send(
            self.client
                .put(url)
                .query(&[("valueInputOption", input_option)])
                .json(&update),
        )
        .await?;
        Ok(())
    }
}
