//! User-facing dialog text

use super::state::{SheetCategory, TransactionType};

pub const AUTH_SUCCEEDED: &str = "✅ Authentication succeeded! Commands are now available.";
pub const AUTH_REQUIRED: &str = "❌ Authentication required. Send the authentication key first.";
pub const UNSUPPORTED_SOURCE: &str = "❌ This bot can't be used here.";

pub const NOTHING_TO_CANCEL: &str = "⚠ There is nothing in progress to cancel.";
pub const SHEET_CREATION_CANCELLED: &str = "❌ Cancelled. Start again from the beginning.";
pub const ACCOUNTING_CANCELLED: &str = "❌ Accounting cancelled.";

pub const CHOOSE_CATEGORY: &str = "📌 Choose \"Event\" or \"Live\".";
pub const INVALID_CATEGORY: &str = "❌ Invalid choice. Enter \"Event\" or \"Live\".";

pub const INVALID_SHEET: &str = "❌ Unknown sheet name. Enter one of the sheets in the list.";
pub const CHOOSE_TYPE: &str = "📌 Enter \"Expense\" or \"Income\".";
pub const INVALID_TYPE: &str = "❌ Invalid input. Choose \"Expense\" or \"Income\".";
pub const ASK_QUANTITY: &str = "📌 Enter the quantity.";
pub const ASK_UNIT_PRICE: &str = "📌 Enter the unit price.";
pub const ASK_RECEIPTS: &str = "📌 Upload receipt photos (images only, several are fine). \
Send \"done\" when finished. <For income just send \"done\">";
pub const RECEIPTS_PENDING: &str = "📌 Send receipt photos, or \"done\" when finished.";
pub const ASK_PAID: &str = "📌 Has this been paid? (yes / no) <For income choose \"no\">";
pub const INVALID_PAID: &str = "❌ Invalid answer. Reply \"yes\" or \"no\".";
pub const RETRY_SAVE: &str =
    "⚠️ The last save failed. Reply \"yes\" or \"no\" to try again, or \"cancel\".";

pub const SAVE_FAILED: &str = "⚠️ An error occurred while saving the accounting data.";
pub const SHEET_LIST_FAILED: &str = "⚠️ Could not read the ledger. Please try again later.";
pub const IMAGE_FETCH_FAILED: &str = "⚠️ Could not fetch the image. Please send it again.";
pub const IMAGE_WITHOUT_SESSION: &str = "⚠️ Image received, but accounting has not been started. \
Send \"start accounting\" first.";
pub const DEBT_READ_FAILED: &str = "⚠️ Could not read the debt sheets. Please try again later.";
pub const NO_DEBTORS: &str = "There are no outstanding debts.";
pub const DEBT_REPORT_HEADER: &str = "📝 Outstanding debts 📝";

pub fn enter_sheet_name(category: SheetCategory) -> String {
    format!("📌 Enter the {} name.", category.label())
}

pub fn name_taken(name: &str) -> String {
    format!("❌ Sheet {name} already exists. Enter a different name.")
}

pub fn sheets_created(name: &str) -> String {
    format!("✅ Created sheet {name}!")
}

pub fn sheet_creation_failed(name: &str) -> String {
    format!("⚠️ Could not create sheet {name}. Enter the name again or \"cancel\".")
}

pub fn choose_sheet(sheets: &[String]) -> String {
    format!("📌 Choose a sheet:\n{}", sheets.join("\n"))
}

pub fn enter_item_name(transaction_type: TransactionType) -> String {
    format!("📌 Enter the {} item name.", transaction_type.label())
}

pub fn receipt_saved(count: usize) -> String {
    format!(
        "✅ Image saved ({count} so far)\nSend any other images, then \"done\" when finished."
    )
}

pub fn accounting_completed(uploaded: usize, paid_flag_failed: bool) -> String {
    let receipts = if uploaded == 1 {
        "1 receipt uploaded".to_string()
    } else {
        format!("{uploaded} receipts uploaded")
    };
    let mut text = format!("✅ Accounting completed! {receipts}.");
    if paid_flag_failed {
        text.push_str("\n⚠️ The paid flag could not be set.");
    }
    text
}
