//! Template duplication recipes for new sheet sets

use super::traits::Ledger;
use crate::clients::CollaboratorError;
use crate::ledger::{
    debt_link_formula, debt_sheet_title, individual_sheet_title, CellValue, EVENT_DEBT_TEMPLATE,
    INDIVIDUAL_TEMPLATE, LIVE_DEBT_TEMPLATE, SUMMARY_LINK_CELL,
};
use crate::workflow::SheetCategory;

/// Create the sheets for a new event or live under `name`
pub async fn create_sheets(
    ledger: &dyn Ledger,
    category: SheetCategory,
    name: &str,
) -> Result<(), CollaboratorError> {
    match category {
        SheetCategory::Event => create_event_sheets(ledger, name).await,
        SheetCategory::Live => create_live_sheets(ledger, name).await,
    }
}

/// Individual sheet plus its debt sheet, with the individual summary cell
/// pointing at the debt total.
async fn create_event_sheets(ledger: &dyn Ledger, name: &str) -> Result<(), CollaboratorError> {
    let individual = duplicate(ledger, INDIVIDUAL_TEMPLATE, &individual_sheet_title(name)).await?;
    duplicate(ledger, EVENT_DEBT_TEMPLATE, &debt_sheet_title(name)).await?;

    ledger
        .write_cell(
            &individual,
            SUMMARY_LINK_CELL,
            CellValue::Formula(debt_link_formula(name)),
        )
        .await
}

async fn create_live_sheets(ledger: &dyn Ledger, name: &str) -> Result<(), CollaboratorError> {
    duplicate(ledger, LIVE_DEBT_TEMPLATE, &debt_sheet_title(name)).await?;
    Ok(())
}

async fn duplicate(
    ledger: &dyn Ledger,
    template: &str,
    new_title: &str,
) -> Result<super::traits::SheetRef, CollaboratorError> {
    let template = ledger.sheet(template).await?;
    let created = ledger.duplicate_sheet(&template, new_title).await?;
    tracing::info!(template = %template.title, sheet = %created.title, "Duplicated template sheet");
    Ok(created)
}
