//! Pure state transition function
//!
//! Given the sender's current session and an event, decide how the session
//! changes and which effects the runtime must perform. No I/O happens here.

use super::effect::FinalizeRequest;
use super::replies;
use super::state::{
    AccountingSession, AccountingStep, Session, SheetCategory, SheetCreationSession,
    StagedImage, TransactionType,
};
use super::{Effect, Event};
use crate::ledger::name_collides;
use thiserror::Error;

// ============================================================================
// Commands
// ============================================================================

pub const CMD_SHEET: &str = "sheet";
pub const CMD_DEBT: &str = "debt";
pub const CMD_START_ACCOUNTING: &str = "start accounting";
/// Matched case-insensitively
pub const CMD_CANCEL: &str = "cancel";
/// Matched case-insensitively
pub const CMD_DONE: &str = "done";
pub const ANSWER_YES: &str = "yes";
pub const ANSWER_NO: &str = "no";

fn is_cancel(text: &str) -> bool {
    text.to_lowercase() == CMD_CANCEL
}

fn is_done(text: &str) -> bool {
    text.to_lowercase() == CMD_DONE
}

fn parse_yes_no(text: &str) -> Option<bool> {
    match text {
        ANSWER_YES => Some(true),
        ANSWER_NO => Some(false),
        _ => None,
    }
}

// ============================================================================
// Results
// ============================================================================

/// How the sender's session slot changes
#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    Unchanged,
    StartSheetCreation,
    StartAccounting { sheets: Vec<String> },
    /// Replace the active session with its next state
    Update(Session),
    /// Completed or cancelled
    Clear,
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub change: SessionChange,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(change: SessionChange) -> Self {
        Self {
            change,
            effects: vec![],
        }
    }

    pub fn unchanged() -> Self {
        Self::new(SessionChange::Unchanged)
    }

    pub fn update(session: Session) -> Self {
        Self::new(SessionChange::Update(session))
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Queue deletion of staged files, if there are any
    pub fn with_discard(mut self, images: Vec<StagedImage>) -> Self {
        if !images.is_empty() {
            self.effects.push(Effect::DiscardStaged(images));
        }
        self
    }
}

/// Inputs the current step can't accept. The session stays where it was.
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("{reprompt}")]
    InvalidStepInput { reprompt: &'static str },
    #[error("Sheet name already taken: {name}")]
    NameCollision { name: String },
    #[error("Invalid transition: {0}")]
    Unexpected(String),
}

impl TransitionError {
    fn invalid(reprompt: &'static str) -> Self {
        TransitionError::InvalidStepInput { reprompt }
    }

    /// Text to send back to the sender; `None` for internal inconsistencies
    pub fn user_message(&self) -> Option<String> {
        match self {
            TransitionError::InvalidStepInput { reprompt } => Some((*reprompt).to_string()),
            TransitionError::NameCollision { name } => Some(replies::name_taken(name)),
            TransitionError::Unexpected(_) => None,
        }
    }
}

// ============================================================================
// Transition
// ============================================================================

/// Pure transition function
pub fn transition(
    session: Option<&Session>,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (session, event) {
        (session, Event::Text(text)) => on_text(session, text),

        // Image intake
        (Some(Session::Accounting(acc)), Event::Image(image)) => {
            let mut next = acc.clone();
            next.receipt_images.push(image);
            let count = next.receipt_images.len();
            Ok(TransitionResult::update(Session::Accounting(next))
                .with_effect(Effect::reply(replies::receipt_saved(count))))
        }
        (_, Event::Image(image)) => Ok(TransitionResult::unchanged()
            .with_effect(Effect::reply(replies::IMAGE_WITHOUT_SESSION))
            .with_discard(vec![image])),

        // ============================================================
        // Sheet creation
        // ============================================================
        (
            Some(Session::SheetCreation(SheetCreationSession::NamingSheet { category })),
            Event::SheetTitlesLoaded { name, titles },
        ) => {
            if name_collides(&name, &titles) {
                return Err(TransitionError::NameCollision { name });
            }
            Ok(TransitionResult::unchanged().with_effect(Effect::CreateSheets {
                category: *category,
                name,
            }))
        }

        (Some(Session::SheetCreation(_)), Event::SheetsCreated { name }) => {
            Ok(TransitionResult::new(SessionChange::Clear)
                .with_effect(Effect::reply(replies::sheets_created(&name))))
        }

        (Some(Session::SheetCreation(_)), Event::SheetCreationFailed { name }) => {
            Ok(TransitionResult::unchanged()
                .with_effect(Effect::reply(replies::sheet_creation_failed(&name))))
        }

        // ============================================================
        // Accounting start
        // ============================================================
        (None, Event::AccountingSheetsListed { sheets }) => {
            let prompt = replies::choose_sheet(&sheets);
            Ok(TransitionResult::new(SessionChange::StartAccounting { sheets })
                .with_effect(Effect::reply(prompt)))
        }

        // A session appeared while the listing was in flight; starting is a no-op
        (Some(_), Event::AccountingSheetsListed { .. }) => Ok(TransitionResult::unchanged()),

        (_, Event::SheetListingFailed) => Ok(TransitionResult::unchanged()
            .with_effect(Effect::reply(replies::SHEET_LIST_FAILED))),

        // ============================================================
        // Finalize outcome
        // ============================================================
        (
            Some(Session::Accounting(acc)),
            Event::FinalizeCompleted {
                uploaded,
                paid_flag_failed,
            },
        ) => Ok(TransitionResult::new(SessionChange::Clear)
            .with_effect(Effect::push(replies::accounting_completed(
                uploaded,
                paid_flag_failed,
            )))
            .with_discard(acc.receipt_images.clone())),

        (
            Some(Session::Accounting(acc)),
            Event::FinalizeFailed {
                uploaded_links,
                partial_row,
            },
        ) => {
            let mut next = acc.clone();
            next.uploaded_links = uploaded_links;
            next.partial_row = partial_row;
            let staged = std::mem::take(&mut next.receipt_images);
            Ok(TransitionResult::update(Session::Accounting(next))
                .with_effect(Effect::push(replies::SAVE_FAILED))
                .with_discard(staged))
        }

        (session, event) => Err(TransitionError::Unexpected(format!(
            "{} with session {}",
            event.name(),
            session.map_or("none", Session::kind)
        ))),
    }
}

fn on_text(session: Option<&Session>, text: String) -> Result<TransitionResult, TransitionError> {
    if is_cancel(&text) {
        let result = match session {
            None => TransitionResult::unchanged()
                .with_effect(Effect::reply(replies::NOTHING_TO_CANCEL)),
            Some(Session::SheetCreation(_)) => TransitionResult::new(SessionChange::Clear)
                .with_effect(Effect::reply(replies::SHEET_CREATION_CANCELLED)),
            Some(Session::Accounting(acc)) => TransitionResult::new(SessionChange::Clear)
                .with_effect(Effect::reply(replies::ACCOUNTING_CANCELLED))
                .with_discard(acc.receipt_images.clone()),
        };
        return Ok(result);
    }

    match session {
        // An open sheet dialog consumes every message
        Some(Session::SheetCreation(sheet)) => sheet_creation_input(*sheet, text),

        _ if text == CMD_DEBT => Ok(TransitionResult::unchanged().with_effect(Effect::ReportDebts)),

        None if text == CMD_SHEET => Ok(TransitionResult::new(SessionChange::StartSheetCreation)
            .with_effect(Effect::reply(replies::CHOOSE_CATEGORY))),

        None if text == CMD_START_ACCOUNTING => {
            Ok(TransitionResult::unchanged().with_effect(Effect::ListAccountingSheets))
        }

        // Starting another dialog while one is open is ignored
        Some(Session::Accounting(_)) if text == CMD_SHEET || text == CMD_START_ACCOUNTING => {
            Ok(TransitionResult::unchanged())
        }

        Some(Session::Accounting(acc)) => accounting_input(acc, text),

        None => Ok(TransitionResult::unchanged()),
    }
}

fn sheet_creation_input(
    sheet: SheetCreationSession,
    text: String,
) -> Result<TransitionResult, TransitionError> {
    match sheet {
        SheetCreationSession::ChoosingCategory => {
            let category = SheetCategory::parse(&text)
                .ok_or(TransitionError::invalid(replies::INVALID_CATEGORY))?;
            Ok(TransitionResult::update(Session::SheetCreation(
                SheetCreationSession::NamingSheet { category },
            ))
            .with_effect(Effect::reply(replies::enter_sheet_name(category))))
        }
        SheetCreationSession::NamingSheet { .. } => {
            Ok(TransitionResult::unchanged().with_effect(Effect::LoadSheetTitles { name: text }))
        }
    }
}

fn accounting_input(
    acc: &AccountingSession,
    text: String,
) -> Result<TransitionResult, TransitionError> {
    let mut next = acc.clone();

    let prompt = match acc.step {
        AccountingStep::SelectSheet => {
            if !acc.offered_sheets.contains(&text) {
                return Err(TransitionError::invalid(replies::INVALID_SHEET));
            }
            next.target_sheet = Some(text);
            replies::CHOOSE_TYPE.to_string()
        }
        AccountingStep::ChooseType => {
            let transaction_type = TransactionType::parse(&text)
                .ok_or(TransitionError::invalid(replies::INVALID_TYPE))?;
            next.transaction_type = Some(transaction_type);
            replies::enter_item_name(transaction_type)
        }
        AccountingStep::ItemName => {
            next.item_name = Some(text);
            replies::ASK_QUANTITY.to_string()
        }
        AccountingStep::Quantity => {
            next.quantity = Some(text);
            replies::ASK_UNIT_PRICE.to_string()
        }
        AccountingStep::UnitPrice => {
            next.unit_price = Some(text);
            replies::ASK_RECEIPTS.to_string()
        }
        AccountingStep::Receipts => {
            if !is_done(&text) {
                return Err(TransitionError::invalid(replies::RECEIPTS_PENDING));
            }
            replies::ASK_PAID.to_string()
        }
        AccountingStep::PaymentConfirmation => {
            next.payment_confirmed =
                parse_yes_no(&text).ok_or(TransitionError::invalid(replies::INVALID_PAID))?;
            next.advance();
            return request_finalize(next);
        }
        AccountingStep::Finalizing => {
            // Only reachable after a failed save: the answer retries it
            next.payment_confirmed =
                parse_yes_no(&text).ok_or(TransitionError::invalid(replies::RETRY_SAVE))?;
            return request_finalize(next);
        }
    };

    next.advance();
    Ok(TransitionResult::update(Session::Accounting(next)).with_effect(Effect::reply(prompt)))
}

fn request_finalize(session: AccountingSession) -> Result<TransitionResult, TransitionError> {
    let entry = session.entry().ok_or_else(|| {
        TransitionError::Unexpected("finalize requested with missing fields".to_string())
    })?;
    let request = FinalizeRequest {
        entry,
        receipts: session.receipt_images.clone(),
        uploaded_links: session.uploaded_links.clone(),
        partial_row: session.partial_row,
    };
    Ok(TransitionResult::update(Session::Accounting(session))
        .with_effect(Effect::Finalize(request)))
}
