//! Conversational workflow state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! sheet-creation and accounting dialogs are sequenced by [`transition`], and
//! the runtime performs the resulting effects.

mod effect;
pub mod event;
pub mod replies;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, FinalizeRequest};
pub use event::Event;
pub use state::{
    AccountingSession, AccountingStep, LedgerEntry, Session, SheetCategory,
    SheetCreationSession, StagedImage, TransactionType,
};
pub use transition::{transition, SessionChange, TransitionError, TransitionResult};
