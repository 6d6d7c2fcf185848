//! Property-based tests for the dialog state machine
//!
//! Random message sequences are pushed through [`transition`] with a scripted
//! collaborator standing in for the runtime, and the slot is checked after
//! every step.

use super::transition::{CMD_SHEET, CMD_START_ACCOUNTING};
use super::*;
use crate::runtime::SessionSlot;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::VecDeque;
use std::path::PathBuf;

const SHEETS: [&str; 2] = ["Gala individual", "Tour individual"];

// ============================================================================
// Arbitrary Generators
// ============================================================================

#[derive(Debug, Clone)]
enum Input {
    Text(String),
    Image(String),
}

fn arb_known_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("sheet"),
        Just("debt"),
        Just("start accounting"),
        Just("cancel"),
        Just("Cancel"),
        Just("done"),
        Just("DONE"),
        Just("yes"),
        Just("no"),
        Just("Event"),
        Just("Live"),
        Just("Expense"),
        Just("Income"),
        Just("Gala individual"),
        Just("Tour individual"),
        Just("Snacks"),
        Just("12"),
    ]
    .prop_map(String::from)
}

fn arb_input() -> impl Strategy<Value = Input> {
    prop_oneof![
        6 => arb_known_text().prop_map(Input::Text),
        2 => "[a-zA-Z0-9 ]{1,12}".prop_map(Input::Text),
        1 => "[0-9]{6}".prop_map(Input::Image),
    ]
}

/// How the scripted ledger answers
#[derive(Debug, Clone, Copy)]
struct Script {
    creation_succeeds: bool,
    finalize_succeeds: bool,
}

fn arb_script() -> impl Strategy<Value = Script> {
    (any::<bool>(), any::<bool>()).prop_map(|(creation_succeeds, finalize_succeeds)| Script {
        creation_succeeds,
        finalize_succeeds,
    })
}

// ============================================================================
// Harness
// ============================================================================

fn to_event(input: Input) -> Event {
    match input {
        Input::Text(text) => Event::Text(text),
        Input::Image(id) => Event::Image(StagedImage {
            path: PathBuf::from(format!("/staging/{id}.jpg")),
            message_id: id,
        }),
    }
}

/// The follow-up event a collaborator would produce for an effect
fn follow_up(effect: Effect, script: Script) -> Option<Event> {
    match effect {
        Effect::LoadSheetTitles { name } => Some(Event::SheetTitlesLoaded {
            name,
            titles: SHEETS.iter().map(ToString::to_string).collect(),
        }),
        Effect::CreateSheets { name, .. } if script.creation_succeeds => {
            Some(Event::SheetsCreated { name })
        }
        Effect::CreateSheets { name, .. } => Some(Event::SheetCreationFailed { name }),
        Effect::ListAccountingSheets => Some(Event::AccountingSheetsListed {
            sheets: SHEETS.iter().map(ToString::to_string).collect(),
        }),
        Effect::Finalize(request) if script.finalize_succeeds => Some(Event::FinalizeCompleted {
            uploaded: request.uploaded_links.len() + request.receipts.len(),
            paid_flag_failed: false,
        }),
        Effect::Finalize(request) => Some(Event::FinalizeFailed {
            uploaded_links: request.uploaded_links,
            partial_row: Some(2),
        }),
        Effect::Reply(_) | Effect::Push(_) | Effect::ReportDebts | Effect::DiscardStaged(_) => None,
    }
}

fn accounting_step(session: Option<&Session>) -> Option<AccountingStep> {
    session.and_then(Session::as_accounting).map(|acc| acc.step)
}

/// Fields collected so far must match the step the dialog is on
fn fields_match_step(acc: &AccountingSession) -> bool {
    let step = acc.step;
    acc.target_sheet.is_some() == (step > AccountingStep::SelectSheet)
        && acc.transaction_type.is_some() == (step > AccountingStep::ChooseType)
        && acc.item_name.is_some() == (step > AccountingStep::ItemName)
        && acc.quantity.is_some() == (step > AccountingStep::Quantity)
        && acc.unit_price.is_some() == (step > AccountingStep::UnitPrice)
}

/// Feed one sender event and every follow-up it triggers through the slot
fn run_turn(slot: &mut SessionSlot, input: Input, script: Script) -> Result<(), TestCaseError> {
    let mut queue = VecDeque::from([to_event(input)]);

    while let Some(event) = queue.pop_front() {
        let before = slot.active().cloned();
        let Ok(result) = transition(slot.active(), event) else {
            // Rejected input leaves the slot alone
            continue;
        };
        slot.apply(result.change);
        let after = slot.active();

        if let (Some(from), Some(to)) = (accounting_step(before.as_ref()), accounting_step(after)) {
            prop_assert!(to >= from, "Step went back from {:?} to {:?}", from, to);
            prop_assert!(
                to.number() - from.number() <= 1,
                "Step skipped from {:?} to {:?}",
                from,
                to
            );
        }
        if let Some(acc) = after.and_then(Session::as_accounting) {
            prop_assert!(fields_match_step(acc), "Fields out of step: {:?}", acc);
        }

        // A discarded file must not stay referenced by the session
        let kept = after
            .and_then(Session::as_accounting)
            .map_or(&[][..], |acc| acc.receipt_images.as_slice());
        for effect in &result.effects {
            if let Effect::DiscardStaged(images) = effect {
                prop_assert!(
                    images.iter().all(|i| !kept.contains(i)),
                    "Discarded {:?} while still staged",
                    images
                );
            }
        }

        queue.extend(result.effects.into_iter().filter_map(|e| follow_up(e, script)));
    }
    Ok(())
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Accounting never moves backwards or skips a step while its session lives
    #[test]
    fn prop_accounting_steps_are_monotonic(
        inputs in proptest::collection::vec(arb_input(), 0..40),
        script in arb_script(),
    ) {
        let mut slot = SessionSlot::default();
        for input in inputs {
            run_turn(&mut slot, input, script)?;
        }
    }

    // Cancel always leaves the sender without a dialog
    #[test]
    fn prop_cancel_always_clears(
        inputs in proptest::collection::vec(arb_input(), 0..30),
        script in arb_script(),
        cancel in prop_oneof![Just("cancel"), Just("Cancel"), Just("CANCEL")],
    ) {
        let mut slot = SessionSlot::default();
        for input in inputs {
            run_turn(&mut slot, input, script)?;
        }
        run_turn(&mut slot, Input::Text(cancel.to_string()), script)?;
        prop_assert!(slot.active().is_none(), "Session survived cancel: {:?}", slot.active());
    }

    // With an accounting dialog open, the start commands change nothing
    #[test]
    fn prop_start_is_noop_with_open_session(
        inputs in proptest::collection::vec(arb_input(), 0..30),
        script in arb_script(),
        command in prop_oneof![Just(CMD_SHEET), Just(CMD_START_ACCOUNTING)],
    ) {
        let mut slot = SessionSlot::default();
        run_turn(&mut slot, Input::Text(CMD_START_ACCOUNTING.to_string()), script)?;
        for input in inputs {
            run_turn(&mut slot, input, script)?;
        }

        if let Some(session @ Session::Accounting(_)) = slot.active() {
            let result = transition(Some(session), Event::text(command));
            prop_assert!(result.is_ok(), "Start command rejected: {:?}", result);
            let result = result.unwrap();
            prop_assert_eq!(result.change, SessionChange::Unchanged);
            prop_assert!(result.effects.is_empty());
        }
    }

    // A listing that lands after another dialog opened does not replace it
    #[test]
    fn prop_late_listing_keeps_open_dialog(
        inputs in proptest::collection::vec(arb_input(), 1..20),
        script in arb_script(),
    ) {
        let mut slot = SessionSlot::default();
        for input in inputs {
            run_turn(&mut slot, input, script)?;
        }
        let before = slot.active().cloned();
        if before.is_some() {
            let listed = Event::AccountingSheetsListed { sheets: vec!["Other individual".to_string()] };
            if let Ok(result) = transition(slot.active(), listed) {
                slot.apply(result.change);
            }
            prop_assert_eq!(slot.active(), before.as_ref());
        }
    }
}
