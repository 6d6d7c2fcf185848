//! Handling-turn executor
//!
//! Runs one inbound event through the pure transition function, applies the
//! session change and executes the resulting effects. Effects that perform
//! I/O feed their outcome back in as follow-up events until the turn settles.

use super::debts::aggregate_debts;
use super::delivery::Outgoing;
use super::finalizer::Finalizer;
use super::session_store::SessionSlot;
use super::sheet_recipes::create_sheets;
use super::traits::{ChatGateway, Ledger, ReceiptStorage};
use crate::ledger::accounting_sheet_titles;
use crate::workflow::{replies, transition, Effect, Event};
use std::sync::Arc;

/// External services the bot talks to
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn Ledger>,
    pub storage: Arc<dyn ReceiptStorage>,
    pub gateway: Arc<dyn ChatGateway>,
}

/// Messages produced by one handling turn
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TurnOutput {
    pub replies: Vec<String>,
    pub pushes: Vec<String>,
}

impl TurnOutput {
    /// Replies share the event's single-use reply token, so they go out as
    /// one message. Without a token they fall back to pushes.
    pub fn into_outgoing(self, reply_token: Option<&str>, sender: &str) -> Vec<Outgoing> {
        let mut outgoing = Vec::new();
        if !self.replies.is_empty() {
            let text = self.replies.join("\n");
            outgoing.push(match reply_token {
                Some(token) => Outgoing::Reply {
                    reply_token: token.to_string(),
                    text,
                },
                None => Outgoing::Push {
                    to: sender.to_string(),
                    text,
                },
            });
        }
        outgoing.extend(self.pushes.into_iter().map(|text| Outgoing::Push {
            to: sender.to_string(),
            text,
        }));
        outgoing
    }
}

pub struct TurnExecutor<'a> {
    collaborators: &'a Collaborators,
    root_folder_id: &'a str,
}

impl<'a> TurnExecutor<'a> {
    pub fn new(collaborators: &'a Collaborators, root_folder_id: &'a str) -> Self {
        Self {
            collaborators,
            root_folder_id,
        }
    }

    /// Process an event and every follow-up event its effects generate.
    /// The caller holds the sender's slot for the whole turn.
    pub async fn run(&self, slot: &mut SessionSlot, sender: &str, event: Event) -> TurnOutput {
        let mut output = TurnOutput::default();
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let event_name = current_event.name();
            let result = match transition(slot.active(), current_event) {
                Ok(r) => r,
                Err(e) => {
                    match e.user_message() {
                        Some(message) => output.replies.push(message),
                        None => tracing::warn!(sender, event = event_name, error = %e, "Dropped event"),
                    }
                    continue;
                }
            };

            slot.apply(result.change);

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(sender, effect, &mut output).await
                {
                    events_to_process.push(generated_event);
                }
            }
        }

        output
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(
        &self,
        sender: &str,
        effect: Effect,
        output: &mut TurnOutput,
    ) -> Option<Event> {
        let ledger = self.collaborators.ledger.as_ref();
        match effect {
            Effect::Reply(text) => {
                output.replies.push(text);
                None
            }

            Effect::Push(text) => {
                output.pushes.push(text);
                None
            }

            Effect::LoadSheetTitles { name } => match ledger.list_sheets().await {
                Ok(sheets) => Some(Event::SheetTitlesLoaded {
                    name,
                    titles: sheets.into_iter().map(|s| s.title).collect(),
                }),
                Err(e) => {
                    tracing::error!(sender, error = %e, "Failed to load sheet titles");
                    Some(Event::SheetCreationFailed { name })
                }
            },

            Effect::CreateSheets { category, name } => {
                match create_sheets(ledger, category, &name).await {
                    Ok(()) => {
                        tracing::info!(sender, sheet = %name, category = category.label(), "Created sheet set");
                        Some(Event::SheetsCreated { name })
                    }
                    Err(e) => {
                        tracing::error!(sender, sheet = %name, error = %e, "Sheet creation failed");
                        Some(Event::SheetCreationFailed { name })
                    }
                }
            }

            Effect::ListAccountingSheets => match ledger.list_sheets().await {
                Ok(sheets) => {
                    let titles: Vec<String> = sheets.into_iter().map(|s| s.title).collect();
                    Some(Event::AccountingSheetsListed {
                        sheets: accounting_sheet_titles(&titles),
                    })
                }
                Err(e) => {
                    tracing::error!(sender, error = %e, "Failed to list accounting sheets");
                    Some(Event::SheetListingFailed)
                }
            },

            Effect::ReportDebts => {
                let text = match aggregate_debts(ledger).await {
                    Ok(report) => report.render(),
                    Err(e) => {
                        tracing::error!(sender, error = %e, "Failed to aggregate debts");
                        replies::DEBT_READ_FAILED.to_string()
                    }
                };
                output.replies.push(text);
                None
            }

            Effect::DiscardStaged(images) => {
                for image in images {
                    if let Err(e) = tokio::fs::remove_file(&image.path).await {
                        tracing::warn!(
                            sender,
                            path = %image.path.display(),
                            error = %e,
                            "Failed to remove staged image"
                        );
                    }
                }
                None
            }

            Effect::Finalize(request) => {
                let finalizer = Finalizer::new(
                    ledger,
                    self.collaborators.storage.as_ref(),
                    self.root_folder_id,
                );
                match finalizer.finalize(&request).await {
                    Ok(report) => Some(Event::FinalizeCompleted {
                        uploaded: report.uploaded,
                        paid_flag_failed: report.paid_flag_failed,
                    }),
                    Err(failure) => {
                        tracing::error!(
                            sender,
                            sheet = %request.entry.target_sheet,
                            uploaded = failure.uploaded_links.len(),
                            partial_row = ?failure.partial_row,
                            error = %failure,
                            "Finalize failed, session kept"
                        );
                        Some(Event::FinalizeFailed {
                            uploaded_links: failure.uploaded_links,
                            partial_row: failure.partial_row,
                        })
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{CellValue, EVENT_DEBT_TEMPLATE, INDIVIDUAL_TEMPLATE};
    use crate::runtime::testing::{MockGateway, MockLedger, MockStorage};
    use crate::workflow::{AccountingStep, Session, StagedImage};

    struct Harness {
        ledger: Arc<MockLedger>,
        storage: Arc<MockStorage>,
        collaborators: Collaborators,
    }

    impl Harness {
        fn new() -> Self {
            let ledger = Arc::new(MockLedger::new());
            let storage = Arc::new(MockStorage::new());
            let collaborators = Collaborators {
                ledger: ledger.clone(),
                storage: storage.clone(),
                gateway: Arc::new(MockGateway::new()),
            };
            Self {
                ledger,
                storage,
                collaborators,
            }
        }

        async fn send(&self, slot: &mut SessionSlot, text: &str) -> TurnOutput {
            TurnExecutor::new(&self.collaborators, "root")
                .run(slot, "U1", Event::text(text))
                .await
        }
    }

    #[tokio::test]
    async fn test_name_collision_reprompts_without_writes() {
        let h = Harness::new();
        h.ledger.add_sheet(INDIVIDUAL_TEMPLATE);
        h.ledger.add_sheet(EVENT_DEBT_TEMPLATE);
        h.ledger.add_sheet("Gala individual");
        let mut slot = SessionSlot::default();

        h.send(&mut slot, "sheet").await;
        h.send(&mut slot, "Event").await;
        let out = h.send(&mut slot, "Gala").await;

        assert_eq!(out.replies, vec![replies::name_taken("Gala")]);
        assert_eq!(h.ledger.titles().len(), 3);
        assert!(h.ledger.writes().is_empty());
        assert!(matches!(slot.active(), Some(Session::SheetCreation(_))));
    }

    #[tokio::test]
    async fn test_event_sheet_creation_completes_dialog() {
        let h = Harness::new();
        h.ledger.add_sheet(INDIVIDUAL_TEMPLATE);
        h.ledger.add_sheet(EVENT_DEBT_TEMPLATE);
        let mut slot = SessionSlot::default();

        h.send(&mut slot, "sheet").await;
        h.send(&mut slot, "Event").await;
        let out = h.send(&mut slot, "Gala").await;

        assert_eq!(out.replies, vec![replies::sheets_created("Gala")]);
        assert!(slot.active().is_none());
        let individual = h.ledger.sheet("Gala individual").await.unwrap();
        assert_eq!(
            h.ledger.get(&individual, 23, 4),
            Some(CellValue::Formula("='debt(Gala)'!I6".to_string()))
        );
    }

    #[tokio::test]
    async fn test_failed_creation_keeps_naming_step() {
        let h = Harness::new();
        let mut slot = SessionSlot::default();

        h.send(&mut slot, "sheet").await;
        h.send(&mut slot, "Live").await;
        let out = h.send(&mut slot, "Tour").await;

        assert_eq!(out.replies, vec![replies::sheet_creation_failed("Tour")]);
        assert!(matches!(slot.active(), Some(Session::SheetCreation(_))));
    }

    #[tokio::test]
    async fn test_start_accounting_lists_individual_sheets() {
        let h = Harness::new();
        h.ledger.add_sheet(INDIVIDUAL_TEMPLATE);
        h.ledger.add_sheet("Gala individual");
        h.ledger.add_sheet("debt(Gala)");
        let mut slot = SessionSlot::default();

        let out = h.send(&mut slot, "start accounting").await;
        assert_eq!(
            out.replies,
            vec![replies::choose_sheet(&["Gala individual".to_string()])]
        );
        let acc = slot.active().and_then(Session::as_accounting).unwrap();
        assert_eq!(acc.step, AccountingStep::SelectSheet);
    }

    #[tokio::test]
    async fn test_listing_failure_opens_no_session() {
        let h = Harness::new();
        h.ledger.fail_reads(true);
        let mut slot = SessionSlot::default();

        let out = h.send(&mut slot, "start accounting").await;
        assert_eq!(out.replies, vec![replies::SHEET_LIST_FAILED.to_string()]);
        assert!(slot.active().is_none());
    }

    #[tokio::test]
    async fn test_debt_report_reply() {
        let h = Harness::new();
        let debt = h.ledger.add_sheet("debt(Gala)");
        h.ledger.set(&debt, 1, 5, CellValue::Text("Alice".into()));
        h.ledger.set(&debt, 5, 5, CellValue::Text("500".into()));
        let mut slot = SessionSlot::default();

        let out = h.send(&mut slot, "debt").await;
        assert_eq!(
            out.replies,
            vec![format!("{}\nAlice: 500", replies::DEBT_REPORT_HEADER)]
        );
    }

    #[tokio::test]
    async fn test_finalize_failure_then_retry_does_not_reupload() {
        let dir = tempfile::tempdir().unwrap();
        let h = Harness::new();
        let sheet = h.ledger.add_sheet("Gala individual");
        let mut slot = SessionSlot::default();

        h.send(&mut slot, "start accounting").await;
        for text in ["Gala individual", "Expense", "Snacks", "10", "150"] {
            h.send(&mut slot, text).await;
        }
        let path = dir.path().join("m1.jpg");
        std::fs::write(&path, b"jpeg").unwrap();
        TurnExecutor::new(&h.collaborators, "root")
            .run(
                &mut slot,
                "U1",
                Event::Image(StagedImage {
                    message_id: "m1".to_string(),
                    path: path.clone(),
                }),
            )
            .await;
        h.send(&mut slot, "done").await;

        h.ledger.fail_writes(true);
        let out = h.send(&mut slot, "no").await;
        assert_eq!(out.pushes, vec![replies::SAVE_FAILED.to_string()]);
        let acc = slot.active().and_then(Session::as_accounting).unwrap();
        assert_eq!(acc.step, AccountingStep::Finalizing);
        assert_eq!(acc.uploaded_links.len(), 1);
        assert!(!path.exists());

        h.ledger.fail_writes(false);
        let out = h.send(&mut slot, "no").await;
        assert_eq!(out.pushes, vec![replies::accounting_completed(1, false)]);
        assert!(slot.active().is_none());
        assert_eq!(h.storage.uploads().len(), 1);
        assert_eq!(
            h.ledger.get(&sheet, 1, 1),
            Some(CellValue::Text("Snacks".to_string()))
        );
    }

    #[tokio::test]
    async fn test_retry_after_partial_write_fills_same_row() {
        let h = Harness::new();
        let sheet = h.ledger.add_sheet("Gala individual");
        h.ledger.set(&sheet, 1, 1, CellValue::Text("Item".into()));
        let mut slot = SessionSlot::default();

        h.send(&mut slot, "start accounting").await;
        for text in ["Gala individual", "Expense", "Snacks", "10", "150", "done"] {
            h.send(&mut slot, text).await;
        }

        h.ledger.fail_write_at(2);
        let out = h.send(&mut slot, "yes").await;
        assert_eq!(out.pushes, vec![replies::SAVE_FAILED.to_string()]);
        let acc = slot.active().and_then(Session::as_accounting).unwrap();
        assert_eq!(acc.partial_row, Some(2));

        let out = h.send(&mut slot, "yes").await;
        assert_eq!(out.pushes, vec![replies::accounting_completed(0, false)]);
        assert!(slot.active().is_none());

        let text = |value: &str| Some(CellValue::Text(value.to_string()));
        assert_eq!(h.ledger.get(&sheet, 1, 2), text("Snacks"));
        assert_eq!(h.ledger.get(&sheet, 2, 2), text("10"));
        assert_eq!(h.ledger.get(&sheet, 3, 2), text("150"));
        assert_eq!(h.ledger.get(&sheet, 11, 2), Some(CellValue::Bool(true)));
        assert_eq!(h.ledger.get(&sheet, 1, 3), None);
    }

    #[tokio::test]
    async fn test_cancel_removes_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        let h = Harness::new();
        h.ledger.add_sheet("Gala individual");
        let mut slot = SessionSlot::default();

        h.send(&mut slot, "start accounting").await;
        let path = dir.path().join("m1.jpg");
        std::fs::write(&path, b"jpeg").unwrap();
        TurnExecutor::new(&h.collaborators, "root")
            .run(
                &mut slot,
                "U1",
                Event::Image(StagedImage {
                    message_id: "m1".to_string(),
                    path: path.clone(),
                }),
            )
            .await;
        assert!(path.exists());

        h.send(&mut slot, "cancel").await;
        assert!(slot.active().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_replies_share_one_token() {
        let output = TurnOutput {
            replies: vec!["a".to_string(), "b".to_string()],
            pushes: vec!["c".to_string()],
        };
        assert_eq!(
            output.into_outgoing(Some("tok"), "U1"),
            vec![
                Outgoing::Reply {
                    reply_token: "tok".to_string(),
                    text: "a\nb".to_string()
                },
                Outgoing::Push {
                    to: "U1".to_string(),
                    text: "c".to_string()
                },
            ]
        );
    }
}
