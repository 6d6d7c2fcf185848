//! Ledger bot - chat-driven bookkeeping on a shared spreadsheet
//!
//! Receives chat platform webhooks, walks authorized senders through the
//! sheet-creation and accounting dialogs, and records the results in the
//! ledger spreadsheet with receipts kept in cloud storage.

mod api;
mod auth;
mod clients;
mod config;
mod db;
mod ledger;
mod runtime;
mod workflow;

use api::{create_router, AppState};
use auth::AuthGate;
use clients::{DriveStorage, GoogleAuth, LineGateway, SheetsLedger};
use config::BotConfig;
use db::Database;
use runtime::{Collaborators, Dispatcher};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger_bot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    if let Some(legacy) = &config.legacy_users_file {
        let imported = db.import_legacy_allow_list(legacy)?;
        tracing::info!(path = %legacy.display(), imported, "Imported legacy allow-list");
    }

    let gate = AuthGate::load(config.secret_key.clone(), db)?;
    tracing::info!(senders = gate.authorized_count(), "Loaded allow-list");

    // Collaborators
    let google = Arc::new(GoogleAuth::new(config.google_token.clone()));
    let collaborators = Collaborators {
        ledger: Arc::new(SheetsLedger::new(config.spreadsheet_id.clone(), google.clone())?),
        storage: Arc::new(DriveStorage::new(google)?),
        gateway: Arc::new(LineGateway::new(config.channel_token.clone())?),
    };

    let dispatcher = Arc::new(Dispatcher::new(
        gate,
        collaborators,
        config.delivery,
        config.staging_dir.clone(),
        config.root_folder_id.clone(),
    ));
    let app = create_router(AppState::new(dispatcher));

    tracing::info!(addr = %config.listen_addr, "Ledger bot listening");
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
