//! Startup configuration from the environment

use crate::clients::TokenSource;
use crate::runtime::RetryPolicy;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 5050;
const DEFAULT_TOKEN_COMMAND: &str = "gcloud auth print-access-token";
const DEFAULT_DELIVERY_ATTEMPTS: u32 = 3;
const DEFAULT_DELIVERY_BACKOFF_MS: u64 = 2000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub listen_addr: SocketAddr,
    pub db_path: PathBuf,
    pub staging_dir: PathBuf,
    pub secret_key: String,
    /// JSON array of sender ids merged into the allow-list at startup
    pub legacy_users_file: Option<PathBuf>,
    pub channel_token: String,
    pub spreadsheet_id: String,
    pub root_folder_id: String,
    pub google_token: TokenSource,
    pub delivery: RetryPolicy,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
        let data_dir = PathBuf::from(home).join(".ledger-bot");

        let host: IpAddr = parse_or(get("LEDGER_BOT_HOST"), "LEDGER_BOT_HOST", Ipv4Addr::LOCALHOST.into())?;
        let port: u16 = parse_or(get("LEDGER_BOT_PORT"), "LEDGER_BOT_PORT", DEFAULT_PORT)?;

        let google_token = match get("GOOGLE_ACCESS_TOKEN") {
            Some(token) => TokenSource::Static(token),
            None => {
                let line = get("GOOGLE_TOKEN_COMMAND").unwrap_or_else(|| DEFAULT_TOKEN_COMMAND.to_string());
                TokenSource::command(&line).ok_or(ConfigError::Invalid {
                    name: "GOOGLE_TOKEN_COMMAND",
                    value: line,
                })?
            }
        };

        let max_attempts: u32 = parse_or(
            get("LEDGER_BOT_DELIVERY_ATTEMPTS"),
            "LEDGER_BOT_DELIVERY_ATTEMPTS",
            DEFAULT_DELIVERY_ATTEMPTS,
        )?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "LEDGER_BOT_DELIVERY_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let backoff_ms: u64 = parse_or(
            get("LEDGER_BOT_DELIVERY_BACKOFF_MS"),
            "LEDGER_BOT_DELIVERY_BACKOFF_MS",
            DEFAULT_DELIVERY_BACKOFF_MS,
        )?;

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            db_path: get("LEDGER_BOT_DB_PATH")
                .map_or_else(|| data_dir.join("ledger-bot.db"), PathBuf::from),
            staging_dir: get("LEDGER_BOT_STAGING_DIR")
                .map_or_else(|| data_dir.join("staging"), PathBuf::from),
            secret_key: required("LEDGER_BOT_SECRET_KEY")?,
            legacy_users_file: get("LEDGER_BOT_LEGACY_USERS_FILE").map(PathBuf::from),
            channel_token: required("LINE_CHANNEL_TOKEN")?,
            spreadsheet_id: required("LEDGER_SPREADSHEET_ID")?,
            root_folder_id: required("RECEIPT_ROOT_FOLDER_ID")?,
            google_token,
            delivery: RetryPolicy {
                max_attempts,
                backoff: Duration::from_millis(backoff_ms),
            },
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
