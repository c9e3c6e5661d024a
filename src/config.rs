// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const ENV_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const ENV_TEXT_CHANNEL_ID: &str = "TEXT_CHANNEL_ID";
pub const ENV_TIME_THRESHOLD: &str = "TIME_THRESHOLD";
pub const ENV_VOICE_CHANNEL_NAME: &str = "VOICE_CHANNEL_NAME";
pub const ENV_LOG_DIR: &str = "LOG_DIR";
pub const ENV_METRICS_ADDR: &str = "METRICS_ADDR";

pub const DEFAULT_TIME_THRESHOLD_SECS: i64 = 7_200; // 2h
pub const DEFAULT_VOICE_CHANNEL_NAME: &str = "Lounge";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// The values the relay core needs; no secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub voice_channel_name: String,
    pub text_channel_id: u64,
    pub time_threshold_secs: i64,
}

impl RelaySettings {
    pub fn new(voice_channel_name: impl Into<String>, text_channel_id: u64, secs: i64) -> Self {
        Self {
            voice_channel_name: voice_channel_name.into(),
            text_channel_id,
            time_threshold_secs: secs,
        }
    }
}

/// Full process configuration, read from the environment.
#[derive(Clone)]
pub struct RelayConfig {
    pub token: String,
    pub relay: RelaySettings,
    pub log_dir: PathBuf,
    pub metrics_addr: Option<SocketAddr>,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("token", &format_args!("<{} chars>", self.token.len()))
            .field("relay", &self.relay)
            .field("log_dir", &self.log_dir)
            .field("metrics_addr", &self.metrics_addr)
            .finish()
    }
}

impl RelayConfig {
    /// Read from the process environment (call `dotenvy::dotenv()` first).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RelayConfig::from_env`] but over an arbitrary key lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = get(ENV_TOKEN)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("{ENV_TOKEN} environment variable not set."))?;

        let raw_channel = get(ENV_TEXT_CHANNEL_ID)
            .ok_or_else(|| anyhow!("{ENV_TEXT_CHANNEL_ID} environment variable not set."))?;
        let text_channel_id: u64 = raw_channel
            .trim()
            .parse()
            .with_context(|| format!("{ENV_TEXT_CHANNEL_ID} must be an integer, got {raw_channel:?}"))?;
        if text_channel_id == 0 {
            bail!("{ENV_TEXT_CHANNEL_ID} must be a non-zero channel id");
        }

        let time_threshold_secs = match get(ENV_TIME_THRESHOLD) {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("{ENV_TIME_THRESHOLD} must be an integer, got {raw:?}"))?,
            None => DEFAULT_TIME_THRESHOLD_SECS,
        };
        if chrono::TimeDelta::try_seconds(time_threshold_secs).is_none() {
            bail!("{ENV_TIME_THRESHOLD} is out of range: {time_threshold_secs}s");
        }

        let voice_channel_name = get(ENV_VOICE_CHANNEL_NAME)
            .unwrap_or_else(|| DEFAULT_VOICE_CHANNEL_NAME.to_string());

        let log_dir = get(ENV_LOG_DIR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

        let metrics_addr = match get(ENV_METRICS_ADDR).filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<SocketAddr>()
                    .with_context(|| format!("{ENV_METRICS_ADDR} must be host:port, got {raw:?}"))?,
            ),
            None => None,
        };

        Ok(Self {
            token,
            relay: RelaySettings {
                voice_channel_name,
                text_channel_id,
                time_threshold_secs,
            },
            log_dir,
            metrics_addr,
        })
    }
}

/// Log directory straight from the environment, usable before the full
/// config is validated so config errors still reach the log file.
pub fn log_dir_from_env() -> PathBuf {
    std::env::var(ENV_LOG_DIR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
}
