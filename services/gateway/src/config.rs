use std::net::SocketAddr;
use std::time::Duration;
use switchboard_bridge::BridgeConfig;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub elevenlabs_agent_id: String,
    /// Optional: public ElevenLabs agents accept unauthenticated sessions.
    pub elevenlabs_api_key: Option<String>,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub log_level: Level,
    /// Unset keeps the playback queue unbounded; set, the oldest queued
    /// frame is dropped when the agent outruns the caller's connection.
    pub playback_queue_capacity: Option<usize>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let elevenlabs_agent_id = std::env::var("ELEVENLABS_AGENT_ID")
            .map_err(|_| ConfigError::MissingVar("ELEVENLABS_AGENT_ID".to_string()))?;
        let elevenlabs_api_key = std::env::var("ELEVENLABS_API_KEY").ok();

        let twilio_account_sid = std::env::var("TWILIO_ACCOUNT_SID")
            .map_err(|_| ConfigError::MissingVar("TWILIO_ACCOUNT_SID".to_string()))?;
        let twilio_auth_token = std::env::var("TWILIO_AUTH_TOKEN")
            .map_err(|_| ConfigError::MissingVar("TWILIO_AUTH_TOKEN".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let playback_queue_capacity = match std::env::var("PLAYBACK_QUEUE_CAPACITY") {
            Ok(raw) => Some(raw.parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("PLAYBACK_QUEUE_CAPACITY".to_string(), e.to_string())
            })?),
            Err(_) => None,
        };

        Ok(Self {
            bind_address,
            elevenlabs_agent_id,
            elevenlabs_api_key,
            twilio_account_sid,
            twilio_auth_token,
            log_level,
            playback_queue_capacity,
        })
    }

    /// The per-call bridge tuning derived from this configuration.
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            queue_capacity: self.playback_queue_capacity,
            stop_timeout: Duration::from_secs(5),
        }
    }
}
