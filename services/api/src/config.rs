//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Nothing is reloaded while the process runs.

use axum::http::HeaderValue;
use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the transactional mail HTTP API.
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

/// Credentials for the remote image store.
#[derive(Clone, Debug)]
pub struct ImageStoreConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub upload_preset: String,
    pub folder: String,
}

/// Settings for the third-party voice interview agent.
#[derive(Clone, Debug, Default)]
pub struct VoiceAgentConfig {
    pub assistant_id: Option<String>,
    pub webhook_secret: Option<String>,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// When absent the service keeps its records in process memory.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub api_base_url: String,
    /// Student portal linked from booking confirmations.
    pub student_app_url: String,
    pub cors_origins: Vec<HeaderValue>,
    pub admin_api_key: Option<String>,
    pub mail: Option<MailConfig>,
    pub image_store: Option<ImageStoreConfig>,
    pub openai_api_key: Option<String>,
    pub feedback_model: String,
    pub voice: VoiceAgentConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = var("DATABASE_URL");

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Public URLs ---
        let api_base_url = var("API_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let student_app_url = var("STUDENT_APP_URL")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| student_app_url.clone())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                origin.parse::<HeaderValue>().map_err(|e| {
                    ConfigError::InvalidValue("CORS_ORIGINS".to_string(), e.to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let admin_api_key = var("ADMIN_API_KEY");

        // --- Mail gateway (all or nothing) ---
        let mail = match (var("MAIL_API_KEY"), var("MAIL_FROM")) {
            (Some(api_key), Some(from)) => Some(MailConfig {
                api_url: var("MAIL_API_URL")
                    .unwrap_or_else(|| "https://api.resend.com/emails".to_string()),
                api_key,
                from,
            }),
            (Some(_), None) => return Err(ConfigError::MissingVar("MAIL_FROM".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingVar("MAIL_API_KEY".to_string())),
            (None, None) => None,
        };

        // --- Remote image store ---
        let image_store = match var("CLOUDINARY_CLOUD_NAME") {
            Some(cloud_name) => {
                let required = |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));
                Some(ImageStoreConfig {
                    cloud_name,
                    api_key: required("CLOUDINARY_API_KEY")?,
                    api_secret: required("CLOUDINARY_API_SECRET")?,
                    upload_preset: required("CLOUDINARY_UPLOAD_PRESET")?,
                    folder: var("CLOUDINARY_FOLDER").unwrap_or_else(|| "reviews".to_string()),
                })
            }
            None => None,
        };

        // --- Language model & voice agent (optional) ---
        let openai_api_key = var("OPENAI_API_KEY");
        let feedback_model = var("FEEDBACK_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());
        let voice = VoiceAgentConfig {
            assistant_id: var("VAPI_ASSISTANT_ID"),
            webhook_secret: var("VAPI_WEBHOOK_SECRET"),
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            api_base_url,
            student_app_url,
            cors_origins,
            admin_api_key,
            mail,
            image_store,
            openai_api_key,
            feedback_model,
            voice,
        })
    }

    /// The URL the voice agent must call when an interview ends.
    pub fn voice_webhook_url(&self) -> String {
        format!("{}/api/voice/vapi-webhook", self.api_base_url)
    }
}
