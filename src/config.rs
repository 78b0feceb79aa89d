use std::net::SocketAddr;
use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const GEMINI_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing the environment variable {0}")]
    MissingVar(String),
    #[error("invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// All configuration, loaded once from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub storage_root: PathBuf,

    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub max_output_tokens: u32,
    pub temperature: f32,

    pub jwt_secret: String,
    pub token_expiry_minutes: i64,

    pub allowed_origins: Vec<String>,

    pub rate_limit_general: u32,
    pub rate_limit_upload: u32,
    pub rate_limit_processing: u32,
}

impl Config {
    /// Loads configuration from environment variables. A `.env` file is
    /// honored for local development but skipped under test so tests stay
    /// hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let storage_root = std::env::var("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./storage"));

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;
        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-pro".to_string());
        let gemini_base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| GEMINI_DEFAULT_BASE_URL.to_string());

        let max_output_tokens = parse_var("GEMINI_MAX_OUTPUT_TOKENS", 4000)?;
        let temperature = parse_var("GEMINI_TEMPERATURE", 0.3f32)?;

        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;
        let token_expiry_minutes = parse_var("TOKEN_EXPIRY_MINUTES", 30i64)?;

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let rate_limit_general = parse_var("RATE_LIMIT_GENERAL", 100u32)?;
        let rate_limit_upload = parse_var("RATE_LIMIT_UPLOAD", 10u32)?;
        let rate_limit_processing = parse_var("RATE_LIMIT_PROCESSING", 20u32)?;

        Ok(Self {
            bind_address,
            database_url,
            storage_root,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            max_output_tokens,
            temperature,
            jwt_secret,
            token_expiry_minutes,
            allowed_origins,
            rate_limit_general,
            rate_limit_upload,
            rate_limit_processing,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
