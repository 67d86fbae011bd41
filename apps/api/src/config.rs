use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// `HUMANIZE_API_KEY` is deliberately not required at startup: the server
/// boots without it and the humanize endpoint rejects requests until it is
/// set. Numeric knobs fail startup when present but unparseable.
#[derive(Debug, Clone)]
pub struct Config {
    pub humanize_api_key: String,
    pub humanize_api_url: String,
    pub humanize_mode: String,
    pub humanize_email: String,
    pub humanize_max_concurrent: usize,
    pub humanize_timeout_secs: u64,
    pub humanize_retries: u32,
    pub event_log_path: String,
    pub port: u16,
    pub rust_log: String,
}

const DEFAULT_API_URL: &str = "https://aihumanize.io/api/v1/rewrite";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            humanize_api_key: std::env::var("HUMANIZE_API_KEY").unwrap_or_default(),
            humanize_api_url: std::env::var("HUMANIZE_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            humanize_mode: std::env::var("HUMANIZE_MODE")
                .unwrap_or_else(|_| "quality".to_string())
                .trim()
                .to_lowercase(),
            humanize_email: std::env::var("HUMANIZE_EMAIL").unwrap_or_default(),
            humanize_max_concurrent: parse_env("HUMANIZE_MAX_CONCURRENT", 5)?,
            humanize_timeout_secs: parse_env("HUMANIZE_TIMEOUT_SEC", 15)?,
            humanize_retries: parse_env("HUMANIZE_RETRIES", 2)?,
            event_log_path: std::env::var("EVENT_LOG_PATH")
                .unwrap_or_else(|_| "data/logs/events.jsonl".to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .ok()
            .with_context(|| format!("'{key}' must be a valid number")),
        Err(_) => Ok(default),
    }
}
