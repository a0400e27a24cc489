use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Only the API key is hard-required; everything else has a default matching
/// the historical deployment.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub jwt_secret: String,
    pub auth_username: String,
    pub auth_password: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "prompt-executor-jwt-secret-key-2025".to_string()),
            auth_username: std::env::var("AUTH_USERNAME").unwrap_or_else(|_| "dasein".to_string()),
            auth_password: std::env::var("AUTH_PASSWORD")
                .unwrap_or_else(|_| "Donatella2025!@".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
