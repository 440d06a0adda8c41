use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionConfig {
    /// Calls admitted per window.
    pub max_calls: usize,
    pub window_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub openai: OpenAiConfig,
    pub suggestions: SuggestionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "mealplanner".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "mealplanner-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let session = SessionConfig {
            cookie_name: std::env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "session".into()),
            secure: env_or("SESSION_COOKIE_SECURE", false),
        };
        let openai = OpenAiConfig {
            api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            temperature: env_or("OPENAI_TEMPERATURE", 0.7),
        };
        let suggestions = SuggestionConfig {
            max_calls: env_or("SUGGESTION_RATE_LIMIT", 3),
            window_secs: env_or("SUGGESTION_RATE_WINDOW_SECS", 60),
            timeout_secs: env_or("SUGGESTION_TIMEOUT_SECS", 60),
        };
        Ok(Self {
            database_url,
            jwt,
            session,
            openai,
            suggestions,
        })
    }
}

/// Parses an optional variable, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
