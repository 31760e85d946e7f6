// src/config.rs
//! Process configuration loaded from the environment.
//!
//! Settings are read once at startup and passed by reference into the
//! services; there is no ambient global state. Loading never panics:
//! missing values become `None` or defaults, and the JWT flag is coerced
//! leniently so a placeholder like `true|false` in a copied `.env` does
//! not take the process down.

use std::env;

/// Default WebApp location used when `WEBAPP_BASE_URL` is not set.
const DEFAULT_WEBAPP_BASE_URL: &str = "http://127.0.0.1:8000/webapp";

/// Environment-backed process settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Telegram bot token; doubles as the issuer secret for credential
    /// verification. `None` until configured, which turns `/auth/init`
    /// into a 500.
    pub bot_token: Option<String>,
    /// Public URL of the WebApp the bot links to.
    pub webapp_base_url: String,
    /// Whether `/auth/init` should also issue a session token.
    pub use_jwt: bool,
    /// Secret for signing session tokens; required when `use_jwt` is set.
    pub jwt_secret: Option<String>,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self {
            bot_token: non_empty_var("BOT_TOKEN"),
            webapp_base_url: non_empty_var("WEBAPP_BASE_URL")
                .unwrap_or_else(|| DEFAULT_WEBAPP_BASE_URL.to_string()),
            use_jwt: coerce_bool(env::var("USE_JWT").ok().as_deref()),
            jwt_secret: non_empty_var("JWT_SECRET"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Coerces common truthy/falsy spellings to a bool.
///
/// Accepts `1`/`true`/`yes`/`on` as true and everything else, including
/// unset, empty and unrecognized placeholders, as false.
fn coerce_bool(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
    }
}
