//! Engine configuration, per `SPEC_FULL.md` §4.11.
//!
//! Grounded on `LeakIX-protonmail-client::src::config::ImapConfig::from_env`
//! (`examples/LeakIX-protonmail-client/src/config.rs`): `dotenvy::dotenv().ok()`
//! then required/optional environment variables, mapped to a typed config error on
//! failure rather than panicking. The library crate itself never reads the
//! environment outside this one constructor — every other `trove`/`trove-*` type
//! is built from plain arguments.

use trove_compose::UserAgent;

#[derive(Debug, Clone)]
pub struct TlsPolicy {
    /// Connect directly over TLS (IMAPS, port 993) rather than `STARTTLS`.
    pub implicit_tls: bool,
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self { implicit_tls: true }
    }
}

/// Everything needed to open one account's connection(s). The `User-Agent` the
/// composer stamps on outgoing messages lives here too, per `spec.md` §9: "global
/// mutable state (process-wide application metadata for the `User-Agent` header)
/// is a configuration struct injected at engine construction."
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub tls: TlsPolicy,
    pub user_agent: UserAgent,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

impl EngineConfig {
    /// Loads configuration from environment variables (reading a `.env` file
    /// first, if present). Required: `TROVE_USERNAME`, `TROVE_PASSWORD`. Optional,
    /// with defaults: `TROVE_HOST` (`"127.0.0.1"`), `TROVE_PORT` (`993`),
    /// `TROVE_IMPLICIT_TLS` (`"true"`). Only called from `trove-cli`'s `main`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let host = std::env::var("TROVE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("TROVE_PORT")
            .unwrap_or_else(|_| "993".to_string())
            .parse()
            .map_err(|e| ConfigError::Invalid("TROVE_PORT", format!("{e}")))?;
        let implicit_tls = std::env::var("TROVE_IMPLICIT_TLS")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        let username = std::env::var("TROVE_USERNAME").map_err(|_| ConfigError::Missing("TROVE_USERNAME"))?;
        let password = std::env::var("TROVE_PASSWORD").map_err(|_| ConfigError::Missing("TROVE_PASSWORD"))?;

        Ok(Self {
            host,
            port,
            username,
            password,
            tls: TlsPolicy { implicit_tls },
            user_agent: UserAgent {
                name: "trove".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                platform: std::env::consts::OS.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_is_reported_not_panicked() {
        // Belt-and-braces: ensure these are unset for this process regardless of
        // test execution order (`cargo test` runs in one process).
        std::env::remove_var("TROVE_USERNAME");
        std::env::remove_var("TROVE_PASSWORD");
        std::env::remove_var("DOTENV_PATH");
        match EngineConfig::from_env() {
            Err(ConfigError::Missing(_)) => {}
            other => panic!("expected Missing, got {other:?}"),
        }
    }
}
