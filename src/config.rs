// config.rs
// Runtime configuration read from the environment (after dotenvy has loaded .env).

use std::{env, net::SocketAddr};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub bind_addr: SocketAddr,
    pub seed_file: String,
    pub log_json: bool,
    /// Logs every derived invoice price with its inputs.
    pub debug_pricing: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let bind = env_or("BIND_ADDR", "0.0.0.0:8080");
        let bind_addr = bind
            .parse::<SocketAddr>()
            .with_context(|| format!("BIND_ADDR is not a socket address: {bind}"))?;

        Ok(AppConfig {
            mongodb_uri: env_or("MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_db: env_or("MONGODB_DB", "spacehub"),
            bind_addr,
            seed_file: env_or("SEED_FILE", "./data/seed.json"),
            log_json: env_flag("LOG_JSON"),
            debug_pricing: env_flag("DEBUG_PRICING"),
        })
    }

    /// Default tracing filter when RUST_LOG is not set.
    pub fn default_log_filter(&self) -> String {
        let mut filter = "info,tower_http=info".to_string();
        if self.debug_pricing {
            filter.push_str(",spacehub::pricing=debug");
        }
        filter
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|v| parse_flag(&v)).unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        for v in ["1", "true", "YES", " on "] {
            assert!(parse_flag(v), "{v}");
        }
        for v in ["", "0", "false", "off", "nope"] {
            assert!(!parse_flag(v), "{v}");
        }
    }
}
