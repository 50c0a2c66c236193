use std::env;

use anyhow::{Context, Result};

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: parse_or("PORT", 5000),
            database_url: env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET not set")?,
            token_ttl_secs: parse_or("TOKEN_TTL_SECS", 3600),
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("invalid {key} value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_on_garbage() {
        std::env::set_var("TEST_PARSE_OR_PORT", "not-a-number");
        let port: u16 = parse_or("TEST_PARSE_OR_PORT", 5000);
        assert_eq!(port, 5000);
        std::env::remove_var("TEST_PARSE_OR_PORT");
    }
}
