//! Configuration loading and representation.
//!
//! Everything comes from environment variables. [`AppConfig::from_lookup`]
//! takes any key lookup so tests never touch the process environment.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEV_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 7;
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;
pub const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("{key} must be set {reason}")]
    Missing {
        key: &'static str,
        reason: &'static str,
    },
}

/// Where repositories keep their state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    InMemory,
    Postgres { database_url: String },
}

/// Bootstrap administrator created on an empty identity store.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub persistence: Persistence,
    pub seed_admin: Option<SeedAdmin>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("persistence", &self.persistence.kind())
            .field("seed_admin", &self.seed_admin)
            .finish()
    }
}

impl Persistence {
    fn kind(&self) -> &'static str {
        match self {
            Persistence::InMemory => "in-memory",
            Persistence::Postgres { .. } => "postgres",
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let access_token_ttl = parse_ttl(
            "ACCESS_TOKEN_TTL_MINUTES",
            get("ACCESS_TOKEN_TTL_MINUTES"),
            DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
            MAX_ACCESS_TOKEN_TTL_MINUTES,
            Duration::try_minutes,
        )?;
        let refresh_token_ttl = parse_ttl(
            "REFRESH_TOKEN_TTL_DAYS",
            get("REFRESH_TOKEN_TTL_DAYS"),
            DEFAULT_REFRESH_TOKEN_TTL_DAYS,
            MAX_REFRESH_TOKEN_TTL_DAYS,
            Duration::try_days,
        )?;

        let persistent = match get("USE_PERSISTENT_STORES") {
            None => false,
            Some(v) => parse_flag("USE_PERSISTENT_STORES", &v)?,
        };
        let persistence = if persistent {
            let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing {
                key: "DATABASE_URL",
                reason: "when USE_PERSISTENT_STORES is enabled",
            })?;
            Persistence::Postgres { database_url }
        } else {
            Persistence::InMemory
        };

        let seed_admin = match (get("SEED_ADMIN_EMAIL"), get("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SeedAdmin { email, password }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Missing {
                    key: "SEED_ADMIN_PASSWORD",
                    reason: "together with SEED_ADMIN_EMAIL",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Missing {
                    key: "SEED_ADMIN_EMAIL",
                    reason: "together with SEED_ADMIN_PASSWORD",
                });
            }
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl,
            persistence,
            seed_admin,
        })
    }

    /// In-memory configuration for tests and local experiments.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.into(),
            access_token_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_TTL_MINUTES),
            refresh_token_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
            persistence: Persistence::InMemory,
            seed_admin: None,
        }
    }
}

/// Parse a lifetime in `1..=max` units and convert it with `to_duration`.
fn parse_ttl(
    key: &'static str,
    raw: Option<String>,
    default: i64,
    max: i64,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    let n = match raw {
        None => default,
        Some(raw) => raw.parse::<i64>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })?,
    };
    if !(1..=max).contains(&n) {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("must be between 1 and {max}"),
        });
    }
    to_duration(n).ok_or(ConfigError::Invalid {
        key,
        reason: "out of range".to_string(),
    })
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.access_token_ttl, Duration::minutes(60));
        assert_eq!(config.refresh_token_ttl, Duration::days(7));
        assert_eq!(config.persistence, Persistence::InMemory);
        assert!(config.seed_admin.is_none());
    }

    #[test]
    fn persistent_stores_need_a_database_url() {
        let err = load(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                key: "DATABASE_URL",
                reason: "when USE_PERSISTENT_STORES is enabled",
            }
        );

        let config = load(&[
            ("USE_PERSISTENT_STORES", "1"),
            ("DATABASE_URL", "postgres://localhost/shiptrack"),
        ])
        .unwrap();
        assert_eq!(
            config.persistence,
            Persistence::Postgres {
                database_url: "postgres://localhost/shiptrack".to_string()
            }
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            load(&[("ACCESS_TOKEN_TTL_MINUTES", "0")]),
            Err(ConfigError::Invalid { key: "ACCESS_TOKEN_TTL_MINUTES", .. })
        ));
        assert!(matches!(
            load(&[("BIND_ADDR", "not-an-addr")]),
            Err(ConfigError::Invalid { key: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            load(&[("USE_PERSISTENT_STORES", "maybe")]),
            Err(ConfigError::Invalid { key: "USE_PERSISTENT_STORES", .. })
        ));
    }

    #[test]
    fn oversized_token_lifetimes_are_rejected_not_panicking() {
        for (key, value) in [
            ("REFRESH_TOKEN_TTL_DAYS", "9223372036854775807"),
            ("REFRESH_TOKEN_TTL_DAYS", "100000000"),
            ("REFRESH_TOKEN_TTL_DAYS", "366"),
            ("ACCESS_TOKEN_TTL_MINUTES", "9223372036854775807"),
            ("ACCESS_TOKEN_TTL_MINUTES", "10081"),
            ("ACCESS_TOKEN_TTL_MINUTES", "-5"),
        ] {
            let err = load(&[(key, value)]).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid { key: k, .. } if *k == key),
                "{key}={value} gave {err:?}"
            );
        }

        let config = load(&[
            ("ACCESS_TOKEN_TTL_MINUTES", "10080"),
            ("REFRESH_TOKEN_TTL_DAYS", "365"),
        ])
        .unwrap();
        assert_eq!(config.access_token_ttl, Duration::weeks(1));
        assert_eq!(config.refresh_token_ttl, Duration::days(365));
    }

    #[test]
    fn seed_admin_needs_both_halves() {
        let err = load(&[("SEED_ADMIN_EMAIL", "admin@example.com")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "SEED_ADMIN_PASSWORD must be set together with SEED_ADMIN_EMAIL"
        );
        let config = load(&[
            ("SEED_ADMIN_EMAIL", "admin@example.com"),
            ("SEED_ADMIN_PASSWORD", "changeme123"),
        ])
        .unwrap();
        let seed = config.seed_admin.unwrap();
        assert_eq!(seed.email, "admin@example.com");
        assert!(!format!("{seed:?}").contains("changeme123"));
    }
}
