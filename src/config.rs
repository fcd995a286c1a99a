// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`AppConfig`] loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8443` |
//! | `TLS_CERT_PATH` | PEM certificate chain | Required unless built with `dev` |
//! | `TLS_KEY_PATH` | PEM private key | Required unless built with `dev` |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated origin allow-list | empty (no cross-origin access) |
//! | `IDENTITY_RESOLVER_URL` | Identity lookup endpoint | Required |
//! | `SUBMISSION_GATEWAY_URL` | Survey form submission endpoint | Required |
//! | `SUBMISSION_GATEWAY_TOKEN` | Bearer token for the submission endpoint | Required |
//! | `GATEWAY_TIMEOUT_SECS` | Timeout for outbound gateway calls | `15` |
//! | `SESSION_TTL_SECS` | Lifetime of every session-scoped value | `3600` |
//! | `SESSION_CACHE_CAPACITY` | Maximum number of cached session values | `10000` |
//! | `ATTEMPT_CACHE_CAPACITY` | Maximum number of tracked identity-lookup attempts | `10000` |
//! | `CACHE_SWEEP_INTERVAL_SECS` | Interval between expired-entry sweeps | `60` |
//! | `IDENTITY_MAX_TRIES` | Identity lookups allowed before restart | `3` |
//! | `SUBMISSION_UTC_OFFSET_MINUTES` | Reporting timezone offset for submissions | `-300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=info` |

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use chrono::FixedOffset;
use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const IDENTITY_RESOLVER_URL_ENV: &str = "IDENTITY_RESOLVER_URL";
pub const SUBMISSION_GATEWAY_URL_ENV: &str = "SUBMISSION_GATEWAY_URL";
pub const SUBMISSION_GATEWAY_TOKEN_ENV: &str = "SUBMISSION_GATEWAY_TOKEN";
pub const GATEWAY_TIMEOUT_SECS_ENV: &str = "GATEWAY_TIMEOUT_SECS";
pub const SESSION_TTL_SECS_ENV: &str = "SESSION_TTL_SECS";
pub const SESSION_CACHE_CAPACITY_ENV: &str = "SESSION_CACHE_CAPACITY";
pub const ATTEMPT_CACHE_CAPACITY_ENV: &str = "ATTEMPT_CACHE_CAPACITY";
pub const CACHE_SWEEP_INTERVAL_SECS_ENV: &str = "CACHE_SWEEP_INTERVAL_SECS";
pub const IDENTITY_MAX_TRIES_ENV: &str = "IDENTITY_MAX_TRIES";
pub const SUBMISSION_UTC_OFFSET_MINUTES_ENV: &str = "SUBMISSION_UTC_OFFSET_MINUTES";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8443;

/// Bound on every outbound gateway call.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);

/// Base lifetime of every session-scoped value (1 hour).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Default bound on the number of cached values.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Identity lookups a caller gets before being sent back to the start.
pub const DEFAULT_MAX_TRIES: u32 = 3;

/// US Eastern standard time.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// TLS material locations. Both files are PEM encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Session lifetime and retry budget shared by the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub ttl: Duration,
    pub max_tries: u32,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            max_tries: DEFAULT_MAX_TRIES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub tls: Option<TlsPaths>,
    pub allowed_origins: Vec<String>,
    pub identity_resolver_url: Url,
    pub submission_gateway_url: Url,
    pub submission_gateway_token: String,
    pub gateway_timeout: Duration,
    pub session: SessionPolicy,
    pub cache_capacity: usize,
    pub attempt_cache_capacity: usize,
    pub sweep_interval: Duration,
    pub reporting_offset: FixedOffset,
}

impl AppConfig {
    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) if cfg!(feature = "dev") => None,
            (None, None) | (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
        };

        let allowed_origins = get(CORS_ALLOWED_ORIGINS_ENV)
            .map(|raw| parse_origins(&raw))
            .transpose()?
            .unwrap_or_default();

        let identity_resolver_url = parse_url(get(IDENTITY_RESOLVER_URL_ENV), IDENTITY_RESOLVER_URL_ENV)?;
        let submission_gateway_url =
            parse_url(get(SUBMISSION_GATEWAY_URL_ENV), SUBMISSION_GATEWAY_URL_ENV)?;
        let submission_gateway_token =
            get(SUBMISSION_GATEWAY_TOKEN_ENV).ok_or(ConfigError::Missing(SUBMISSION_GATEWAY_TOKEN_ENV))?;

        let gateway_timeout = Duration::from_secs(parse_or(
            get(GATEWAY_TIMEOUT_SECS_ENV),
            GATEWAY_TIMEOUT_SECS_ENV,
            DEFAULT_GATEWAY_TIMEOUT.as_secs(),
        )?);
        let ttl = Duration::from_secs(parse_or(
            get(SESSION_TTL_SECS_ENV),
            SESSION_TTL_SECS_ENV,
            DEFAULT_SESSION_TTL.as_secs(),
        )?);
        let max_tries = parse_or(get(IDENTITY_MAX_TRIES_ENV), IDENTITY_MAX_TRIES_ENV, DEFAULT_MAX_TRIES)?;
        if max_tries == 0 {
            return Err(ConfigError::Invalid {
                name: IDENTITY_MAX_TRIES_ENV,
                reason: "must be at least 1".to_string(),
            });
        }
        let cache_capacity = parse_or(
            get(SESSION_CACHE_CAPACITY_ENV),
            SESSION_CACHE_CAPACITY_ENV,
            DEFAULT_CACHE_CAPACITY,
        )?;
        let attempt_cache_capacity = parse_or(
            get(ATTEMPT_CACHE_CAPACITY_ENV),
            ATTEMPT_CACHE_CAPACITY_ENV,
            DEFAULT_CACHE_CAPACITY,
        )?;
        let sweep_interval = Duration::from_secs(parse_or(
            get(CACHE_SWEEP_INTERVAL_SECS_ENV),
            CACHE_SWEEP_INTERVAL_SECS_ENV,
            DEFAULT_SWEEP_INTERVAL_SECS,
        )?);

        let offset_minutes = parse_or(
            get(SUBMISSION_UTC_OFFSET_MINUTES_ENV),
            SUBMISSION_UTC_OFFSET_MINUTES_ENV,
            DEFAULT_UTC_OFFSET_MINUTES,
        )?;
        let reporting_offset =
            FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| ConfigError::Invalid {
                name: SUBMISSION_UTC_OFFSET_MINUTES_ENV,
                reason: format!("{offset_minutes} minutes is out of range"),
            })?;

        Ok(Self {
            bind_addr,
            tls,
            allowed_origins,
            identity_resolver_url,
            submission_gateway_url,
            submission_gateway_token,
            gateway_timeout,
            session: SessionPolicy { ttl, max_tries },
            cache_capacity,
            attempt_cache_capacity,
            sweep_interval,
            reporting_offset,
        })
    }
}

fn parse_or<T>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_url(raw: Option<String>, name: &'static str) -> Result<Url, ConfigError> {
    let raw = raw.ok_or(ConfigError::Missing(name))?;
    let url = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

/// Origins must be bare `scheme://host[:port]` values; anything with a path
/// would never match a browser `Origin` header.
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|origin| {
            let url = Url::parse(origin).map_err(|e| ConfigError::Invalid {
                name: CORS_ALLOWED_ORIGINS_ENV,
                reason: format!("{origin}: {e}"),
            })?;
            if url.path() != "/" || url.query().is_some() {
                return Err(ConfigError::Invalid {
                    name: CORS_ALLOWED_ORIGINS_ENV,
                    reason: format!("{origin}: origins cannot carry a path"),
                });
            }
            Ok(origin.trim_end_matches('/').to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (TLS_CERT_PATH_ENV, "/etc/pki/tls/certs/app.crt"),
            (TLS_KEY_PATH_ENV, "/etc/pki/tls/private/app.key"),
            (IDENTITY_RESOLVER_URL_ENV, "https://resolver.example.org/get_ids/"),
            (SUBMISSION_GATEWAY_URL_ENV, "https://forms.example.org/submission.json"),
            (SUBMISSION_GATEWAY_TOKEN_ENV, "secret"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let config = load(&base_env()).expect("config loads");
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.session.ttl, Duration::from_secs(3600));
        assert_eq!(config.session.max_tries, 3);
        assert_eq!(config.gateway_timeout, Duration::from_secs(15));
        assert_eq!(config.reporting_offset.local_minus_utc(), -5 * 3600);
        assert!(config.allowed_origins.is_empty());
        assert!(config.tls.is_some());
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.attempt_cache_capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn origins_are_split_and_normalised() {
        let mut env = base_env();
        env.insert(
            CORS_ALLOWED_ORIGINS_ENV,
            "https://survey.example.org/, https://test.example.org",
        );
        let config = load(&env).expect("config loads");
        assert_eq!(
            config.allowed_origins,
            vec![
                "https://survey.example.org".to_string(),
                "https://test.example.org".to_string()
            ]
        );
    }

    #[test]
    fn origin_with_path_is_rejected() {
        let mut env = base_env();
        env.insert(CORS_ALLOWED_ORIGINS_ENV, "https://survey.example.org/app");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { name: CORS_ALLOWED_ORIGINS_ENV, .. })
        ));
    }

    #[test]
    fn missing_gateway_url_is_reported() {
        let mut env = base_env();
        env.remove(IDENTITY_RESOLVER_URL_ENV);
        assert!(matches!(
            load(&env),
            Err(ConfigError::Missing(IDENTITY_RESOLVER_URL_ENV))
        ));
    }

    #[test]
    fn half_configured_tls_is_rejected() {
        let mut env = base_env();
        env.remove(TLS_KEY_PATH_ENV);
        assert!(matches!(load(&env), Err(ConfigError::Missing(TLS_KEY_PATH_ENV))));
    }

    #[test]
    fn zero_tries_is_rejected() {
        let mut env = base_env();
        env.insert(IDENTITY_MAX_TRIES_ENV, "0");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { name: IDENTITY_MAX_TRIES_ENV, .. })
        ));
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let mut env = base_env();
        env.insert(PORT_ENV, "https");
        assert!(matches!(load(&env), Err(ConfigError::Invalid { name: PORT_ENV, .. })));
    }
}
