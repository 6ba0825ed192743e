// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding `ledger.redb` | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HS256 secret for bearer tokens | Required for production |
//! | `JWT_ISSUER` | Expected JWT issuer claim | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | Unset (HTTP) |
//! | `AUDIT_FLUSH_INTERVAL_SECS` | Audit backlog retry interval | `30` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::AuthConfig;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const AUDIT_FLUSH_INTERVAL_ENV: &str = "AUDIT_FLUSH_INTERVAL_SECS";

const DEFAULT_DATA_DIR: &str = "/data";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_AUDIT_FLUSH_SECS: u64 = 30;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together")]
    IncompleteTls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub auth: AuthConfig,
    pub log_format: LogFormat,
    pub tls: Option<TlsPaths>,
    pub audit_flush_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var(PORT_ENV) {
            Some(raw) => parse(PORT_ENV, "port number", &raw)?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr = parse(HOST_ENV, "bind address", &format!("{host}:{port}"))?;

        let log_format = match var(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    expected: "log format (json|pretty)",
                    value: other.to_string(),
                })
            }
        };

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        let flush_secs = match var(AUDIT_FLUSH_INTERVAL_ENV) {
            Some(raw) => parse::<u64>(AUDIT_FLUSH_INTERVAL_ENV, "number of seconds", &raw)?.max(1),
            None => DEFAULT_AUDIT_FLUSH_SECS,
        };

        Ok(Self {
            data_dir: var(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            bind_addr,
            auth: AuthConfig {
                secret: var(JWT_SECRET_ENV),
                issuer: var(JWT_ISSUER_ENV),
            },
            log_format,
            tls,
            audit_flush_interval: Duration::from_secs(flush_secs),
        })
    }
}

fn parse<T: std::str::FromStr>(
    name: &'static str,
    expected: &'static str,
    raw: &str,
) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.tls.is_none());
        assert!(!config.auth.is_production());
        assert_eq!(config.audit_flush_interval, Duration::from_secs(30));
    }

    #[test]
    fn values_are_read_from_the_environment() {
        let config = config(&[
            ("DATA_DIR", "/tmp/ledger"),
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_ISSUER", "wallet-id"),
            ("LOG_FORMAT", "json"),
            ("TLS_CERT_PATH", "/certs/cert.pem"),
            ("TLS_KEY_PATH", "/certs/key.pem"),
            ("AUDIT_FLUSH_INTERVAL_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.auth.secret.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.issuer.as_deref(), Some("wallet-id"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.tls.unwrap().key, PathBuf::from("/certs/key.pem"));
        assert_eq!(config.audit_flush_interval, Duration::from_secs(5));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { name: "LOG_FORMAT", .. })
        ));
        assert_eq!(
            config(&[("TLS_CERT_PATH", "/certs/cert.pem")]).unwrap_err(),
            ConfigError::IncompleteTls
        );
    }

    #[test]
    fn blank_secret_means_development_mode() {
        let config = config(&[("JWT_SECRET", "  ")]).unwrap();
        assert!(config.auth.secret.is_none());
    }
}
