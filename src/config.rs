use crate::error::ConfigError;

use reqwest::Url;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

pub const DEFAULT_BLAND_API_URL: &str = "https://api.bland.ai";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_VENDOR_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub bland_api_url: String,
    pub bland_api_key: String,
    /// When absent the service runs on the in-process store.
    pub database_url: Option<String>,
    pub public_base_url: Url,
    pub listen_addr: SocketAddr,
    pub vendor_timeout: Duration,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bland_api_key = get("BLAND_API_KEY").ok_or(ConfigError::Missing("BLAND_API_KEY"))?;
        let bland_api_url = get("BLAND_API_URL")
            .unwrap_or_else(|| DEFAULT_BLAND_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string())
            .parse::<Url>()
            .map_err(|e| ConfigError::Invalid {
                name: "PUBLIC_BASE_URL",
                reason: e.to_string(),
            })?;
        if public_base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                name: "PUBLIC_BASE_URL",
                reason: "not an http(s) base URL".to_string(),
            });
        }
        let listen_addr = get("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "LISTEN_ADDR",
                reason: e.to_string(),
            })?;
        let vendor_timeout = match get("VENDOR_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "VENDOR_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_VENDOR_TIMEOUT_SECS,
        };
        let log_level = match get("LOG_LEVEL") {
            Some(v) => v.parse::<LevelFilter>().map_err(|e| ConfigError::Invalid {
                name: "LOG_LEVEL",
                reason: e.to_string(),
            })?,
            None => LevelFilter::DEBUG,
        };

        Ok(Self {
            bland_api_url,
            bland_api_key,
            database_url: get("DATABASE_URL"),
            public_base_url,
            listen_addr,
            vendor_timeout: Duration::from_secs(vendor_timeout),
            log_level,
        })
    }

    /// Webhook the vendor should call back when a call for `business_id` completes.
    pub fn webhook_url(&self, business_id: &str) -> String {
        let mut url = self.public_base_url.clone();
        let path = format!("{}/api/bland-webhook", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_fragment(None);
        url.query_pairs_mut()
            .clear()
            .append_pair("business_id", business_id);
        url.into()
    }
}
