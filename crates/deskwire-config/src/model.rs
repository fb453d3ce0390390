// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Deskwire backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Deskwire configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeskwireConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Message broker settings.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Coordination store (locks + status cache) settings.
    #[serde(default)]
    pub coordination: CoordinationConfig,

    /// HTTP/WebSocket gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Ingestion pipeline tuning.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name, used as the durable consumer-group prefix.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "deskwire".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory for downloaded media (cached avatars).
    #[serde(default = "default_media_dir")]
    pub media_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            media_dir: default_media_dir(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("deskwire").join("deskwire.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "deskwire.db".to_string())
}

fn default_media_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("deskwire").join("media"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "media".to_string())
}

/// Message broker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// NATS server URL.
    #[serde(default = "default_broker_url")]
    pub url: String,

    /// Subject namespace prefix. Must be a single subject token.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Fixed delay between connect retries, in seconds.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// How long a delivered envelope may stay unacknowledged, in seconds.
    #[serde(default = "default_ack_wait_secs")]
    pub ack_wait_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            namespace: default_namespace(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            ack_wait_secs: default_ack_wait_secs(),
        }
    }
}

fn default_broker_url() -> String {
    "nats://127.0.0.1:4222".to_string()
}

fn default_namespace() -> String {
    "wire".to_string()
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_ack_wait_secs() -> u64 {
    30
}

/// Coordination store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinationConfig {
    /// Redis server URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// TTL of the session-start debounce lock, in seconds.
    #[serde(default = "default_start_lock_ttl_secs")]
    pub start_lock_ttl_secs: u64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            start_lock_ttl_secs: default_start_lock_ttl_secs(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_start_lock_ttl_secs() -> u64 {
    60
}

/// HTTP/WebSocket gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Enable the gateway.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for the authenticated routes. `None` rejects all
    /// requests to those routes (fail-closed).
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

/// Ingestion pipeline tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Default reopen window for individual tickets, in minutes.
    /// Tenants may override per row.
    #[serde(default = "default_reopen_window_minutes")]
    pub reopen_window_minutes: i64,

    /// Messages older than this are archived without reopening tickets.
    #[serde(default = "default_historical_cutoff_hours")]
    pub historical_cutoff_hours: i64,

    /// Enrichment barrier poll interval, in milliseconds.
    #[serde(default = "default_enrichment_poll_ms")]
    pub enrichment_poll_ms: u64,

    /// Enrichment barrier ceiling, in milliseconds.
    #[serde(default = "default_enrichment_timeout_ms")]
    pub enrichment_timeout_ms: u64,

    /// Attempts for the message-ack handler (the only retried handler).
    #[serde(default = "default_ack_retry_attempts")]
    pub ack_retry_attempts: u32,

    /// Fixed delay between ack retries, in milliseconds.
    #[serde(default = "default_ack_retry_delay_ms")]
    pub ack_retry_delay_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            reopen_window_minutes: default_reopen_window_minutes(),
            historical_cutoff_hours: default_historical_cutoff_hours(),
            enrichment_poll_ms: default_enrichment_poll_ms(),
            enrichment_timeout_ms: default_enrichment_timeout_ms(),
            ack_retry_attempts: default_ack_retry_attempts(),
            ack_retry_delay_ms: default_ack_retry_delay_ms(),
        }
    }
}

fn default_reopen_window_minutes() -> i64 {
    120
}

fn default_historical_cutoff_hours() -> i64 {
    24
}

fn default_enrichment_poll_ms() -> u64 {
    500
}

fn default_enrichment_timeout_ms() -> u64 {
    5000
}

fn default_ack_retry_attempts() -> u32 {
    3
}

fn default_ack_retry_delay_ms() -> u64 {
    250
}
