// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as subject-safe namespace tokens and coherent
//! enrichment-barrier timings.

use crate::diagnostic::ConfigError;
use crate::model::DeskwireConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects all validation errors rather than failing on the first.
pub fn validate_config(config: &DeskwireConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.service.log_level.trim();
    if !LOG_LEVELS.contains(&level) {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level `{level}` is not one of: {}",
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.media_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.media_dir must not be empty".to_string(),
        });
    }

    if config.broker.url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "broker.url must not be empty".to_string(),
        });
    }

    // The namespace becomes the first subject token; dots and wildcard
    // characters would change the routing-key shape.
    let ns = config.broker.namespace.trim();
    if ns.is_empty() {
        errors.push(ConfigError::Validation {
            message: "broker.namespace must not be empty".to_string(),
        });
    } else if ns.contains(['.', '*', '>', ' ']) {
        errors.push(ConfigError::Validation {
            message: format!(
                "broker.namespace `{ns}` must be a single subject token (no `.`, `*`, `>`, or spaces)"
            ),
        });
    }

    if config.broker.reconnect_delay_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "broker.reconnect_delay_secs must be at least 1".to_string(),
        });
    }

    if config.coordination.redis_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "coordination.redis_url must not be empty".to_string(),
        });
    }

    if config.coordination.start_lock_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "coordination.start_lock_ttl_secs must be at least 1".to_string(),
        });
    }

    if config.gateway.enabled {
        let host = config.gateway.host.trim();
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.ingest.reopen_window_minutes <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "ingest.reopen_window_minutes must be positive, got {}",
                config.ingest.reopen_window_minutes
            ),
        });
    }

    if config.ingest.historical_cutoff_hours <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "ingest.historical_cutoff_hours must be positive, got {}",
                config.ingest.historical_cutoff_hours
            ),
        });
    }

    if config.ingest.enrichment_poll_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "ingest.enrichment_poll_ms must be at least 1".to_string(),
        });
    } else if config.ingest.enrichment_timeout_ms < config.ingest.enrichment_poll_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "ingest.enrichment_timeout_ms ({}) must be at least the poll interval ({})",
                config.ingest.enrichment_timeout_ms, config.ingest.enrichment_poll_ms
            ),
        });
    }

    if config.ingest.ack_retry_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "ingest.ack_retry_attempts must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
