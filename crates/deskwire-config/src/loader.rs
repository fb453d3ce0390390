// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./deskwire.toml` > `~/.config/deskwire/deskwire.toml`
//! > `/etc/deskwire/deskwire.toml`, with environment overrides via the
//! `DESKWIRE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::DeskwireConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/deskwire/deskwire.toml` (system-wide)
/// 3. `~/.config/deskwire/deskwire.toml` (user XDG config)
/// 4. `./deskwire.toml` (local directory)
/// 5. `DESKWIRE_*` environment variables
pub fn load_config() -> Result<DeskwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskwireConfig::default()))
        .merge(Toml::file("/etc/deskwire/deskwire.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("deskwire/deskwire.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("deskwire.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file or env lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<DeskwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskwireConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DeskwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskwireConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `DESKWIRE_GATEWAY_BEARER_TOKEN` must map
/// to `gateway.bearer_token`, not `gateway.bearer.token`.
fn env_provider() -> Env {
    Env::prefixed("DESKWIRE_").map(|key| {
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("broker_", "broker.", 1)
            .replacen("coordination_", "coordination.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("ingest_", "ingest.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_loader_applies_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.broker.url, "nats://127.0.0.1:4222");
        assert_eq!(config.coordination.start_lock_ttl_secs, 60);
    }

    #[test]
    fn str_loader_rejects_unknown_key() {
        let result = load_config_from_str(
            r#"
[gateway]
prot = 9000
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "deskwire.toml",
                r#"
[gateway]
port = 8080

[broker]
namespace = "wire"
"#,
            )?;
            jail.set_env("DESKWIRE_GATEWAY_PORT", "9001");
            jail.set_env("DESKWIRE_BROKER_RECONNECT_DELAY_SECS", "2");

            let config: DeskwireConfig = Figment::new()
                .merge(Serialized::defaults(DeskwireConfig::default()))
                .merge(Toml::file("deskwire.toml"))
                .merge(env_provider())
                .extract()?;

            assert_eq!(config.gateway.port, 9001);
            assert_eq!(config.broker.reconnect_delay_secs, 2);
            assert_eq!(config.broker.namespace, "wire");
            Ok(())
        });
    }

    #[test]
    fn env_maps_underscored_keys_into_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("DESKWIRE_GATEWAY_BEARER_TOKEN", "s3cret");
            jail.set_env("DESKWIRE_STORAGE_DATABASE_PATH", "/tmp/dw.db");

            let config: DeskwireConfig = Figment::new()
                .merge(Serialized::defaults(DeskwireConfig::default()))
                .merge(env_provider())
                .extract()?;

            assert_eq!(config.gateway.bearer_token.as_deref(), Some("s3cret"));
            assert_eq!(config.storage.database_path, "/tmp/dw.db");
            Ok(())
        });
    }
}
