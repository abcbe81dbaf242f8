//! Configuration loading: TOML file with environment variable overrides

use crate::types::PlatformConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Load configuration from a TOML file, then apply environment overrides.
///
/// A missing file is not an error; defaults are used so the server can come
/// up in development with nothing but `DATABASE_URL` set.
pub fn load_config(path: &str) -> Result<PlatformConfig> {
    let mut config = if Path::new(path).exists() {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: PlatformConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        info!(path = path, "Loaded configuration file");
        config
    } else {
        warn!(path = path, "Config file not found, using defaults");
        PlatformConfig::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut PlatformConfig) {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }
    if let Ok(url) = std::env::var("RUNTIME_URL") {
        config.runtime.base_url = url;
    }
    if let Ok(host) = std::env::var("PUBLIC_HOST") {
        config.instancer.public_host = host;
    }
    if let Ok(port) = std::env::var("SERVER_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => warn!(value = %port, "Ignoring unparseable SERVER_PORT"),
        }
    }
    if let Ok(secs) = std::env::var("INSTANCE_COOLDOWN_SECS") {
        match secs.parse() {
            Ok(secs) => config.instancer.cooldown_secs = secs,
            Err(_) => warn!(value = %secs, "Ignoring unparseable INSTANCE_COOLDOWN_SECS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config("/nonexistent/ctf-config.toml").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.instancer.instance_timeout_secs, 86_400);
    }

    #[test]
    fn parses_partial_toml() {
        let raw = r#"
            [instancer]
            cooldown_secs = 60
            max_instances_per_team = 8
        "#;
        let config: PlatformConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.instancer.cooldown_secs, 60);
        assert_eq!(config.instancer.max_instances_per_team, 8);
        assert_eq!(config.instancer.max_instances_per_user, 2);
    }
}
