//! Process-level settings
//!
//! Settings are layered: built-in defaults, then an optional `guilddesk`
//! file in the working directory, then `GUILDDESK_*` environment variables.
//! CLI flags override all of these at the call site.

use crate::error::Result;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime settings for the guilddesk process
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Chat-platform bot token; required only by `serve`
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Path of the guild configuration document
    pub config_path: PathBuf,
    /// Bind host for the liveness endpoint
    pub liveness_host: String,
    /// Bind port for the liveness endpoint
    pub liveness_port: u16,
}

impl Settings {
    /// Load settings from defaults, optional file, and environment
    pub fn load_or_default() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("config_path", "ticket_config.json")
            .map_err(config_error)?
            .set_default("liveness_host", "0.0.0.0")
            .map_err(config_error)?
            .set_default("liveness_port", 8080)
            .map_err(config_error)?
            .add_source(config::File::with_name("guilddesk").required(false))
            .add_source(config::Environment::with_prefix("GUILDDESK"))
            .build()
            .map_err(config_error)?;

        settings.try_deserialize().map_err(config_error)
    }

    /// Socket address of the liveness endpoint
    pub fn liveness_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.liveness_host, self.liveness_port)
            .parse()
            .map_err(|_| {
                crate::error::GuildDeskError::custom(format!(
                    "invalid liveness address {}:{}",
                    self.liveness_host, self.liveness_port
                ))
            })
    }
}

fn config_error(e: config::ConfigError) -> crate::error::GuildDeskError {
    crate::error::GuildDeskError::custom(format!("settings error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::load_or_default().unwrap();
        assert_eq!(settings.config_path, PathBuf::from("ticket_config.json"));
        assert_eq!(settings.liveness_port, 8080);
        assert!(settings.liveness_addr().unwrap().port() == 8080);
    }

    #[test]
    fn test_invalid_liveness_addr() {
        let settings = Settings {
            bot_token: None,
            config_path: PathBuf::from("ticket_config.json"),
            liveness_host: "not a host".to_string(),
            liveness_port: 8080,
        };
        assert!(settings.liveness_addr().is_err());
    }
}
