//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{AppConfig, TransportMode};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, message: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, message } => write!(f, "Invalid {}: {}", var, message),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides on top of file or default settings.
///
/// Recognized variables: `PORT`, `CORS_ORIGIN`, `MCP_TRANSPORT` (alias
/// `STARTER_TRANSPORT`), `MCP_JSON_RESPONSE`. `lookup` is `std::env::var` in production.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            var: "PORT",
            message: format!("'{}' is not a port number", port),
        })?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }

    if let Some(origin) = lookup("CORS_ORIGIN") {
        config.cors.origin = origin;
    }

    // MCP_TRANSPORT wins over the legacy STARTER_TRANSPORT name.
    for var in ["STARTER_TRANSPORT", "MCP_TRANSPORT"] {
        if let Some(transport) = lookup(var) {
            config.server.transport = transport
                .parse::<TransportMode>()
                .map_err(|message| ConfigError::Env { var, message })?;
        }
    }

    if let Some(flag) = lookup("MCP_JSON_RESPONSE") {
        config.http.json_response = matches!(
            flag.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        );
    }

    Ok(())
}

/// File (or defaults) with environment overrides applied. Not yet validated:
/// callers apply their own overrides and then call [`validate_config`].
pub fn resolve_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => AppConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}
