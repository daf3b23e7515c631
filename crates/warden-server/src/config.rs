//! Server configuration loaded from a TOML file.
//!
//! ```toml
//! bind = "0.0.0.0:8080"
//! channels = ["123456789"]
//!
//! [directory]
//! api_url = "https://directory.example.net/api"
//! events_url = "wss://directory.example.net/events"
//! token = "..."
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use warden_gateway::GatewayConfig;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Ids of the voice channels to monitor.
    pub channels: Vec<String>,
    /// Directory service endpoints and credentials.
    pub directory: GatewayConfig,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|_| ConfigError::FileNotFound(path.to_path_buf()))?;
    let config: ServerConfig =
        toml::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.bind.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::ValidationError(format!(
            "bind is not a valid socket address: {}",
            config.bind
        )));
    }
    if config.channels.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one monitored channel is required".into(),
        ));
    }
    if config.channels.iter().any(|c| c.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "channel ids must not be empty".into(),
        ));
    }
    if config.directory.token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "directory.token is required".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const VALID: &str = r#"
        channels = ["123"]

        [directory]
        api_url = "http://directory.local/api"
        events_url = "ws://directory.local/events"
        token = "t"
    "#;

    #[test]
    fn loads_a_valid_config_with_defaults() {
        let file = write_config(VALID);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.channels, vec!["123".to_string()]);
        assert_eq!(config.directory.api_url, "http://directory.local/api");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_config(Path::new("/nonexistent/warden.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let file = write_config("channels = [");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn no_channels_fails_validation() {
        let file = write_config(
            r#"
            channels = []

            [directory]
            api_url = "http://a"
            events_url = "ws://b"
            token = "t"
        "#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn blank_token_fails_validation() {
        let file = write_config(
            r#"
            channels = ["123"]

            [directory]
            api_url = "http://a"
            events_url = "ws://b"
            token = "  "
        "#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn bad_bind_address_fails_validation() {
        let file = write_config(&format!("bind = \"not-an-addr\"\n{VALID}"));
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
