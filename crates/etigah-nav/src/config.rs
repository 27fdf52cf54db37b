//! Navigator configuration.
//!
//! ```json
//! { "uri_scheme": "direction", "history_limit": 10, "default_destination": "NODE_DEST" }
//! ```
//!
//! Every field is optional in the file; missing ones take their defaults.

use crate::error::{MapError, Result};
use crate::qr::DEFAULT_SCHEME;
use crate::session::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for a [`Navigator`](crate::Navigator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Scheme of URI markers (`<scheme>://node?...`)
    pub uri_scheme: String,
    /// Number of route history entries kept
    pub history_limit: usize,
    /// Destination used when a scan starts a session without one
    pub default_destination: Option<String>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            uri_scheme: DEFAULT_SCHEME.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            default_destination: None,
        }
    }
}

impl NavigatorConfig {
    /// Set the URI marker scheme.
    pub fn with_uri_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.uri_scheme = scheme.into();
        self
    }

    /// Set the history cap.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Set the fallback destination.
    pub fn with_default_destination(mut self, destination: impl Into<String>) -> Self {
        self.default_destination = Some(destination.into());
        self
    }

    /// Parse a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Config`] for malformed JSON or an empty scheme.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| MapError::Config {
            message: format!("invalid navigator config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| MapError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.uri_scheme.is_empty() {
            return Err(MapError::Config {
                message: "uri_scheme must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = NavigatorConfig::from_json_str(r#"{"default_destination":"NODE_DEST"}"#).unwrap();
        assert_eq!(config.uri_scheme, "direction");
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.default_destination.as_deref(), Some("NODE_DEST"));
    }

    #[test]
    fn test_bad_config_is_rejected() {
        assert!(matches!(
            NavigatorConfig::from_json_str(r#"{"history_limit":"ten"}"#),
            Err(MapError::Config { .. })
        ));
        assert!(matches!(
            NavigatorConfig::from_json_str(r#"{"uri_scheme":""}"#),
            Err(MapError::Config { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"uri_scheme":"etigah","history_limit":3}}"#).unwrap();

        let config = NavigatorConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config,
            NavigatorConfig::default()
                .with_uri_scheme("etigah")
                .with_history_limit(3)
        );

        assert!(NavigatorConfig::from_file("/nonexistent/navigator.json").is_err());
    }
}
