use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::DomainError;

pub const MAX_KEY_LENGTH: usize = 80;
pub const MAX_TITLE_LENGTH: usize = 80;

/// System-wide configuration of one transport instance, created by
/// administrators. The key is what recipients reference from their own
/// configurations; `transport` names the implementation a factory must
/// support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfiguration {
    pub key: String,
    pub transport: String,
    pub title: String,
    /// Disabled configurations freeze new sends; already-queued messages may
    /// still complete.
    pub enabled: bool,
    /// Opaque vendor settings, including secrets such as API tokens.
    pub vendor_config: Option<Value>,
}

impl TransportConfiguration {
    pub fn new(
        key: impl Into<String>,
        transport: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let key = key.into();
        let title = title.into();
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return Err(DomainError::Validation(format!(
                "transport configuration key must be 1..={MAX_KEY_LENGTH} characters"
            )));
        }
        if title.len() > MAX_TITLE_LENGTH {
            return Err(DomainError::Validation(format!(
                "transport configuration title exceeds {MAX_TITLE_LENGTH} characters"
            )));
        }

        Ok(Self {
            key,
            transport: transport.into(),
            title,
            enabled: false,
            vendor_config: None,
        })
    }

    pub fn vendor_config(&self) -> Value {
        self.vendor_config.clone().unwrap_or(Value::Null)
    }

    /// String value out of the vendor blob, with empty strings treated as
    /// absent.
    pub fn vendor_str(&self, field: &str) -> Option<String> {
        let value = self.vendor_config.as_ref()?.get(field)?.as_str()?;
        if value.is_empty() {
            None
        } else {
            Some(value.to_owned())
        }
    }

    pub fn vendor_i64(&self, field: &str) -> Option<i64> {
        self.vendor_config.as_ref()?.get(field)?.as_i64()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn new_configurations_start_disabled() {
        let config = TransportConfiguration::new("ntfy-main", "ntfy", "Main ntfy").unwrap();
        assert!(!config.enabled);
        assert!(config.vendor_config.is_none());
    }

    #[test]
    fn vendor_accessors_ignore_empty_values() {
        let mut config = TransportConfiguration::new("ntfy-main", "ntfy", "Main ntfy").unwrap();
        config.vendor_config = Some(json!({
            "serverUrl": "https://ntfy.example.org",
            "accessToken": "",
            "port": 6001,
        }));

        assert_eq!(
            config.vendor_str("serverUrl").as_deref(),
            Some("https://ntfy.example.org")
        );
        assert_eq!(config.vendor_str("accessToken"), None);
        assert_eq!(config.vendor_str("missing"), None);
        assert_eq!(config.vendor_i64("port"), Some(6001));
    }

    #[test]
    fn key_length_is_bounded() {
        let key = "k".repeat(MAX_KEY_LENGTH + 1);
        assert!(TransportConfiguration::new(key, "ntfy", "too long").is_err());
    }
}
