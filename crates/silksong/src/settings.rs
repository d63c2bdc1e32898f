use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use silksong_core::{
    DEFAULT_DISPLAY_NAME, DEFAULT_PRODUCT_ID, ProductQuery, QueryError, sanitize_product_id,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_product_id")]
    pub product_id: String,

    #[serde(default = "default_display_name")]
    pub last_display_name: Option<String>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub alarm_enabled: bool,

    /// Program and arguments used to play the alarm. The terminal bell is
    /// used when unset or empty.
    #[serde(default)]
    pub alarm_command: Option<Vec<String>>,

    #[serde(default = "default_alarm_repeat")]
    pub alarm_repeat: u32,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_product_id() -> String {
    DEFAULT_PRODUCT_ID.to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_display_name() -> Option<String> {
    Some(DEFAULT_DISPLAY_NAME.to_string())
}

fn default_poll_interval() -> u64 {
    6
}

fn default_http_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_alarm_repeat() -> u32 {
    3
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            product_id: default_product_id(),
            last_display_name: default_display_name(),
            poll_interval_secs: default_poll_interval(),
            http_timeout_secs: default_http_timeout(),
            alarm_enabled: true,
            alarm_command: None,
            alarm_repeat: default_alarm_repeat(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl AppSettings {
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
                warn!(
                    "Ignoring unreadable settings at {}: {error}",
                    path.display()
                );
                Self::default()
            }),
            Err(error) => {
                warn!("Failed to read settings at {}: {error}", path.display());
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The persisted product as a validated query. A hand-edited invalid id
    /// falls back to the default product.
    pub fn product_query(&self) -> ProductQuery {
        match ProductQuery::new(self.product_id.clone()) {
            Ok(query) => query.with_display_name(self.last_display_name.clone()),
            Err(error) => {
                warn!("Ignoring stored product id: {error}");
                ProductQuery::default()
            }
        }
    }

    /// Replace the product id from raw user input. Non-digits are dropped
    /// first; an input with no digits at all is rejected and leaves the
    /// settings untouched.
    pub fn set_product_id(&mut self, raw: &str) -> Result<ProductQuery, QueryError> {
        let query = ProductQuery::new(sanitize_product_id(raw))?;
        if query.product_id() != self.product_id {
            self.product_id = query.product_id().to_string();
            self.last_display_name = None;
        }
        Ok(query.with_display_name(self.last_display_name.clone()))
    }

    pub fn remember_display_name(&mut self, product_id: &str, display_name: &str) -> bool {
        if product_id != self.product_id
            || display_name == silksong_core::UNKNOWN_NAME
            || self.last_display_name.as_deref() == Some(display_name)
        {
            return false;
        }
        self.last_display_name = Some(display_name.to_string());
        true
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use silksong_core::QueryError;

    use super::AppSettings;

    #[test]
    fn defaults_match_expected_values() {
        let settings = AppSettings::default();

        assert_eq!(settings.product_id, "1030300");
        assert_eq!(
            settings.last_display_name.as_deref(),
            Some("Hollow Knight: Silksong")
        );
        assert_eq!(settings.poll_interval_secs, 6);
        assert_eq!(settings.http_timeout_secs, 10);
        assert!(settings.alarm_enabled);
        assert_eq!(settings.alarm_command, None);
        assert_eq!(settings.alarm_repeat, 3);
        assert!(!settings.debug_logging);
        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let settings: AppSettings = serde_json::from_value(json!({
            "product_id": "367520",
            "alarm_enabled": false
        }))
        .expect("partial settings should deserialize");

        assert_eq!(settings.product_id, "367520");
        assert!(!settings.alarm_enabled);
        assert_eq!(settings.poll_interval_secs, 6);
    }

    #[test]
    fn load_from_falls_back_on_corrupt_file() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").expect("settings file should be written");

        assert_eq!(AppSettings::load_from(&path), AppSettings::default());
    }

    #[test]
    fn save_then_load_persists_product_id() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join("config").join("settings.json");
        let mut settings = AppSettings::default();
        settings
            .set_product_id("367520")
            .expect("numeric id should be accepted");

        settings.save_to(&path).expect("settings should save");

        let loaded = AppSettings::load_from(&path);
        assert_eq!(loaded.product_id, "367520");
        assert_eq!(loaded.last_display_name, None);
    }

    #[test]
    fn set_product_id_filters_non_digits() {
        let mut settings = AppSettings::default();

        let query = settings
            .set_product_id(" 367-520 ")
            .expect("digits should survive filtering");

        assert_eq!(query.product_id(), "367520");
        assert_eq!(settings.product_id, "367520");
    }

    #[test]
    fn set_product_id_rejects_blank_input() {
        let mut settings = AppSettings::default();

        assert_eq!(settings.set_product_id("abc"), Err(QueryError::Blank));
        assert_eq!(settings.set_product_id(""), Err(QueryError::Blank));
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn set_same_product_id_keeps_display_name() {
        let mut settings = AppSettings::default();

        let query = settings
            .set_product_id("1030300")
            .expect("numeric id should be accepted");

        assert_eq!(query.label(), "Hollow Knight: Silksong");
    }

    #[test]
    fn product_query_falls_back_for_invalid_stored_id() {
        let settings = AppSettings {
            product_id: "silksong".to_string(),
            ..AppSettings::default()
        };

        assert_eq!(settings.product_query().product_id(), "1030300");
    }

    #[test]
    fn remember_display_name_ignores_other_products_and_unknown() {
        let mut settings = AppSettings {
            last_display_name: None,
            ..AppSettings::default()
        };

        assert!(!settings.remember_display_name("367520", "Hollow Knight"));
        assert!(!settings.remember_display_name("1030300", "Unknown"));
        assert!(settings.remember_display_name("1030300", "Silksong"));
        assert!(!settings.remember_display_name("1030300", "Silksong"));
        assert_eq!(settings.last_display_name.as_deref(), Some("Silksong"));
    }

    #[test]
    fn poll_interval_is_never_zero() {
        let settings = AppSettings {
            poll_interval_secs: 0,
            ..AppSettings::default()
        };

        assert_eq!(settings.poll_interval().as_secs(), 1);
    }
}
