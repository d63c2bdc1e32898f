use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::UNKNOWN_NAME;

/// Steam app id of Hollow Knight: Silksong.
pub const DEFAULT_PRODUCT_ID: &str = "1030300";
pub const DEFAULT_DISPLAY_NAME: &str = "Hollow Knight: Silksong";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("product id cannot be empty")]
    Blank,
    #[error("product id must contain only digits: {0:?}")]
    NotNumeric(String),
}

/// A product to poll. The id is always a non-empty ASCII digit string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuery")]
pub struct ProductQuery {
    product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct RawQuery {
    product_id: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl TryFrom<RawQuery> for ProductQuery {
    type Error = QueryError;

    fn try_from(raw: RawQuery) -> Result<Self, Self::Error> {
        Ok(Self::new(raw.product_id)?.with_display_name(raw.display_name))
    }
}

impl ProductQuery {
    /// # Errors
    /// Returns [`QueryError::Blank`] for an empty or whitespace-only id and
    /// [`QueryError::NotNumeric`] when it contains anything but ASCII digits.
    pub fn new(product_id: impl Into<String>) -> Result<Self, QueryError> {
        let product_id = product_id.into();
        validate_product_id(&product_id)?;
        Ok(Self {
            product_id,
            display_name: None,
        })
    }

    /// Attach the last known display name. Blank names are dropped.
    #[must_use]
    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        self.display_name = display_name.filter(|name| !name.trim().is_empty());
        self
    }

    #[must_use]
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Name to show before the first successful lookup.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name().unwrap_or(UNKNOWN_NAME)
    }
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            product_id: DEFAULT_PRODUCT_ID.to_string(),
            display_name: Some(DEFAULT_DISPLAY_NAME.to_string()),
        }
    }
}

pub(crate) fn validate_product_id(product_id: &str) -> Result<(), QueryError> {
    if product_id.trim().is_empty() {
        return Err(QueryError::Blank);
    }
    if !product_id.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(QueryError::NotNumeric(product_id.to_string()));
    }
    Ok(())
}

/// Strip everything but ASCII digits from user input.
#[must_use]
pub fn sanitize_product_id(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_PRODUCT_ID, ProductQuery, QueryError, sanitize_product_id};
    use crate::status::UNKNOWN_NAME;

    #[test]
    fn new_accepts_numeric_ids() {
        let query = ProductQuery::new("367520").expect("numeric id should be accepted");
        assert_eq!(query.product_id(), "367520");
        assert_eq!(query.display_name(), None);
    }

    #[test]
    fn new_rejects_blank_ids() {
        assert_eq!(ProductQuery::new(""), Err(QueryError::Blank));
        assert_eq!(ProductQuery::new("   "), Err(QueryError::Blank));
    }

    #[test]
    fn new_rejects_non_numeric_ids() {
        assert_eq!(
            ProductQuery::new("10a30"),
            Err(QueryError::NotNumeric("10a30".to_string()))
        );
        assert!(ProductQuery::new(" 1030300").is_err());
        assert!(ProductQuery::new("-5").is_err());
    }

    #[test]
    fn default_query_targets_silksong() {
        let query = ProductQuery::default();
        assert_eq!(query.product_id(), DEFAULT_PRODUCT_ID);
        assert_eq!(query.label(), "Hollow Knight: Silksong");
    }

    #[test]
    fn label_falls_back_to_unknown() {
        let query = ProductQuery::new("42")
            .expect("numeric id should be accepted")
            .with_display_name(Some("  ".to_string()));
        assert_eq!(query.display_name(), None);
        assert_eq!(query.label(), UNKNOWN_NAME);
    }

    #[test]
    fn sanitize_keeps_only_digits() {
        assert_eq!(sanitize_product_id(" 1 030-300x"), "1030300");
        assert_eq!(sanitize_product_id("abc"), "");
    }

    #[test]
    fn deserialization_validates_product_id() {
        let parsed: ProductQuery =
            serde_json::from_str(r#"{"product_id":"1030300","display_name":"Silksong"}"#)
                .expect("valid query should deserialize");
        assert_eq!(parsed.label(), "Silksong");

        let invalid = serde_json::from_str::<ProductQuery>(r#"{"product_id":""}"#);
        assert!(invalid.is_err());
    }
}
