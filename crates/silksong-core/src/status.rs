use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Display name used when the store entry has no usable `name`.
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReleaseStatus {
    Loading,
    Success { is_out: bool },
    Error { message: String },
}

impl ReleaseStatus {
    /// True only for a successful verdict that the product is out.
    #[must_use]
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Success { is_out: true })
    }

    /// True once a cycle has finished, whatever its outcome.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => f.write_str("Checking..."),
            Self::Success { is_out: true } => f.write_str("YES"),
            Self::Success { is_out: false } => f.write_str("NO"),
            Self::Error { message } => write!(f, "Error: {message}"),
        }
    }
}

/// Why a payload could not be turned into a verdict. Every kind collapses
/// into [`ReleaseStatus::Error`]; the label only differs for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("transport failure")]
    Transport,
    #[error("parse failure")]
    Parse,
    #[error("invalid product id or lookup failure")]
    Lookup,
    #[error("missing data field")]
    MissingData,
    #[error("missing release_date field")]
    MissingReleaseDate,
}

impl ResolveError {
    pub const ALL: [Self; 5] = [
        Self::Transport,
        Self::Parse,
        Self::Lookup,
        Self::MissingData,
        Self::MissingReleaseDate,
    ];

    /// Recover the error kind from a published [`ReleaseStatus::Error`]
    /// message.
    #[must_use]
    pub fn classify(message: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string() == message)
    }
}

impl From<ResolveError> for ReleaseStatus {
    fn from(error: ResolveError) -> Self {
        Self::Error {
            message: error.to_string(),
        }
    }
}

/// Output of [`resolve`]. `display_name` is `None` when the payload never
/// got as far as the product's `data` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub status: ReleaseStatus,
    pub display_name: Option<String>,
}

impl Resolution {
    fn failed(error: ResolveError) -> Self {
        Self {
            status: error.into(),
            display_name: None,
        }
    }
}

/// Turn a raw `appdetails` payload into a release verdict for `product_id`.
///
/// `None` stands for a transport failure upstream. The checks run in a fixed
/// order and stop at the first failure; a missing `coming_soon` flag counts as
/// "not released yet".
#[must_use]
pub fn resolve(raw: Option<&str>, product_id: &str) -> Resolution {
    let Some(raw) = raw else {
        return Resolution::failed(ResolveError::Transport);
    };

    let root = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(root)) => root,
        _ => return Resolution::failed(ResolveError::Parse),
    };

    let data = match product_data(&root, product_id) {
        Ok(data) => data,
        Err(error) => return Resolution::failed(error),
    };

    let display_name = Some(display_name_of(data));
    let status = match coming_soon_of(data) {
        Ok(coming_soon) => ReleaseStatus::Success {
            is_out: !coming_soon,
        },
        Err(error) => error.into(),
    };

    Resolution {
        status,
        display_name,
    }
}

fn product_data<'a>(
    root: &'a Map<String, Value>,
    product_id: &str,
) -> Result<&'a Map<String, Value>, ResolveError> {
    let entry = root
        .get(product_id)
        .and_then(Value::as_object)
        .ok_or(ResolveError::Lookup)?;

    if !entry.get("success").and_then(lenient_bool).unwrap_or(false) {
        return Err(ResolveError::Lookup);
    }

    entry
        .get("data")
        .and_then(Value::as_object)
        .ok_or(ResolveError::MissingData)
}

fn display_name_of(data: &Map<String, Value>) -> String {
    match data.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => UNKNOWN_NAME.to_string(),
    }
}

fn coming_soon_of(data: &Map<String, Value>) -> Result<bool, ResolveError> {
    let release_date = data
        .get("release_date")
        .and_then(Value::as_object)
        .ok_or(ResolveError::MissingReleaseDate)?;

    Ok(release_date
        .get("coming_soon")
        .and_then(lenient_bool)
        .unwrap_or(true))
}

// The store occasionally serialises flags as "true"/"false" strings.
fn lenient_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) if text.eq_ignore_ascii_case("true") => Some(true),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}
