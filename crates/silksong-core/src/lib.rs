//! Release-status core for Silksong.
//!
//! This crate holds everything that does not depend on how the verdict is
//! shown:
//! - Product query validation.
//! - Fetching the raw store payload for a product.
//! - Resolving a payload into a tri-state release status.
//! - The cancellable poll loop that publishes status to observers.

mod fetch;
mod poll;
mod query;
mod status;

/// Store fetcher trait, the Steam implementation and its transport errors.
pub use fetch::{
    STORE_BASE_URL, StatusFetcher, SteamStoreFetcher, TransportError, check_once, store_url,
};
/// Poll loop, published snapshot and observer interface.
pub use poll::{PollLoop, StatusObserver, StatusUpdate};
/// Validated product identifiers.
pub use query::{
    DEFAULT_DISPLAY_NAME, DEFAULT_PRODUCT_ID, ProductQuery, QueryError, sanitize_product_id,
};
/// Release status model and the payload resolver.
pub use status::{ReleaseStatus, Resolution, ResolveError, UNKNOWN_NAME, resolve};
