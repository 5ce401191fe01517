//! Homevault Domain - Core business types
//!
//! This crate defines the domain model for the Homevault inventory
//! client. All types here are pure Rust with no I/O dependencies.

pub mod attribute;
pub mod auth;
pub mod error;
pub mod item;
pub mod method;

pub use attribute::AttributeKind;
pub use auth::{
    AuthError, DEFAULT_TOKEN_LIFETIME_SECS, Identity, TOKEN_EXPIRY_MARGIN_SECS, token_expiry,
};
pub use error::{RequestError, RequestResult};
pub use item::{InventoryItem, ItemFilter};
pub use method::HttpMethod;
