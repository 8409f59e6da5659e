//! Thin Twitch Helix client for clip discovery.
//!
//! This crate is an external collaborator of the reframing pipeline: it
//! queries clips by channel name and returns records whose URLs the
//! download tool can resolve to media streams. Nothing in the core
//! pipeline depends on it.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ClipsClient, ClipsConfig};
pub use error::{ClipsError, ClipsResult};
pub use types::{sort_by_views, ClipRecord};
