//! Change-aware polling sessions for the food-sharing marketplace.
//!
//! A [`RefreshController`] keeps one remote resource fresh for the signed-in
//! user: it fetches once on start, polls on a single timer, pauses while the
//! consumer is hidden and only replaces its cache when the payload actually
//! changed.

pub mod api;
pub mod core;
pub mod refresh;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::core::error::RefreshError;
pub use crate::core::models::{Identity, RefreshState};
pub use refresh::{RefreshConfig, RefreshController, RefreshSnapshot};
