//! Feed events and their classification.
//!
//! # Event Flow
//!
//! 1. `StreamSubscriber` decodes a feed record into a [`RawEvent`]
//! 2. [`Classifier`] turns the event text into a [`ClassifiedMatch`] (or nothing)
//! 3. `ActionDispatcher` spawns one reaction per match
//!
//! Events are transient: nothing here is persisted or deduplicated.

pub mod classifier;
pub mod types;

pub use classifier::Classifier;
pub use types::{Category, ClassifiedMatch, RawEvent};
