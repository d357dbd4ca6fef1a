//! Sprout Core: shared abstractions for the scene progression engine.
//!
//! This crate defines the clock and timer service, scene addressing, the
//! persisted snapshot envelope, and the store traits that every other crate
//! depends on. It contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod key;
pub mod snapshot;
pub mod store;
pub mod timer;
