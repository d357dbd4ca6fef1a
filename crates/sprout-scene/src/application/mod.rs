//! Scene application layer: the engine and the logic it runs.

pub mod engine;
mod progression;
pub mod reconciler;
mod triggers;
pub mod view;
