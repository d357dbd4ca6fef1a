//! Sprout Scene: the scene progression engine.
//!
//! Validates player interactions against the current phase, advances the
//! phase, drives the tutor through its cue table, persists the session after
//! every mutation, and rebuilds interrupted overlays when a scene is resumed.

pub mod application;
pub mod config;
pub mod domain;
