//! Sprout Store: snapshot and completion store implementations.
//!
//! `memory` keeps everything in process (dry runs). `json_file` writes one
//! JSON document per scene under a data directory, replacing files atomically.

mod atomic_io;
pub mod json_file;
pub mod memory;
