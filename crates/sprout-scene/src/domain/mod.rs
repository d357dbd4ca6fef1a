//! Scene domain types.

pub mod definition;
pub mod inputs;
pub mod session;
pub mod signals;
