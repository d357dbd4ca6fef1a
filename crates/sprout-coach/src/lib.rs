//! Sprout Coach: the tutor message scheduler.
//!
//! Presents short timed messages one at a time, highest priority first, with
//! a primary dismiss timer, a safety dismiss timer, and a periodic health
//! check that frees a slot left occupied by a logic error.

mod coach;
mod config;
mod message;
mod queue;

pub use coach::{ActiveMessage, Coach, CoachTimer, EnqueueOutcome, HiddenMessage};
pub use config::CoachConfig;
pub use message::{EnqueueMode, HideReason, MessageId, TutorMessage};
