//! Shared test mocks and utilities for the Sprout scene progression engine.

mod clock;
mod scene;
mod store;

pub use clock::{FixedClock, ManualClock, t0};
pub use scene::sample_scene;
pub use store::{
    FailingCompletionStore, FailingSnapshotStore, RecordingCompletionStore,
    RecordingSnapshotStore, scene_key,
};
