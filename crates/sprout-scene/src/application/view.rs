//! Read-only scene view for the renderer.

use sprout_coach::TutorMessage;
use sprout_core::key::SceneKey;

use crate::domain::session::{Overlay, SceneSession};

/// What the renderer draws.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    /// The scene.
    pub key: &'a SceneKey,
    /// The full session.
    pub session: &'a SceneSession,
    /// The exclusive overlay, if one is up.
    pub overlay: Option<Overlay<'a>>,
    /// The visible tutor message.
    pub tutor: Option<&'a TutorMessage>,
}

impl SceneView<'_> {
    /// Number of exclusive surfaces on screen, counting the tutor message.
    /// Never more than one.
    #[must_use]
    pub fn visible_surfaces(&self) -> usize {
        self.session.overlay_count() + usize::from(self.tutor.is_some())
    }
}
