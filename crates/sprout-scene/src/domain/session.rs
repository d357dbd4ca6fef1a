//! The persisted per-scene session record.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sprout_coach::MessageId;

use super::definition::{ItemDef, ItemId, Phase, SceneDefinition};

/// The authoritative modal overlay. Unrecognized persisted values decode as
/// `Unknown` so an older or newer snapshot still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PopupTag {
    /// Fact card for a found item.
    Info {
        /// The item.
        item: ItemId,
    },
    /// Reward card for a revealed symbol.
    RewardCard {
        /// The item.
        item: ItemId,
    },
    /// End-of-scene celebration.
    Finale,
    /// A tag this build does not recognize.
    #[serde(other)]
    Unknown,
}

/// Pending action to run when the visible tutor message closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Continuation {
    /// Advance one phase if the session is still in `from`.
    AdvancePhase {
        /// Phase the message was shown in.
        from: Phase,
    },
    /// Open a popup.
    OpenPopup {
        /// The popup.
        popup: PopupTag,
    },
}

/// Which exclusive overlay is up, as stored in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay<'a> {
    /// Discovery animation for an item.
    Discovery(&'a ItemId),
    /// Highlight animation for an item.
    Highlight(&'a ItemId),
    /// A modal popup.
    Popup(&'a PopupTag),
    /// The end-of-scene summary.
    CompletionScreen,
}

/// Everything a scene needs to resume where the player left off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSession {
    /// Current phase.
    pub phase: Phase,
    /// Items found or revealed.
    #[serde(default)]
    pub discovered_items: BTreeSet<ItemId>,
    /// Items placed into their slots.
    #[serde(default)]
    pub placed_items: BTreeMap<ItemId, bool>,
    /// Collect counts per item.
    #[serde(default)]
    pub collected_counters: BTreeMap<ItemId, u32>,
    /// Modal popup.
    #[serde(default)]
    pub popup_tag: Option<PopupTag>,
    /// Item whose discovery animation is running.
    #[serde(default)]
    pub discovery_tag: Option<ItemId>,
    /// Item whose highlight animation is running.
    #[serde(default)]
    pub highlight_tag: Option<ItemId>,
    /// The completion screen is up.
    #[serde(default)]
    pub showing_completion_screen: bool,
    /// Tutor message dispatched and not yet hidden.
    #[serde(default)]
    pub tutor_state_tag: Option<MessageId>,
    /// When `tutor_state_tag` was set.
    #[serde(default)]
    pub tutor_state_timestamp: Option<DateTime<Utc>>,
    /// Cues already shown.
    #[serde(default)]
    pub tutor_shown: BTreeSet<MessageId>,
    /// Cue conditions should be evaluated.
    #[serde(default)]
    pub ready_for_trigger: bool,
    /// Action waiting on the visible tutor message.
    #[serde(default)]
    pub continuation: Option<Continuation>,
    /// A resume is settling.
    #[serde(default)]
    pub is_reconciling: bool,
    /// Stars earned.
    #[serde(default)]
    pub stars: u32,
    /// Share of the scene's items done, 0 to 100.
    #[serde(default)]
    pub progress_percent: u8,
    /// The scene reached its terminal phase.
    #[serde(default)]
    pub completed: bool,
    /// The exit signal was emitted.
    #[serde(default)]
    pub exit_emitted: bool,
    /// Time of the last persisted mutation.
    pub updated_at: DateTime<Utc>,
}

impl SceneSession {
    /// A session that has never been played.
    #[must_use]
    pub fn fresh(phase: Phase, now: DateTime<Utc>) -> Self {
        Self {
            phase,
            discovered_items: BTreeSet::new(),
            placed_items: BTreeMap::new(),
            collected_counters: BTreeMap::new(),
            popup_tag: None,
            discovery_tag: None,
            highlight_tag: None,
            showing_completion_screen: false,
            tutor_state_tag: None,
            tutor_state_timestamp: None,
            tutor_shown: BTreeSet::new(),
            ready_for_trigger: true,
            continuation: None,
            is_reconciling: false,
            stars: 0,
            progress_percent: 0,
            completed: false,
            exit_emitted: false,
            updated_at: now,
        }
    }

    /// Returns the exclusive overlay recorded in the session, if any.
    #[must_use]
    pub fn overlay(&self) -> Option<Overlay<'_>> {
        if let Some(item) = &self.discovery_tag {
            Some(Overlay::Discovery(item))
        } else if let Some(item) = &self.highlight_tag {
            Some(Overlay::Highlight(item))
        } else if let Some(popup) = &self.popup_tag {
            Some(Overlay::Popup(popup))
        } else if self.showing_completion_screen {
            Some(Overlay::CompletionScreen)
        } else {
            None
        }
    }

    /// Number of overlay fields set. More than one is a broken session.
    #[must_use]
    pub fn overlay_count(&self) -> usize {
        [
            self.discovery_tag.is_some(),
            self.highlight_tag.is_some(),
            self.popup_tag.is_some(),
            self.showing_completion_screen,
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Returns whether `item`, which belongs to `phase`, is done.
    #[must_use]
    pub fn item_done(&self, phase: Phase, item: &ItemDef) -> bool {
        match phase {
            Phase::Searching | Phase::Discovering => self.discovered_items.contains(&item.id),
            Phase::Collecting => {
                self.collected_counters.get(&item.id).copied().unwrap_or(0) >= item.required
            }
            Phase::Transforming => self.placed_items.get(&item.id).copied().unwrap_or(false),
            Phase::AllComplete => true,
        }
    }

    /// Returns whether every item of `phase` is done.
    #[must_use]
    pub fn phase_items_done(&self, definition: &SceneDefinition, phase: Phase) -> bool {
        definition
            .phase_def(phase)
            .is_some_and(|def| def.items.iter().all(|item| self.item_done(phase, item)))
    }

    /// Returns whether the item with `id` is done, wherever it lives.
    #[must_use]
    pub fn is_done(&self, definition: &SceneDefinition, id: &ItemId) -> bool {
        definition
            .item(id)
            .is_some_and(|(phase, item)| self.item_done(phase, item))
    }

    /// Done items in progression order.
    #[must_use]
    pub fn done_items(&self, definition: &SceneDefinition) -> Vec<ItemId> {
        definition
            .items()
            .filter(|(phase, item)| self.item_done(*phase, item))
            .map(|(_, item)| item.id.clone())
            .collect()
    }

    /// Recomputes `progress_percent` from the done items.
    pub fn recompute_progress(&mut self, definition: &SceneDefinition) {
        if self.completed {
            self.progress_percent = 100;
            return;
        }
        let total = definition.items().count();
        if total == 0 {
            return;
        }
        let done = self.done_items(definition).len();
        let percent = done * 100 / total;
        self.progress_percent = u8::try_from(percent).unwrap_or(100);
    }
}
