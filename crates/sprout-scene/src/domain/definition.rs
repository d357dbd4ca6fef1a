//! Scene definitions: the table every scene is driven by.
//!
//! A definition lists the phases a scene uses (an ordered subset of
//! [`Phase`] ending in [`Phase::AllComplete`]), the items to complete in each
//! phase, and the tutor cues with the conditions that fire them.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sprout_coach::{EnqueueMode, MessageId, TutorMessage};
use sprout_core::error::DomainError;
use sprout_core::key::{SceneId, SceneKey, ZoneId};

use super::session::PopupTag;

/// A step in a scene's progression. The declaration order is the
/// progression order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Find hidden items by tapping them.
    Searching,
    /// Tap symbols to reveal their reward cards.
    Discovering,
    /// Gather items, some of them several times.
    Collecting,
    /// Place items into their slots.
    Transforming,
    /// Terminal phase.
    AllComplete,
}

impl Phase {
    /// Returns whether this is the terminal phase.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::AllComplete
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Searching => "searching",
            Self::Discovering => "discovering",
            Self::Collecting => "collecting",
            Self::Transforming => "transforming",
            Self::AllComplete => "all_complete",
        };
        f.write_str(name)
    }
}

/// Identifier of an interactive item within a scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates an item identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a drop slot in a transforming phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    /// Creates a slot identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn one() -> u32 {
    1
}

/// One interactive item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDef {
    /// Item identifier, unique within the scene.
    pub id: ItemId,
    /// Text shown on the item's info popup.
    #[serde(default)]
    pub info: Option<String>,
    /// How many collect interactions complete the item (collecting phases).
    #[serde(default = "one")]
    pub required: u32,
    /// Slot the item must be placed into (transforming phases).
    #[serde(default)]
    pub slot: Option<SlotId>,
}

/// A phase and the items that complete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDef {
    /// The phase.
    pub phase: Phase,
    /// Items to complete before the phase can advance.
    #[serde(default)]
    pub items: Vec<ItemDef>,
}

/// Condition under which a cue is offered to the coach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueTrigger {
    /// The current phase is the given one.
    EnterPhase(Phase),
    /// Every listed item is done.
    ItemsDone(Vec<ItemId>),
    /// The current phase is the given one and all its items are done.
    PhaseComplete(Phase),
}

/// What to do once a cue's message has closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FollowUp {
    /// Advance one phase, if the scene is still in the phase the message was
    /// shown in.
    AdvancePhase,
    /// Open a popup.
    OpenPopup {
        /// The popup to open.
        popup: PopupTag,
    },
}

fn queued() -> EnqueueMode {
    EnqueueMode::Queued
}

/// A declarative tutor cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueDef {
    /// Cue identifier. The coach message carries the same id.
    pub id: MessageId,
    /// Message text.
    pub text: String,
    /// How long the message stays up.
    pub duration_ms: u64,
    /// Higher is more urgent.
    #[serde(default)]
    pub priority: i32,
    /// Tutor animation.
    #[serde(default)]
    pub animation: Option<String>,
    /// How the message enters the coach.
    #[serde(default = "queued")]
    pub mode: EnqueueMode,
    /// When the cue fires.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub trigger: CueTrigger,
    /// Action run when the message closes.
    #[serde(default)]
    pub then: Option<FollowUp>,
}

impl CueDef {
    /// Builds the coach message for this cue.
    #[must_use]
    pub fn message(&self) -> TutorMessage {
        TutorMessage {
            id: self.id.clone(),
            text: self.text.clone(),
            duration_ms: self.duration_ms,
            priority: self.priority,
            animation: self.animation.clone(),
        }
    }

    /// Returns whether this cue gates the advance out of `phase`.
    #[must_use]
    pub fn closes(&self, phase: Phase) -> bool {
        self.trigger == CueTrigger::PhaseComplete(phase)
            && self.then == Some(FollowUp::AdvancePhase)
    }
}

fn default_max_stars() -> u32 {
    3
}

/// A complete scene definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDefinition {
    /// Zone the scene belongs to.
    pub zone: ZoneId,
    /// Scene identifier within the zone.
    pub scene: SceneId,
    /// Stars awarded on completion.
    #[serde(default = "default_max_stars")]
    pub max_stars: u32,
    /// Phases in progression order.
    pub phases: Vec<PhaseDef>,
    /// Tutor cues.
    #[serde(default)]
    pub cues: Vec<CueDef>,
}

impl SceneDefinition {
    /// Parses and validates a definition from YAML.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidDefinition` if the YAML does not parse or
    /// the definition fails [`validate`](Self::validate).
    pub fn from_yaml(source: &str) -> Result<Self, DomainError> {
        let definition: Self = serde_yaml::from_str(source)
            .map_err(|e| DomainError::InvalidDefinition(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Checks the structural rules every scene must follow.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidDefinition` describing the first rule
    /// broken.
    pub fn validate(&self) -> Result<(), DomainError> {
        let invalid = |reason: String| Err(DomainError::InvalidDefinition(reason));

        if self.phases.is_empty() {
            return invalid("scene has no phases".into());
        }
        for pair in self.phases.windows(2) {
            if pair[0].phase >= pair[1].phase {
                return invalid(format!(
                    "phase {} listed after {}",
                    pair[1].phase, pair[0].phase
                ));
            }
        }
        let last = &self.phases[self.phases.len() - 1];
        if !last.phase.is_terminal() {
            return invalid("scene does not end in all_complete".into());
        }
        if !last.items.is_empty() {
            return invalid("all_complete cannot hold items".into());
        }

        let mut item_ids = HashSet::new();
        for def in &self.phases[..self.phases.len() - 1] {
            if def.items.is_empty() {
                return invalid(format!("phase {} has no items", def.phase));
            }
            for item in &def.items {
                if !item_ids.insert(&item.id) {
                    return invalid(format!("duplicate item id {}", item.id));
                }
                if item.required == 0 {
                    return invalid(format!("item {} requires zero collects", item.id));
                }
                if def.phase == Phase::Transforming && item.slot.is_none() {
                    return invalid(format!("item {} has no slot", item.id));
                }
            }
        }

        let mut cue_ids = HashSet::new();
        for cue in &self.cues {
            if !cue_ids.insert(&cue.id) {
                return invalid(format!("duplicate cue id {}", cue.id));
            }
            match &cue.trigger {
                CueTrigger::EnterPhase(phase) | CueTrigger::PhaseComplete(phase) => {
                    if self.phase_def(*phase).is_none() {
                        return invalid(format!("cue {} names unused phase {phase}", cue.id));
                    }
                }
                CueTrigger::ItemsDone(items) => {
                    if items.is_empty() {
                        return invalid(format!("cue {} waits on no items", cue.id));
                    }
                    if let Some(unknown) = items.iter().find(|id| !item_ids.contains(id)) {
                        return invalid(format!("cue {} names unknown item {unknown}", cue.id));
                    }
                }
            }
            match &cue.then {
                Some(FollowUp::AdvancePhase)
                    if !matches!(cue.trigger, CueTrigger::PhaseComplete(_)) =>
                {
                    return invalid(format!(
                        "cue {} advances without waiting on phase_complete",
                        cue.id
                    ));
                }
                Some(FollowUp::OpenPopup { popup: PopupTag::Finale }) => {
                    return invalid(format!("cue {} opens the finale", cue.id));
                }
                Some(FollowUp::OpenPopup { popup }) if !self.popup_is_known(popup) => {
                    return invalid(format!("cue {} opens an unknown popup", cue.id));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns whether `key` addresses this scene.
    #[must_use]
    pub fn matches(&self, key: &SceneKey) -> bool {
        key.zone_id == self.zone && key.scene_id == self.scene
    }

    /// The phase a fresh session starts in.
    #[must_use]
    pub fn initial_phase(&self) -> Phase {
        self.phases.first().map_or(Phase::AllComplete, |def| def.phase)
    }

    /// The phase after `phase` in this scene.
    #[must_use]
    pub fn next_phase(&self, phase: Phase) -> Option<Phase> {
        let index = self.phases.iter().position(|def| def.phase == phase)?;
        self.phases.get(index + 1).map(|def| def.phase)
    }

    /// Looks up a phase.
    #[must_use]
    pub fn phase_def(&self, phase: Phase) -> Option<&PhaseDef> {
        self.phases.iter().find(|def| def.phase == phase)
    }

    /// Looks up an item in a specific phase.
    #[must_use]
    pub fn item_in_phase(&self, phase: Phase, id: &ItemId) -> Option<&ItemDef> {
        self.phase_def(phase)?.items.iter().find(|item| item.id == *id)
    }

    /// Looks up an item anywhere in the scene, with the phase it belongs to.
    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<(Phase, &ItemDef)> {
        self.phases.iter().find_map(|def| {
            def.items
                .iter()
                .find(|item| item.id == *id)
                .map(|item| (def.phase, item))
        })
    }

    /// Every item with the phase it belongs to, in progression order.
    pub fn items(&self) -> impl Iterator<Item = (Phase, &ItemDef)> {
        self.phases
            .iter()
            .flat_map(|def| def.items.iter().map(move |item| (def.phase, item)))
    }

    /// Looks up a cue.
    #[must_use]
    pub fn cue(&self, id: &MessageId) -> Option<&CueDef> {
        self.cues.iter().find(|cue| cue.id == *id)
    }

    /// The cue that gates the advance out of `phase`, if any.
    #[must_use]
    pub fn closing_cue(&self, phase: Phase) -> Option<&CueDef> {
        self.cues.iter().find(|cue| cue.closes(phase))
    }

    /// Returns whether `popup` refers to something this scene can show.
    #[must_use]
    pub fn popup_is_known(&self, popup: &PopupTag) -> bool {
        match popup {
            PopupTag::Info { item } | PopupTag::RewardCard { item } => self.item(item).is_some(),
            PopupTag::Finale => true,
            PopupTag::Unknown => false,
        }
    }
}
