//! Scripted replays on a simulated clock.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use sprout_core::clock::Clock;
use sprout_core::timer::millis;
use sprout_scene::application::engine::SceneEngine;
use sprout_scene::application::reconciler::ResumeBranch;
use sprout_scene::domain::definition::Phase;
use sprout_scene::domain::signals::SceneSignal;

use crate::driver::Driver;
use crate::error::CliError;
use crate::script::{ReplayScript, ScriptStep};

/// Longest single `wait_ms` step; longer waits are cut to this.
pub const MAX_WAIT_MS: u64 = 24 * 60 * 60 * 1_000;

/// Clock that only moves when the replay advances it.
#[derive(Debug)]
pub struct ReplayClock {
    start: DateTime<Utc>,
    now: Mutex<DateTime<Utc>>,
}

impl ReplayClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Milliseconds since the replay started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        (self.now() - self.start).num_milliseconds()
    }
}

impl Clock for ReplayClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A signal stamped with the replay time it was collected at.
#[derive(Debug, Clone, Serialize)]
pub struct TimedSignal {
    /// Milliseconds since the replay started.
    pub at_ms: i64,
    /// The signal.
    pub event: SceneSignal,
}

/// Where a replay ended up.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    /// Final phase.
    pub phase: Phase,
    /// Stars awarded.
    pub stars: u32,
    /// Progress toward completion.
    pub progress_percent: u8,
    /// Whether the scene was completed.
    pub completed: bool,
    /// Reconciler branch taken by each open that resumed.
    pub resumes: Vec<ResumeBranch>,
}

/// Everything a replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Signals in emission order.
    pub signals: Vec<TimedSignal>,
    /// Final state.
    pub summary: ReplaySummary,
}

struct Replay<'a> {
    driver: &'a Driver,
    clock: Arc<ReplayClock>,
    signals: Vec<TimedSignal>,
    resumes: Vec<ResumeBranch>,
}

impl Replay<'_> {
    fn open(&mut self) -> Result<SceneEngine, CliError> {
        let mut engine = self.driver.open(self.clock.clone())?;
        self.resumes.extend(engine.last_resume());
        self.collect(&mut engine);
        Ok(engine)
    }

    fn collect(&mut self, engine: &mut SceneEngine) {
        let at_ms = self.clock.elapsed_ms();
        self.signals.extend(
            engine
                .take_signals()
                .into_iter()
                .map(|event| TimedSignal { at_ms, event }),
        );
    }
}

/// Runs `script` against the driver's scene, starting the clock at `start`.
///
/// # Errors
///
/// Fails only if the scene cannot be opened; ignored inputs are reported as
/// nudge signals.
pub fn replay(
    driver: &Driver,
    script: &ReplayScript,
    start: DateTime<Utc>,
) -> Result<ReplayReport, CliError> {
    let mut replay = Replay {
        driver,
        clock: Arc::new(ReplayClock::new(start)),
        signals: Vec::new(),
        resumes: Vec::new(),
    };
    let mut engine = replay.open()?;

    for (index, step) in script.steps.iter().enumerate() {
        tracing::debug!(index, ?step, "replay step");
        match step {
            ScriptStep::WaitMs(ms) => {
                if *ms > MAX_WAIT_MS {
                    tracing::warn!(index, requested = *ms, applied = MAX_WAIT_MS, "wait clamped");
                }
                replay.clock.advance(millis((*ms).min(MAX_WAIT_MS)));
                engine.pump();
            }
            ScriptStep::Reopen => {
                engine.teardown();
                replay.collect(&mut engine);
                drop(engine);
                engine = replay.open()?;
            }
            step => {
                if let Some(input) = step.input() {
                    engine.handle(input);
                }
            }
        }
        replay.collect(&mut engine);
    }

    engine.teardown();
    replay.collect(&mut engine);
    let session = engine.session();
    let summary = ReplaySummary {
        phase: session.phase,
        stars: session.stars,
        progress_percent: session.progress_percent,
        completed: session.completed,
        resumes: replay.resumes,
    };
    tracing::info!(phase = %summary.phase, steps = script.steps.len(), "replay finished");
    Ok(ReplayReport {
        signals: replay.signals,
        summary,
    })
}

