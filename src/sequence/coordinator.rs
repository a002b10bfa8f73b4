use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use uuid::Uuid;

use crate::engine::{AnimationEngine, SlotName};
use crate::sequence::formula::FormulaReveal;

/// Names of the sequence controllers the coordinator can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceName {
    /// Book-opening / idle controller.
    Open,
    /// Page-turn controller.
    Turn,
    /// Win reveal controller.
    Win,
    /// Burn controller.
    Burn,
    /// Jackpot celebration controller.
    Jackpot,
    /// "Place your bet" prompt controller.
    PlaceNextBet,
}

impl SequenceName {
    /// The terminal-ish sequences that supersede each other: entering any of
    /// them first broadcasts cancellation of the others.
    pub const TERMINAL: [SequenceName; 4] = [
        SequenceName::Win,
        SequenceName::Burn,
        SequenceName::PlaceNextBet,
        SequenceName::Jackpot,
    ];
}

impl fmt::Display for SequenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SequenceName::Open => "open",
            SequenceName::Turn => "turn",
            SequenceName::Win => "win",
            SequenceName::Burn => "burn",
            SequenceName::Jackpot => "jackpot",
            SequenceName::PlaceNextBet => "place-next-bet",
        };
        f.write_str(name)
    }
}

/// Engine cleanup applied when a run is stopped.
///
/// Described as data rather than a closure so a stop issued by any other
/// controller performs exactly the owning controller's cleanup without
/// holding a reference to it.
#[derive(Debug, Clone, Default)]
pub struct Teardown {
    /// Slots hidden on stop.
    pub hide: Vec<SlotName>,
    /// Slots whose tracks are cleared on stop.
    pub clear_tracks: Vec<SlotName>,
    /// Slots whose transient overlays are removed on stop.
    pub clear_overlays: Vec<SlotName>,
    /// Whether the formula rail is fast-forwarded and then removed.
    pub finish_formula: bool,
}

impl Teardown {
    /// Teardown covering a single slot.
    pub fn for_slot(slot: SlotName) -> Self {
        Self {
            hide: vec![slot],
            clear_tracks: vec![slot],
            clear_overlays: vec![slot],
            finish_formula: false,
        }
    }
}

/// One step of a fast-forward plan.
#[derive(Debug, Clone)]
pub enum FinishStep {
    /// Multiply a slot track's time-scale by a factor.
    SpeedTrack {
        /// Slot whose track is accelerated.
        slot: SlotName,
        /// Time-scale multiplier.
        factor: f32,
    },
    /// Overwrite a slot track's time-scale with an absolute value.
    ///
    /// Used where the owning show may not have released a frozen track yet,
    /// so a multiplier would be lost against a zero scale.
    SetTimeScale {
        /// Slot whose track is retargeted.
        slot: SlotName,
        /// Absolute time-scale to apply.
        value: f32,
    },
    /// Wait a fixed beat before the next step.
    Beat {
        /// Milliseconds to wait.
        millis: u64,
    },
    /// Jump the formula rail to its final frames.
    FinishFormula,
}

/// Ordered fast-forward steps executed by [`AnimationCoordinator::finish`].
///
/// Fast-forwarding multiplies time-scales instead of cutting playback dead,
/// so the natural completion listener still fires and whatever is chained on
/// completion still runs, just sooner.
#[derive(Debug, Clone, Default)]
pub struct FinishPlan(pub Vec<FinishStep>);

struct ActiveRun {
    id: Uuid,
    cancelled: watch::Sender<bool>,
    teardown: Teardown,
    finish: FinishPlan,
}

/// Cancellation handle held by a controller for one `show` invocation.
pub struct RunGuard {
    /// Identity of this run inside the coordinator's registry.
    pub id: Uuid,
    cancelled: watch::Receiver<bool>,
}

impl RunGuard {
    /// Wait until this run is cancelled. Cancel-safe; never resolves for a
    /// run that completes naturally.
    pub async fn cancelled(&mut self) {
        // a dropped sender also means the run is gone
        let _ = self.cancelled.wait_for(|cancelled| *cancelled).await;
    }

    /// Whether the run has already been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow() || self.cancelled.has_changed().is_err()
    }
}

/// Mediator giving every controller cross-cutting stop/finish access to the
/// others without direct references.
///
/// Holds the process-wide table of in-flight runs, one per sequence name:
/// starting a run replaces (and tears down) any prior run of the same name,
/// which is the abort-and-replace discipline that keeps slot state sane when
/// server events arrive faster than animations complete.
pub struct AnimationCoordinator {
    engine: Arc<AnimationEngine>,
    formula: Arc<FormulaReveal>,
    runs: DashMap<SequenceName, ActiveRun>,
}

impl AnimationCoordinator {
    /// Build the coordinator over the shared engine and formula sequencer.
    pub fn new(engine: Arc<AnimationEngine>, formula: Arc<FormulaReveal>) -> Self {
        Self {
            engine,
            formula,
            runs: DashMap::new(),
        }
    }

    /// Register a new run, cancelling any prior run of the same name first.
    pub fn begin(&self, name: SequenceName, teardown: Teardown, finish: FinishPlan) -> RunGuard {
        self.stop(name);
        let (tx, rx) = watch::channel(false);
        let id = Uuid::new_v4();
        self.runs.insert(
            name,
            ActiveRun {
                id,
                cancelled: tx,
                teardown,
                finish,
            },
        );
        RunGuard { id, cancelled: rx }
    }

    /// Stop a named run: apply its teardown, then reject its waiter.
    ///
    /// Hiding, track clearing, overlay removal and the rejection are all
    /// observable before this call returns. No-op when nothing runs.
    pub fn stop(&self, name: SequenceName) {
        if let Some((_, run)) = self.runs.remove(&name) {
            self.apply_teardown(&run.teardown);
            let _ = run.cancelled.send(true);
        }
    }

    /// Fast-forward a named run through its finish plan.
    ///
    /// Idempotent: a name with no active run is a no-op, and repeating the
    /// call merely re-applies time-scale factors to tracks that are about to
    /// complete anyway.
    pub async fn finish(&self, name: SequenceName) {
        let plan = match self.runs.get(&name) {
            Some(run) => run.finish.clone(),
            None => return,
        };
        for step in plan.0 {
            match step {
                FinishStep::SpeedTrack { slot, factor } => self.engine.scale_track(slot, factor),
                FinishStep::SetTimeScale { slot, value } => self.engine.set_time_scale(slot, value),
                FinishStep::Beat { millis } => {
                    tokio::time::sleep(Duration::from_millis(millis)).await
                }
                FinishStep::FinishFormula => self.formula.finish(),
            }
        }
    }

    /// Unregister a run after natural completion; keeps the entry when a
    /// newer run already took the name.
    pub fn complete(&self, name: SequenceName, id: Uuid) {
        self.runs.remove_if(&name, |_, run| run.id == id);
    }

    /// Whether a run is currently registered under the name.
    pub fn is_active(&self, name: SequenceName) -> bool {
        self.runs.contains_key(&name)
    }

    /// Stop every terminal-ish sequence (win, burn, place-next-bet, jackpot).
    pub fn stop_terminal(&self) {
        for name in SequenceName::TERMINAL {
            self.stop(name);
        }
    }

    fn apply_teardown(&self, teardown: &Teardown) {
        if teardown.finish_formula {
            self.formula.finish();
            self.engine.clear_glyphs();
        }
        for slot in &teardown.hide {
            self.engine.set_visible(*slot, false);
        }
        for slot in &teardown.clear_tracks {
            self.engine.clear_track(*slot);
        }
        for slot in &teardown.clear_overlays {
            self.engine.remove_overlays(*slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::test_catalog;
    use crate::engine::{OverlayKind, RevealRule, SlotName, TrackSpec};

    fn coordinator() -> (Arc<AnimationEngine>, AnimationCoordinator) {
        let engine = Arc::new(AnimationEngine::new(test_catalog()));
        let formula = Arc::new(FormulaReveal::new(engine.clone(), Default::default()));
        let coordinator = AnimationCoordinator::new(engine.clone(), formula);
        (engine, coordinator)
    }

    #[tokio::test]
    async fn stop_hides_clears_and_rejects_in_one_call() {
        let (engine, coordinator) = coordinator();
        let mut run = coordinator.begin(
            SequenceName::Win,
            Teardown::for_slot(SlotName::Win),
            FinishPlan::default(),
        );
        engine.set_visible(SlotName::Win, true);
        engine.start_track(SlotName::Win, TrackSpec::from_start(1.0));
        engine.add_overlay(
            SlotName::Win,
            OverlayKind::Amount("10".into()),
            RevealRule::Immediate,
        );

        coordinator.stop(SequenceName::Win);

        // all four effects are observable immediately after the call
        assert!(!engine.is_visible(SlotName::Win));
        assert!(!engine.has_track(SlotName::Win));
        assert!(engine.overlay_states(SlotName::Win).is_empty());
        assert!(run.is_cancelled());
        run.cancelled().await;
    }

    #[tokio::test]
    async fn begin_replaces_a_prior_run_of_the_same_name() {
        let (_engine, coordinator) = coordinator();
        let first = coordinator.begin(SequenceName::Turn, Teardown::default(), FinishPlan::default());
        let second = coordinator.begin(SequenceName::Turn, Teardown::default(), FinishPlan::default());
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(coordinator.is_active(SequenceName::Turn));
    }

    #[tokio::test]
    async fn complete_only_removes_the_matching_run() {
        let (_engine, coordinator) = coordinator();
        let first = coordinator.begin(SequenceName::Burn, Teardown::default(), FinishPlan::default());
        let stale_id = first.id;
        let _second = coordinator.begin(SequenceName::Burn, Teardown::default(), FinishPlan::default());

        coordinator.complete(SequenceName::Burn, stale_id);
        assert!(coordinator.is_active(SequenceName::Burn));
    }

    #[tokio::test]
    async fn finish_without_an_active_run_is_a_no_op() {
        let (_engine, coordinator) = coordinator();
        coordinator.finish(SequenceName::Win).await;
    }

    #[tokio::test]
    async fn finish_applies_speed_steps_to_the_track() {
        let (engine, coordinator) = coordinator();
        let _run = coordinator.begin(
            SequenceName::Win,
            Teardown::default(),
            FinishPlan(vec![FinishStep::SpeedTrack {
                slot: SlotName::Win,
                factor: 7.0,
            }]),
        );
        engine.start_track(SlotName::Win, TrackSpec::from_start(2.0));
        coordinator.finish(SequenceName::Win).await;
        assert_eq!(engine.time_scale(SlotName::Win), Some(14.0));
    }

    #[tokio::test]
    async fn stop_terminal_covers_all_terminal_sequences() {
        let (_engine, coordinator) = coordinator();
        for name in SequenceName::TERMINAL {
            coordinator.begin(name, Teardown::default(), FinishPlan::default());
        }
        coordinator.stop_terminal();
        for name in SequenceName::TERMINAL {
            assert!(!coordinator.is_active(name));
        }
    }
}
