use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::{AnimationEngine, SlotName, TrackSpec};
use crate::error::SequenceError;
use crate::sequence::coordinator::{
    AnimationCoordinator, FinishPlan, FinishStep, SequenceName, Teardown,
};

/// Drives the burn slot.
#[derive(Clone)]
pub struct BurnController {
    engine: Arc<AnimationEngine>,
    coordinator: Arc<AnimationCoordinator>,
    config: Arc<AppConfig>,
}

impl BurnController {
    /// Build the controller over the shared engine and coordinator.
    pub fn new(
        engine: Arc<AnimationEngine>,
        coordinator: Arc<AnimationCoordinator>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            engine,
            coordinator,
            config,
        }
    }

    /// Play the burn clip over `duration` seconds.
    ///
    /// The clip enters at a calibrated offset and its scaling basis is the
    /// native duration minus a calibrated trim, so the legible middle of the
    /// clip fills the requested wall-clock window. Requires the turn slot to
    /// be visible.
    pub async fn show(&self, duration: f32) -> Result<(), SequenceError> {
        if !self.engine.is_visible(SlotName::Turn) {
            return Err(SequenceError::SlotNotVisible {
                required: SlotName::Turn,
            });
        }

        let mut run = self.coordinator.begin(
            SequenceName::Burn,
            Teardown::for_slot(SlotName::Burn),
            FinishPlan(vec![FinishStep::SpeedTrack {
                slot: SlotName::Burn,
                factor: self.config.finish_fast_forward,
            }]),
        );

        // drop any residue from an interrupted previous burn before starting
        self.engine.set_visible(SlotName::Burn, false);
        self.engine.clear_track(SlotName::Burn);

        let native = self.engine.catalog().slot(SlotName::Burn).duration;
        let scaling_basis = native - self.config.burn_native_trim;
        let done = self.engine.start_track(
            SlotName::Burn,
            TrackSpec {
                start_time: self.config.burn_entry_offset,
                time_scale: scaling_basis / duration,
                end_trim: self.config.burn_tail_trim,
            },
        );
        self.engine.set_visible(SlotName::Burn, true);

        let result = tokio::select! {
            biased;
            _ = run.cancelled() => Err(SequenceError::Cancelled),
            res = done => res.map_err(|_| SequenceError::Cancelled),
        };
        if result.is_ok() {
            self.coordinator.complete(SequenceName::Burn, run.id);
        }
        result
    }
}
