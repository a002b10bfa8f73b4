use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::{AnimationEngine, OverlayKind, RevealRule, SlotName, TrackSpec};
use crate::error::SequenceError;
use crate::sequence::coordinator::{AnimationCoordinator, FinishPlan, SequenceName, Teardown};

/// Drives the two coordinated jackpot slots.
#[derive(Clone)]
pub struct JackpotController {
    engine: Arc<AnimationEngine>,
    coordinator: Arc<AnimationCoordinator>,
    config: Arc<AppConfig>,
}

impl JackpotController {
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

    /// Play the jackpot celebration with the formatted amount overlay.
    ///
    /// The slots play in series: the right half plays a slow sub-window of
    /// its timeline first, and only its completion activates the left half's
    /// time-scale. The amount overlay stays hidden until the left half's
    /// backdrop attachment appears.
    pub async fn show(&self, amount: String) -> Result<(), SequenceError> {
        let teardown = Teardown {
            hide: vec![SlotName::JackpotLeft, SlotName::JackpotRight],
            clear_tracks: vec![SlotName::JackpotLeft, SlotName::JackpotRight],
            clear_overlays: vec![SlotName::JackpotLeft],
            finish_formula: false,
        };
        let mut run = self
            .coordinator
            .begin(SequenceName::Jackpot, teardown, FinishPlan::default());

        self.engine.set_visible(SlotName::JackpotLeft, true);
        self.engine.set_visible(SlotName::JackpotRight, true);

        let left_done = self.engine.start_track(
            SlotName::JackpotLeft,
            TrackSpec {
                start_time: 0.0,
                time_scale: 0.0,
                end_trim: 0.0,
            },
        );
        let right_done = self.engine.start_track(
            SlotName::JackpotRight,
            TrackSpec::from_start(self.config.jackpot_right_scale),
        );
        self.engine.add_overlay(
            SlotName::JackpotLeft,
            OverlayKind::Amount(amount),
            RevealRule::AttachmentVisible,
        );

        tokio::select! {
            biased;
            _ = run.cancelled() => return Err(SequenceError::Cancelled),
            res = right_done => {
                if res.is_err() {
                    return Err(SequenceError::Cancelled);
                }
            }
        }

        self.engine
            .set_time_scale(SlotName::JackpotLeft, self.config.jackpot_left_fast_forward);

        let result = tokio::select! {
            biased;
            _ = run.cancelled() => Err(SequenceError::Cancelled),
            res = left_done => res.map_err(|_| SequenceError::Cancelled),
        };
        if result.is_ok() {
            self.coordinator.complete(SequenceName::Jackpot, run.id);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::test_catalog;
    use crate::sequence::formula::{FormulaReveal, FormulaTuning};

    const FRAME: f32 = 1.0 / 60.0;

    fn controller() -> (Arc<AnimationEngine>, Arc<AnimationCoordinator>, JackpotController) {
        let engine = Arc::new(AnimationEngine::new(test_catalog()));
        let formula = Arc::new(FormulaReveal::new(engine.clone(), FormulaTuning::default()));
        let coordinator = Arc::new(AnimationCoordinator::new(engine.clone(), formula));
        let config = Arc::new(AppConfig::default());
        let jackpot = JackpotController::new(engine.clone(), coordinator.clone(), config);
        (engine, coordinator, jackpot)
    }

    #[tokio::test]
    async fn left_half_waits_for_the_right_to_complete() {
        let (engine, _coordinator, jackpot) = controller();
        let show = tokio::spawn(async move { jackpot.show("5,000".into()).await });
        tokio::task::yield_now().await;

        assert_eq!(engine.time_scale(SlotName::JackpotLeft), Some(0.0));
        assert_eq!(engine.time_scale(SlotName::JackpotRight), Some(0.3));

        // right native 3.0 at 0.3 completes after 10s
        for _ in 0..60 * 10 + 5 {
            engine.advance(FRAME);
            tokio::task::yield_now().await;
        }
        let left_scale = engine.time_scale(SlotName::JackpotLeft).unwrap();
        assert_eq!(left_scale, 50.0);

        // left native 4.0 at 50x wraps up almost immediately
        for _ in 0..10 {
            engine.advance(FRAME);
            tokio::task::yield_now().await;
        }
        show.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn amount_overlay_gates_on_the_left_attachment() {
        let (engine, _coordinator, jackpot) = controller();
        let show = tokio::spawn(async move { jackpot.show("5,000".into()).await });
        tokio::task::yield_now().await;

        // left frozen at 0; its attachment appears at 1.0s of its timeline
        engine.advance(0.5);
        assert!(!engine.overlay_states(SlotName::JackpotLeft)[0].1);

        for _ in 0..60 * 10 + 10 {
            engine.advance(FRAME);
            tokio::task::yield_now().await;
        }
        show.await.unwrap().unwrap();
        assert!(engine.overlay_states(SlotName::JackpotLeft)[0].1);
    }

    #[tokio::test]
    async fn stop_tears_both_slots_down() {
        let (engine, coordinator, jackpot) = controller();
        let show = tokio::spawn(async move { jackpot.show("5,000".into()).await });
        tokio::task::yield_now().await;

        coordinator.stop(SequenceName::Jackpot);
        assert!(!engine.is_visible(SlotName::JackpotLeft));
        assert!(!engine.is_visible(SlotName::JackpotRight));
        assert!(engine.overlay_states(SlotName::JackpotLeft).is_empty());
        let err = show.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
    }
}
