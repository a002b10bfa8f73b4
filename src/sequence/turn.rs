use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::{AnimationEngine, SlotName, TrackSpec};
use crate::error::SequenceError;
use crate::sequence::coordinator::{AnimationCoordinator, FinishPlan, SequenceName, Teardown};

/// Drives the page-turn slot.
#[derive(Clone)]
pub struct TurnController {
    engine: Arc<AnimationEngine>,
    coordinator: Arc<AnimationCoordinator>,
    config: Arc<AppConfig>,
}

impl TurnController {
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

    /// Play one page turn over `duration` seconds.
    ///
    /// A turn that is already mid-flight is not stacked: the existing track
    /// is fast-forwarded instead and this call resolves on its completion,
    /// so anything chained on the turn still runs exactly once.
    pub async fn show(&self, duration: f32) -> Result<(), SequenceError> {
        if self.coordinator.is_active(SequenceName::Turn)
            && self.engine.has_track(SlotName::Turn)
        {
            self.engine
                .scale_track(SlotName::Turn, self.config.turn_retarget_factor);
            if let Some(done) = self.engine.watch_track(SlotName::Turn) {
                return done.await.map_err(|_| SequenceError::Cancelled);
            }
            return Ok(());
        }

        let mut run = self.coordinator.begin(
            SequenceName::Turn,
            Teardown::for_slot(SlotName::Turn),
            FinishPlan::default(),
        );
        self.engine.remove_overlays(SlotName::Turn);
        self.engine.hide_all_slots();
        self.engine.set_visible(SlotName::Turn, true);

        let native = self.engine.catalog().slot(SlotName::Turn).duration;
        let done = self.engine.start_track(
            SlotName::Turn,
            TrackSpec {
                start_time: 0.0,
                time_scale: native / duration,
                end_trim: self.config.turn_tail_trim,
            },
        );

        let result = tokio::select! {
            biased;
            _ = run.cancelled() => Err(SequenceError::Cancelled),
            res = done => res.map_err(|_| SequenceError::Cancelled),
        };
        if result.is_ok() {
            self.coordinator.complete(SequenceName::Turn, run.id);
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

    fn controller() -> (Arc<AnimationEngine>, Arc<AnimationCoordinator>, TurnController) {
        let engine = Arc::new(AnimationEngine::new(test_catalog()));
        let formula = Arc::new(FormulaReveal::new(engine.clone(), FormulaTuning::default()));
        let coordinator = Arc::new(AnimationCoordinator::new(engine.clone(), formula));
        let config = Arc::new(AppConfig::default());
        let turn = TurnController::new(engine.clone(), coordinator.clone(), config);
        (engine, coordinator, turn)
    }

    #[tokio::test]
    async fn show_scales_and_trims_the_track() {
        let (engine, _coordinator, turn) = controller();
        let native = engine.catalog().slot(SlotName::Turn).duration;
        let turn_clone = turn.clone();
        let show = tokio::spawn(async move { turn_clone.show(1.0).await });
        tokio::task::yield_now().await;

        assert!(engine.is_visible(SlotName::Turn));
        let scale = engine.time_scale(SlotName::Turn).unwrap();
        assert!((scale - native).abs() < 1e-6);

        for _ in 0..70 {
            engine.advance(FRAME);
            tokio::task::yield_now().await;
        }
        show.await.unwrap().unwrap();
        assert!(!engine.has_track(SlotName::Turn));
    }

    #[tokio::test]
    async fn second_show_fast_forwards_instead_of_stacking() {
        let (engine, _coordinator, turn) = controller();
        let first_turn = turn.clone();
        let first = tokio::spawn(async move { first_turn.show(10.0).await });
        tokio::task::yield_now().await;
        let original_scale = engine.time_scale(SlotName::Turn).unwrap();

        let second_turn = turn.clone();
        let second = tokio::spawn(async move { second_turn.show(10.0).await });
        tokio::task::yield_now().await;

        let boosted = engine.time_scale(SlotName::Turn).unwrap();
        assert!((boosted - original_scale * 5.0).abs() < 1e-4);

        for _ in 0..200 {
            engine.advance(FRAME);
            tokio::task::yield_now().await;
        }
        // both callers observe the single completion
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn stopping_the_turn_rejects_the_waiter_and_cleans_up() {
        let (engine, coordinator, turn) = controller();
        let turn_clone = turn.clone();
        let show = tokio::spawn(async move { turn_clone.show(5.0).await });
        tokio::task::yield_now().await;
        assert!(engine.is_visible(SlotName::Turn));

        coordinator.stop(SequenceName::Turn);
        let err = show.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert!(!engine.is_visible(SlotName::Turn));
        assert!(!engine.has_track(SlotName::Turn));
    }
}
