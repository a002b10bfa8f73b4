use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::{AnimationEngine, IdleBounds, SlotName, TrackSpec};
use crate::error::SequenceError;
use crate::sequence::coordinator::{AnimationCoordinator, FinishPlan, SequenceName, Teardown};

/// Drives the book-opening slot, including the perpetual breathing idle.
#[derive(Clone)]
pub struct OpenController {
    engine: Arc<AnimationEngine>,
    coordinator: Arc<AnimationCoordinator>,
    config: Arc<AppConfig>,
}

impl OpenController {
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

    /// Install the idle mode: the open slot oscillates its play-head between
    /// the calibrated bounds indefinitely.
    ///
    /// Unlike a timed show this never completes; the oscillation is exited
    /// only by a subsequent timed show on the same slot.
    pub fn show_idle(&self) {
        self.prepare();
        self.engine.start_idle(
            SlotName::Open,
            IdleBounds {
                min: self.config.idle_min,
                max: self.config.idle_max,
                speed: self.config.idle_speed,
            },
        );
    }

    /// Play the book-opening clip once over `duration` seconds.
    pub async fn show(&self, duration: f32) -> Result<(), SequenceError> {
        self.prepare();
        let mut run = self.coordinator.begin(
            SequenceName::Open,
            Teardown::for_slot(SlotName::Open),
            FinishPlan::default(),
        );

        let native = self.engine.catalog().slot(SlotName::Open).duration;
        let done = self
            .engine
            .start_track(SlotName::Open, TrackSpec::from_start(native / duration));

        let result = tokio::select! {
            biased;
            _ = run.cancelled() => Err(SequenceError::Cancelled),
            res = done => res.map_err(|_| SequenceError::Cancelled),
        };
        if result.is_ok() {
            self.coordinator.complete(SequenceName::Open, run.id);
        }
        result
    }

    /// Stop superseded sequences and bring the open slot to the front.
    fn prepare(&self) {
        self.coordinator.stop(SequenceName::Burn);
        self.coordinator.stop(SequenceName::Win);
        self.coordinator.stop(SequenceName::Open);
        self.engine.hide_all_slots();
        self.engine.set_visible(SlotName::Open, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::test_catalog;
    use crate::sequence::formula::{FormulaReveal, FormulaTuning};

    const FRAME: f32 = 1.0 / 60.0;

    fn controller() -> (Arc<AnimationEngine>, OpenController) {
        let engine = Arc::new(AnimationEngine::new(test_catalog()));
        let formula = Arc::new(FormulaReveal::new(engine.clone(), FormulaTuning::default()));
        let coordinator = Arc::new(AnimationCoordinator::new(engine.clone(), formula));
        let config = Arc::new(AppConfig::default());
        (engine.clone(), OpenController::new(engine, coordinator, config))
    }

    #[tokio::test]
    async fn idle_keeps_the_play_head_inside_bounds() {
        let (engine, open) = controller();
        open.show_idle();
        assert!(engine.is_visible(SlotName::Open));
        for _ in 0..60 * 10 {
            engine.advance(FRAME);
            let time = engine.track_time(SlotName::Open).unwrap();
            assert!((0.01..=0.3).contains(&time));
        }
        assert!(engine.idle_active(SlotName::Open));
    }

    #[tokio::test]
    async fn timed_show_removes_the_idle_oscillation() {
        let (engine, open) = controller();
        open.show_idle();
        for _ in 0..30 {
            engine.advance(FRAME);
        }

        let show = tokio::spawn(async move { open.show(0.5).await });
        tokio::task::yield_now().await;
        assert!(!engine.idle_active(SlotName::Open));

        for _ in 0..60 {
            engine.advance(FRAME);
            tokio::task::yield_now().await;
        }
        show.await.unwrap().unwrap();
        // the play-head is free to travel past the idle upper bound now
        assert!(!engine.has_track(SlotName::Open));
    }

    #[tokio::test]
    async fn timed_show_scales_to_the_requested_duration() {
        let (engine, open) = controller();
        let native = engine.catalog().slot(SlotName::Open).duration;
        let open_clone = open.clone();
        let show = tokio::spawn(async move { open_clone.show(2.5).await });
        tokio::task::yield_now().await;
        let scale = engine.time_scale(SlotName::Open).unwrap();
        assert!((scale - native / 2.5).abs() < 1e-6);
        for _ in 0..60 * 3 {
            engine.advance(FRAME);
            tokio::task::yield_now().await;
        }
        show.await.unwrap().unwrap();
    }
}
