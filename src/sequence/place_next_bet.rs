use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::{AnimationEngine, OverlayKind, RevealRule, SlotName};
use crate::error::SequenceError;
use crate::sequence::coordinator::{AnimationCoordinator, FinishPlan, SequenceName, Teardown};
use crate::sequence::turn::TurnController;

/// Text shown by the next-bet prompt overlay.
const PROMPT_TEXT: &str = "Place your bet";

/// Plays a page turn and drops the "place your bet" prompt onto it.
#[derive(Clone)]
pub struct PlaceNextBetController {
    engine: Arc<AnimationEngine>,
    coordinator: Arc<AnimationCoordinator>,
    turn: TurnController,
    config: Arc<AppConfig>,
}

impl PlaceNextBetController {
    /// Build the controller over the shared engine, coordinator and the turn
    /// controller it delegates to.
    pub fn new(
        engine: Arc<AnimationEngine>,
        coordinator: Arc<AnimationCoordinator>,
        turn: TurnController,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            engine,
            coordinator,
            turn,
            config,
        }
    }

    /// Play the prompt sequence over `duration` seconds.
    ///
    /// The leading fraction goes to a page turn; the prompt text then drops
    /// in over the remainder. Requires the turn slot to be visible.
    pub async fn show(&self, duration: f32) -> Result<(), SequenceError> {
        if !self.engine.is_visible(SlotName::Turn) {
            return Err(SequenceError::SlotNotVisible {
                required: SlotName::Turn,
            });
        }

        let teardown = Teardown {
            hide: Vec::new(),
            clear_tracks: Vec::new(),
            clear_overlays: vec![SlotName::Turn],
            finish_formula: false,
        };
        let mut run =
            self.coordinator
                .begin(SequenceName::PlaceNextBet, teardown, FinishPlan::default());

        let turn_share = duration * self.config.place_next_bet_turn_ratio;
        let turn = self.turn.show(turn_share);
        tokio::select! {
            biased;
            _ = run.cancelled() => return Err(SequenceError::Cancelled),
            res = turn => res?,
        }
        if run.is_cancelled() {
            return Err(SequenceError::Cancelled);
        }

        let drop_duration = duration - turn_share;
        let landed = self
            .engine
            .add_overlay(
                SlotName::Turn,
                OverlayKind::BetPrompt(PROMPT_TEXT.into()),
                RevealRule::TimedDrop {
                    duration: drop_duration,
                },
            )
            .ok_or(SequenceError::EngineNotReady(
                "prompt overlay rejected".into(),
            ))?;

        let result = tokio::select! {
            biased;
            _ = run.cancelled() => Err(SequenceError::Cancelled),
            res = landed => res.map_err(|_| SequenceError::Cancelled),
        };
        if result.is_ok() {
            self.coordinator
                .complete(SequenceName::PlaceNextBet, run.id);
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

    fn controller() -> (
        Arc<AnimationEngine>,
        Arc<AnimationCoordinator>,
        PlaceNextBetController,
    ) {
        let engine = Arc::new(AnimationEngine::new(test_catalog()));
        let formula = Arc::new(FormulaReveal::new(engine.clone(), FormulaTuning::default()));
        let coordinator = Arc::new(AnimationCoordinator::new(engine.clone(), formula));
        let config = Arc::new(AppConfig::default());
        let turn = TurnController::new(engine.clone(), coordinator.clone(), config.clone());
        let prompt = PlaceNextBetController::new(engine.clone(), coordinator.clone(), turn, config);
        (engine, coordinator, prompt)
    }

    #[tokio::test]
    async fn show_requires_the_turn_slot_visible() {
        let (_engine, _coordinator, prompt) = controller();
        let err = prompt.show(1.5).await.unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[tokio::test]
    async fn prompt_drops_after_the_turn_completes() {
        let (engine, _coordinator, prompt) = controller();
        engine.set_visible(SlotName::Turn, true);
        let show = tokio::spawn(async move { prompt.show(1.5).await });
        tokio::task::yield_now().await;

        assert!(engine.overlay_states(SlotName::Turn).is_empty());

        // the delegated turn takes about 0.84s (1.05s minus the tail trim)
        for _ in 0..60 * 3 {
            engine.advance(FRAME);
            tokio::task::yield_now().await;
        }
        show.await.unwrap().unwrap();
        let overlays = engine.overlay_states(SlotName::Turn);
        assert_eq!(overlays.len(), 1);
        assert!(matches!(overlays[0].0, OverlayKind::BetPrompt(_)));
    }

    #[tokio::test]
    async fn stop_rejects_and_removes_the_prompt() {
        let (engine, coordinator, prompt) = controller();
        engine.set_visible(SlotName::Turn, true);
        let show = tokio::spawn(async move { prompt.show(1.5).await });
        tokio::task::yield_now().await;

        coordinator.stop(SequenceName::PlaceNextBet);
        let err = show.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert!(engine.overlay_states(SlotName::Turn).is_empty());
    }
}
