use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::{AnimationEngine, OverlayKind, RevealRule, SlotName, TrackSpec};
use crate::error::SequenceError;
use crate::sequence::coordinator::{
    AnimationCoordinator, FinishPlan, FinishStep, SequenceName, Teardown,
};
use crate::sequence::formula::{FormulaReveal, GlyphToken};

/// Drives the win reveal: formula glyphs leading, skeletal playback behind,
/// amount and title overlays gated on the backdrop attachment.
#[derive(Clone)]
pub struct WinController {
    engine: Arc<AnimationEngine>,
    coordinator: Arc<AnimationCoordinator>,
    formula: Arc<FormulaReveal>,
    config: Arc<AppConfig>,
}

impl WinController {
    /// Build the controller over the shared engine, coordinator and sequencer.
    pub fn new(
        engine: Arc<AnimationEngine>,
        coordinator: Arc<AnimationCoordinator>,
        formula: Arc<FormulaReveal>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            engine,
            coordinator,
            formula,
            config,
        }
    }

    /// Play the win reveal over `duration` seconds.
    ///
    /// The duration is split: `win_reveal_ratio` of it goes to the formula
    /// reveal, the remainder to the skeletal clip, whose time-scale stays at
    /// zero (frozen on the lead frame) until the reveal completes. Requires
    /// the turn slot to be visible; violating that is a sequencing-contract
    /// error, not a recoverable runtime condition.
    pub async fn show(
        &self,
        duration: f32,
        tokens: &[GlyphToken],
        amount: String,
    ) -> Result<(), SequenceError> {
        if !self.engine.is_visible(SlotName::Turn) {
            return Err(SequenceError::SlotNotVisible {
                required: SlotName::Turn,
            });
        }

        let native = self.engine.catalog().slot(SlotName::Win).duration;
        let formula_duration = duration * self.config.win_reveal_ratio;
        let spine_duration = duration - formula_duration;
        let animation_end = native - self.config.win_tail_trim;
        let release_scale = (animation_end - self.config.win_lead_offset) / spine_duration;

        let teardown = Teardown {
            hide: vec![SlotName::Win, SlotName::Burn],
            clear_tracks: vec![SlotName::Win],
            clear_overlays: vec![SlotName::Win],
            finish_formula: true,
        };
        // the fast-forward writes an absolute scale because the show task may
        // not have released the frozen track yet when finish() runs
        let finish = FinishPlan(vec![
            FinishStep::SpeedTrack {
                slot: SlotName::Turn,
                factor: self.config.finish_fast_forward,
            },
            FinishStep::Beat {
                millis: self.config.finish_turn_beat_ms,
            },
            FinishStep::FinishFormula,
            FinishStep::SetTimeScale {
                slot: SlotName::Win,
                value: release_scale * self.config.finish_fast_forward,
            },
        ]);
        let mut run = self.coordinator.begin(SequenceName::Win, teardown, finish);

        // a completed prior reveal leaves its overlays behind; start clean
        self.engine.remove_overlays(SlotName::Win);
        self.engine.set_visible(SlotName::Win, true);
        let done = self.engine.start_track(
            SlotName::Win,
            TrackSpec {
                start_time: self.config.win_lead_offset,
                time_scale: 0.0,
                end_trim: self.config.win_tail_trim,
            },
        );
        self.engine
            .add_overlay(SlotName::Win, OverlayKind::Title, RevealRule::AttachmentVisible);
        self.engine.add_overlay(
            SlotName::Win,
            OverlayKind::Amount(amount),
            RevealRule::AttachmentVisible,
        );

        // the formula visually leads; run it to completion before releasing
        // the frozen skeletal track
        let reveal = self.formula.show(SlotName::Win, tokens, formula_duration);
        tokio::select! {
            biased;
            _ = run.cancelled() => return Err(SequenceError::Cancelled),
            res = reveal => res?,
        }
        if run.is_cancelled() {
            return Err(SequenceError::Cancelled);
        }

        // no-op when a finish() fast-forward already retargeted the track
        self.engine.finalize_time_scale(SlotName::Win, release_scale);

        let result = tokio::select! {
            biased;
            _ = run.cancelled() => Err(SequenceError::Cancelled),
            res = done => res.map_err(|_| SequenceError::Cancelled),
        };
        if result.is_ok() {
            self.coordinator.complete(SequenceName::Win, run.id);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::test_catalog;
    use crate::sequence::formula::{FormulaTuning, tokenize};

    const FRAME: f32 = 1.0 / 60.0;

    struct Rig {
        engine: Arc<AnimationEngine>,
        coordinator: Arc<AnimationCoordinator>,
        win: WinController,
    }

    fn rig() -> Rig {
        let engine = Arc::new(AnimationEngine::new(test_catalog()));
        let formula = Arc::new(FormulaReveal::new(engine.clone(), FormulaTuning::default()));
        let coordinator = Arc::new(AnimationCoordinator::new(engine.clone(), formula.clone()));
        let config = Arc::new(AppConfig::default());
        let win = WinController::new(engine.clone(), coordinator.clone(), formula, config);
        Rig {
            engine,
            coordinator,
            win,
        }
    }

    async fn drive(engine: &Arc<AnimationEngine>, frames: u32) {
        for _ in 0..frames {
            engine.advance(FRAME);
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn show_requires_the_turn_slot_visible() {
        let rig = rig();
        let err = rig
            .win
            .show(5.0, &tokenize("1+2=3"), "10".into())
            .await
            .unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[tokio::test]
    async fn skeletal_track_stays_frozen_until_the_reveal_completes() {
        let rig = rig();
        rig.engine.set_visible(SlotName::Turn, true);
        let win = rig.win.clone();
        let show =
            tokio::spawn(async move { win.show(5.0, &tokenize("1+2=3"), "10".into()).await });
        tokio::task::yield_now().await;

        assert_eq!(rig.engine.time_scale(SlotName::Win), Some(0.0));

        // formula gets 1.5s of the 5s; drive past it
        drive(&rig.engine, 100).await;
        let scale = rig.engine.time_scale(SlotName::Win).unwrap();
        assert!(scale > 0.0, "time-scale finalized after the reveal");

        // (13.2 - 6.6) clip seconds at that scale fill the remaining 3.5s
        drive(&rig.engine, 60 * 4).await;
        show.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn amount_overlay_reveals_only_with_the_attachment() {
        let rig = rig();
        rig.engine.set_visible(SlotName::Turn, true);
        let win = rig.win.clone();
        let show =
            tokio::spawn(async move { win.show(2.0, &tokenize("1+2=3"), "10".into()).await });
        tokio::task::yield_now().await;

        // frozen at the 6.6s lead; the attachment appears at 7.0s
        assert!(rig.engine.overlay_states(SlotName::Win).iter().all(|(_, v)| !v));

        drive(&rig.engine, 60 * 3).await;
        show.await.unwrap().unwrap();
        assert!(rig.engine.overlay_states(SlotName::Win).iter().all(|(_, v)| *v));
    }

    #[tokio::test]
    async fn superseding_show_rejects_the_first_with_cancellation() {
        let rig = rig();
        rig.engine.set_visible(SlotName::Turn, true);
        let first_win = rig.win.clone();
        let first = tokio::spawn(async move {
            first_win.show(5.0, &tokenize("1+2=3"), "10".into()).await
        });
        tokio::task::yield_now().await;
        drive(&rig.engine, 5).await;

        let second_win = rig.win.clone();
        let second = tokio::spawn(async move {
            second_win.show(2.0, &tokenize("9"), "99".into()).await
        });
        tokio::task::yield_now().await;

        let err = first.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());

        drive(&rig.engine, 60 * 3).await;
        second.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn finish_preserves_the_completion_path() {
        let rig = rig();
        rig.engine.set_visible(SlotName::Turn, true);
        let win = rig.win.clone();
        let show =
            tokio::spawn(async move { win.show(30.0, &tokenize("1+2=3"), "10".into()).await });
        tokio::task::yield_now().await;
        drive(&rig.engine, 10).await;

        let coordinator = rig.coordinator.clone();
        let finish = tokio::spawn(async move { coordinator.finish(SequenceName::Win).await });

        // keep frames flowing while finish sleeps through its fixed beat
        for _ in 0..60 * 10 {
            rig.engine.advance(FRAME);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            if show.is_finished() {
                break;
            }
        }
        finish.await.unwrap();
        show.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn stop_rejects_and_clears_overlays() {
        let rig = rig();
        rig.engine.set_visible(SlotName::Turn, true);
        let win = rig.win.clone();
        let show =
            tokio::spawn(async move { win.show(5.0, &tokenize("1+2=3"), "10".into()).await });
        tokio::task::yield_now().await;
        drive(&rig.engine, 5).await;

        rig.coordinator.stop(SequenceName::Win);
        assert!(!rig.engine.is_visible(SlotName::Win));
        assert!(rig.engine.overlay_states(SlotName::Win).is_empty());
        assert_eq!(rig.engine.glyph_count(), 0);
        let err = show.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
    }
}
