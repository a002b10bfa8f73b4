//! Animation sequencing core: one coordinator, one formula sequencer and six
//! named controllers sharing the engine handle through a cancellation-aware
//! show/finish/stop protocol.

/// Burn sequence controller.
pub mod burn;
/// Cross-controller stop/finish mediator.
pub mod coordinator;
/// Formula tokenizer and glyph reveal sequencer.
pub mod formula;
/// Jackpot sequence controller.
pub mod jackpot;
/// Book-opening and idle controller.
pub mod open;
/// Next-bet prompt controller.
pub mod place_next_bet;
/// Page-turn controller.
pub mod turn;
/// Win reveal controller.
pub mod win;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::AnimationEngine;

pub use self::coordinator::{AnimationCoordinator, SequenceName};
pub use self::formula::{FormulaReveal, FormulaTuning, GlyphToken, tokenize};

use self::burn::BurnController;
use self::jackpot::JackpotController;
use self::open::OpenController;
use self::place_next_bet::PlaceNextBetController;
use self::turn::TurnController;
use self::win::WinController;

/// The full set of sequence controllers wired over one engine.
#[derive(Clone)]
pub struct Sequences {
    /// Book-opening / idle.
    pub open: OpenController,
    /// Page turn.
    pub turn: TurnController,
    /// Win reveal.
    pub win: WinController,
    /// Burn.
    pub burn: BurnController,
    /// Jackpot celebration.
    pub jackpot: JackpotController,
    /// Next-bet prompt.
    pub place_next_bet: PlaceNextBetController,
}

impl Sequences {
    /// Wire every controller over the shared engine, coordinator, formula
    /// sequencer and calibration set.
    pub fn new(
        engine: Arc<AnimationEngine>,
        coordinator: Arc<AnimationCoordinator>,
        formula: Arc<FormulaReveal>,
        config: Arc<AppConfig>,
    ) -> Self {
        let turn = TurnController::new(engine.clone(), coordinator.clone(), config.clone());
        Self {
            open: OpenController::new(engine.clone(), coordinator.clone(), config.clone()),
            win: WinController::new(
                engine.clone(),
                coordinator.clone(),
                formula,
                config.clone(),
            ),
            burn: BurnController::new(engine.clone(), coordinator.clone(), config.clone()),
            jackpot: JackpotController::new(engine.clone(), coordinator.clone(), config.clone()),
            place_next_bet: PlaceNextBetController::new(
                engine,
                coordinator,
                turn.clone(),
                config,
            ),
            turn,
        }
    }
}
