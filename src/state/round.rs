use thiserror::Error;

/// High-level phase of the round currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No round in flight; the book idles open.
    NoGame,
    /// The book-opening sequence plays (first round of the session).
    Opening,
    /// A page turn is in progress.
    Turning,
    /// The win reveal (formula plus amount) is on screen.
    Revealing,
    /// The round burned and the burn sequence plays.
    Burning,
    /// The round settled by cash-out.
    CashedOut,
    /// The jackpot celebration plays.
    Jackpot,
    /// The "place your bet" prompt plays.
    PlacingNextBet,
}

/// Events that can be applied to the round state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// A round starts with the book-opening sequence.
    OpenBook,
    /// A page turn begins, either at round start or after a reveal.
    TurnPage,
    /// The win reveal begins.
    Reveal,
    /// The round burned.
    Burn,
    /// The player cashed out.
    CashOut,
    /// The round hit the jackpot.
    JackpotHit,
    /// The next-bet prompt begins after a terminal sequence.
    PromptNextBet,
    /// The round is fully torn down.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the tracker was in when the invalid event was received.
    pub from: RoundPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoundEvent,
}

/// State machine tracking the visual flow of one round.
///
/// The router owns one tracker and consults it synchronously when gating
/// outbound calls; sequence chains apply transitions as they progress. The
/// version increments on every applied transition, including forced resets.
#[derive(Debug, Clone)]
pub struct RoundTracker {
    phase: RoundPhase,
    version: usize,
}

impl Default for RoundTracker {
    fn default() -> Self {
        Self {
            phase: RoundPhase::NoGame,
            version: 0,
        }
    }
}

impl RoundTracker {
    /// Fresh tracker in the no-game phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Number of applied transitions.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Whether a round is visually in flight.
    pub fn round_active(&self) -> bool {
        matches!(
            self.phase,
            RoundPhase::Opening | RoundPhase::Turning | RoundPhase::Revealing
        )
    }

    /// Apply an event, returning the next phase.
    pub fn apply(&mut self, event: RoundEvent) -> Result<RoundPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    /// Drop whatever was in flight and return to the no-game phase.
    ///
    /// Used by the router when a sequencing contract was violated and local
    /// state can no longer be trusted.
    pub fn force_reset(&mut self) {
        self.phase = RoundPhase::NoGame;
        self.version += 1;
    }

    fn compute_transition(&self, event: RoundEvent) -> Result<RoundPhase, InvalidTransition> {
        use RoundEvent as E;
        use RoundPhase as P;

        let next = match (self.phase, event) {
            (P::NoGame, E::OpenBook) => P::Opening,
            (P::NoGame | P::Opening | P::Revealing | P::PlacingNextBet, E::TurnPage) => P::Turning,
            (P::Turning, E::Reveal) => P::Revealing,
            (P::Turning | P::Revealing, E::Burn) => P::Burning,
            (P::Opening | P::Turning | P::Revealing, E::CashOut) => P::CashedOut,
            (P::Opening | P::Turning | P::Revealing, E::JackpotHit) => P::Jackpot,
            (P::Burning | P::CashedOut | P::Jackpot, E::PromptNextBet) => P::PlacingNextBet,
            (_, E::Reset) => P::NoGame,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(tracker: &mut RoundTracker, event: RoundEvent) -> RoundPhase {
        tracker.apply(event).unwrap()
    }

    #[test]
    fn initial_phase_is_no_game() {
        let tracker = RoundTracker::new();
        assert_eq!(tracker.phase(), RoundPhase::NoGame);
        assert!(!tracker.round_active());
    }

    #[test]
    fn full_burn_path_through_a_round() {
        let mut tracker = RoundTracker::new();
        assert_eq!(apply(&mut tracker, RoundEvent::OpenBook), RoundPhase::Opening);
        assert_eq!(apply(&mut tracker, RoundEvent::TurnPage), RoundPhase::Turning);
        assert_eq!(apply(&mut tracker, RoundEvent::Reveal), RoundPhase::Revealing);
        // further page turns loop between turning and revealing
        assert_eq!(apply(&mut tracker, RoundEvent::TurnPage), RoundPhase::Turning);
        assert_eq!(apply(&mut tracker, RoundEvent::Reveal), RoundPhase::Revealing);
        assert_eq!(apply(&mut tracker, RoundEvent::Burn), RoundPhase::Burning);
        assert_eq!(
            apply(&mut tracker, RoundEvent::PromptNextBet),
            RoundPhase::PlacingNextBet
        );
        assert_eq!(apply(&mut tracker, RoundEvent::Reset), RoundPhase::NoGame);
        assert_eq!(tracker.version(), 8);
    }

    #[test]
    fn cash_out_settles_from_any_active_phase() {
        for warmup in [
            vec![RoundEvent::OpenBook],
            vec![RoundEvent::TurnPage],
            vec![RoundEvent::TurnPage, RoundEvent::Reveal],
        ] {
            let mut tracker = RoundTracker::new();
            for event in warmup {
                apply(&mut tracker, event);
            }
            assert_eq!(apply(&mut tracker, RoundEvent::CashOut), RoundPhase::CashedOut);
        }
    }

    #[test]
    fn later_rounds_skip_the_opening() {
        let mut tracker = RoundTracker::new();
        assert_eq!(apply(&mut tracker, RoundEvent::TurnPage), RoundPhase::Turning);
        assert!(tracker.round_active());
    }

    #[test]
    fn prompt_flows_back_into_the_next_round() {
        let mut tracker = RoundTracker::new();
        apply(&mut tracker, RoundEvent::TurnPage);
        apply(&mut tracker, RoundEvent::Reveal);
        apply(&mut tracker, RoundEvent::CashOut);
        apply(&mut tracker, RoundEvent::PromptNextBet);
        // next round starts with a page turn straight from the prompt
        assert_eq!(apply(&mut tracker, RoundEvent::TurnPage), RoundPhase::Turning);
    }

    #[test]
    fn invalid_transition_reports_phase_and_event() {
        let mut tracker = RoundTracker::new();
        let err = tracker.apply(RoundEvent::Reveal).unwrap_err();
        assert_eq!(err.from, RoundPhase::NoGame);
        assert_eq!(err.event, RoundEvent::Reveal);
        assert_eq!(tracker.version(), 0);
    }

    #[test]
    fn force_reset_returns_to_no_game_from_anywhere() {
        let mut tracker = RoundTracker::new();
        apply(&mut tracker, RoundEvent::TurnPage);
        tracker.force_reset();
        assert_eq!(tracker.phase(), RoundPhase::NoGame);
        assert_eq!(tracker.version(), 2);
    }
}
