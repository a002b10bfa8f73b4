use crate::dto::game::{AutoPlayOptions, GameDetails, LeaderboardEntry, UserProfile};

/// Default wall-clock durations for the three headline sequences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTimings {
    /// Seconds the book-opening plays.
    pub open: f32,
    /// Seconds the win reveal plays.
    pub win: f32,
    /// Seconds the burn plays.
    pub burn: f32,
}

/// Reducer-owned session state.
///
/// Every field update goes through [`GameSessionState::apply`]; nothing else
/// mutates the store. `game` is `None` exactly when no round is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSessionState {
    /// Player identity from the launch URL.
    pub player_id: u64,
    /// Operator identity from the launch URL.
    pub provider_id: u64,
    /// Connected player's profile, absent until `GameData` arrives.
    pub user: Option<UserProfile>,
    /// Current leaderboard, absent until the first push.
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
    /// Round currently in flight.
    pub game: Option<GameDetails>,
    /// Previous round, kept for continuity decisions.
    pub prev_game_details: Option<GameDetails>,
    /// Stake selected for the next round, in major units.
    pub bet_amount: f64,
    /// Selectable stake presets.
    pub bet_amounts: Vec<f64>,
    /// Rounds played this session.
    pub games_played: u32,
    /// Auto-play run configuration and progress, when armed.
    pub auto_play: Option<AutoPlayOptions>,
    /// Default sequence durations.
    pub timings: RoundTimings,
}

impl GameSessionState {
    /// Fresh session state for the given identity.
    pub fn new(
        player_id: u64,
        provider_id: u64,
        bet_amount: f64,
        bet_amounts: Vec<f64>,
        timings: RoundTimings,
    ) -> Self {
        Self {
            player_id,
            provider_id,
            user: None,
            leaderboard: None,
            game: None,
            prev_game_details: None,
            bet_amount,
            bet_amounts,
            games_played: 0,
            auto_play: None,
            timings,
        }
    }

    /// Apply one action to the store.
    ///
    /// Actions targeting absent sub-state are strict no-ops: a multiplier
    /// update with no round in flight and an auto-cashout update with no
    /// armed auto-play both leave the state untouched.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::SetUser(user) => self.user = Some(user),
            Action::UpdateBalance(balance) => {
                if let Some(user) = self.user.as_mut() {
                    user.balance = balance;
                }
            }
            Action::SetLeaderboard(entries) => self.leaderboard = Some(entries),
            Action::SetGame(game) => {
                let previous = std::mem::replace(&mut self.game, game);
                if previous.is_some() {
                    self.prev_game_details = previous;
                }
            }
            Action::UpdateMultiplier {
                multiplier,
                next_multiplier,
                turn,
                formula,
                potential_win,
            } => {
                if let Some(game) = self.game.as_mut() {
                    game.multiplier = multiplier;
                    game.next_multiplier = next_multiplier;
                    game.turn = turn;
                    game.formula = formula;
                    game.potential_win = potential_win;
                }
            }
            Action::SetBetAmount(amount) => self.bet_amount = amount,
            Action::IncrementGamesPlayed => self.games_played += 1,
            Action::SetAutoPlay(options) => self.auto_play = options,
            Action::UpdateAutoCashout(auto_cashout) => {
                if let Some(auto_play) = self.auto_play.as_mut() {
                    auto_play.auto_cashout = auto_cashout;
                }
            }
            Action::UpdateAutoPlayProgress {
                current_game,
                total_games,
            } => {
                if let Some(auto_play) = self.auto_play.as_mut() {
                    auto_play.current_game = current_game;
                    auto_play.total_games = total_games;
                }
            }
        }
    }
}

/// Closed set of store mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Install the player's profile.
    SetUser(UserProfile),
    /// Patch the wallet balance.
    UpdateBalance(f64),
    /// Replace the leaderboard list.
    SetLeaderboard(Vec<LeaderboardEntry>),
    /// Install or clear the round in flight, archiving the previous one.
    SetGame(Option<GameDetails>),
    /// Patch the per-turn fields of the round in flight.
    UpdateMultiplier {
        /// Multiplier reached by this turn.
        multiplier: f64,
        /// Multiplier the next turn would reach.
        next_multiplier: f64,
        /// Pages turned so far.
        turn: u32,
        /// Formula revealed on the current page.
        formula: String,
        /// Updated potential win.
        potential_win: f64,
    },
    /// Change the stake for the next round.
    SetBetAmount(f64),
    /// Bump the session round counter.
    IncrementGamesPlayed,
    /// Arm or disarm auto-play.
    SetAutoPlay(Option<AutoPlayOptions>),
    /// Change the automatic cash-out multiplier of an armed run.
    UpdateAutoCashout(Option<f64>),
    /// Record server-reported auto-play progress.
    UpdateAutoPlayProgress {
        /// Rounds completed so far.
        current_game: u32,
        /// Total rounds in the batch.
        total_games: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameSessionState {
        GameSessionState::new(
            7,
            3,
            1.0,
            vec![0.5, 1.0, 2.0],
            RoundTimings {
                open: 2.5,
                win: 5.0,
                burn: 3.0,
            },
        )
    }

    fn game(id: u64) -> GameDetails {
        GameDetails {
            id,
            bet_amount: 100,
            multiplier: 1.0,
            next_multiplier: 1.2,
            turn: 0,
            formula: "1+1=2".into(),
            potential_win: 1.0,
            game_hash: "hash".into(),
        }
    }

    #[test]
    fn update_multiplier_without_game_is_a_no_op() {
        let mut state = state();
        let before = state.clone();
        state.apply(Action::UpdateMultiplier {
            multiplier: 2.0,
            next_multiplier: 3.0,
            turn: 1,
            formula: "2*2=4".into(),
            potential_win: 4.0,
        });
        assert_eq!(state, before);
    }

    #[test]
    fn set_game_archives_the_previous_round() {
        let mut state = state();
        state.apply(Action::SetGame(Some(game(1))));
        assert!(state.prev_game_details.is_none());

        state.apply(Action::SetGame(Some(game(2))));
        assert_eq!(state.prev_game_details.as_ref().map(|g| g.id), Some(1));
        assert_eq!(state.game.as_ref().map(|g| g.id), Some(2));

        state.apply(Action::SetGame(None));
        assert_eq!(state.prev_game_details.as_ref().map(|g| g.id), Some(2));
        assert!(state.game.is_none());
    }

    #[test]
    fn clearing_an_already_empty_game_keeps_history() {
        let mut state = state();
        state.apply(Action::SetGame(Some(game(5))));
        state.apply(Action::SetGame(None));
        state.apply(Action::SetGame(None));
        assert_eq!(state.prev_game_details.as_ref().map(|g| g.id), Some(5));
    }

    #[test]
    fn auto_cashout_update_without_autoplay_is_a_no_op() {
        let mut state = state();
        let before = state.clone();
        state.apply(Action::UpdateAutoCashout(Some(2.5)));
        assert_eq!(state, before);
    }

    #[test]
    fn balance_patch_requires_a_user() {
        let mut state = state();
        state.apply(Action::UpdateBalance(10.0));
        assert!(state.user.is_none());

        state.apply(Action::SetUser(UserProfile {
            username: "ana".into(),
            balance: 5.0,
        }));
        state.apply(Action::UpdateBalance(10.0));
        assert_eq!(state.user.as_ref().map(|u| u.balance), Some(10.0));
    }

    #[test]
    fn multiplier_patch_reaches_the_active_round() {
        let mut state = state();
        state.apply(Action::SetGame(Some(game(1))));
        state.apply(Action::UpdateMultiplier {
            multiplier: 2.0,
            next_multiplier: 2.4,
            turn: 2,
            formula: "(1+1)*2=4".into(),
            potential_win: 4.0,
        });
        let game = state.game.as_ref().unwrap();
        assert_eq!(game.multiplier, 2.0);
        assert_eq!(game.turn, 2);
        assert_eq!(game.formula, "(1+1)*2=4");
    }
}
