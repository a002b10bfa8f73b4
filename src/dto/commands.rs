use serde::{Deserialize, Serialize};

/// Remote methods invoked on the game hub, tagged by method name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", content = "payload")]
pub enum HubCommand {
    /// Create a new round with the current stake and optional auto-play run.
    CreateGame(CreateGamePayload),
    /// Turn the page of the round in flight.
    TurnThePage {
        /// Round to advance.
        #[serde(rename = "gameId")]
        game_id: u64,
    },
    /// Cash the round out at the current multiplier.
    Cashout {
        /// Round to settle.
        #[serde(rename = "gameId")]
        game_id: u64,
    },
    /// Request a fresh balance push.
    UpdateBalance,
    /// Request a fresh leaderboard push.
    GetLeaderboard,
    /// Stop the running auto-play batch.
    CancelAutoplay,
}

/// Payload for [`HubCommand::CreateGame`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGamePayload {
    /// Stake in minor units (cents).
    pub bet_amount: u64,
    /// Present only when the player configured auto-play.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_play_settings: Option<AutoPlaySettings>,
}

/// Auto-play run configuration attached to a create-game call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPlaySettings {
    /// Number of rounds to play.
    pub total_games: u32,
    /// Multiplier to cash out at automatically, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_cashout: Option<f64>,
}

/// Local player intents fed to the event router by the UI shell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum PlayerCommand {
    /// Stake the current bet amount on a new round.
    PlaceBet,
    /// Flip gesture or tap on the page edge.
    TurnPage,
    /// Collect the current potential win.
    Cashout,
    /// Change the stake for the next round.
    SetBetAmount {
        /// New stake in major units.
        amount: f64,
    },
    /// Arm auto-play for the given number of rounds.
    SetAutoPlay {
        /// Rounds to play automatically.
        total_games: u32,
        /// Optional automatic cash-out multiplier.
        auto_cashout: Option<f64>,
    },
    /// Disarm auto-play and stop any running batch.
    CancelAutoPlay,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_game_omits_autoplay_when_not_configured() {
        let command = HubCommand::CreateGame(CreateGamePayload {
            bet_amount: 100,
            auto_play_settings: None,
        });
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(
            json,
            r#"{"method":"CreateGame","payload":{"betAmount":100}}"#
        );
    }

    #[test]
    fn create_game_carries_autoplay_when_configured() {
        let command = HubCommand::CreateGame(CreateGamePayload {
            bet_amount: 200,
            auto_play_settings: Some(AutoPlaySettings {
                total_games: 20,
                auto_cashout: Some(2.5),
            }),
        });
        let json = serde_json::to_string(&command).unwrap();
        assert!(json.contains(r#""totalGames":20"#));
        assert!(json.contains(r#""autoCashout":2.5"#));
    }

    #[test]
    fn turn_the_page_uses_camel_case_game_id() {
        let json = serde_json::to_string(&HubCommand::TurnThePage { game_id: 7 }).unwrap();
        assert_eq!(json, r#"{"method":"TurnThePage","payload":{"gameId":7}}"#);
    }

    #[test]
    fn player_commands_parse_from_kebab_case() {
        let command: PlayerCommand =
            serde_json::from_str(r#"{"command":"set-bet-amount","amount":2.0}"#).unwrap();
        assert_eq!(command, PlayerCommand::SetBetAmount { amount: 2.0 });
    }
}
