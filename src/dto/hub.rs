use serde::Deserialize;
use validator::Validate;

use crate::dto::game::{GameDetails, LeaderboardEntry, UserProfile};

/// Events pushed by the game hub, tagged by method name.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum HubEvent {
    /// The supplied player/provider pair is unknown; fatal for the session.
    UserNotFound,
    /// A newer session superseded this one; fatal for the session.
    NewSession,
    /// Handshake acknowledgment after the connection is accepted.
    UserConnected,
    /// Initial snapshot of the player and any round already in flight.
    GameData(GameDataPayload),
    /// Balance patch after a bet, win or external wallet change.
    UpdateBalance(BalancePayload),
    /// Full replacement of the leaderboard list.
    Leaderboard(Vec<LeaderboardEntry>),
    /// The current round advanced by one page.
    MultiplierUpdate(MultiplierUpdatePayload),
    /// The current round burned; the stake is lost.
    Burn(BurnPayload),
    /// The player cashed out; the round is settled.
    Win(WinPayload),
    /// A new round was created for this player.
    NewGame(GameDetails),
    /// The current round hit the jackpot.
    JackpotWin(JackpotPayload),
    /// Auto-play run accepted by the server.
    AutoplayStartInfo(AutoplayStartPayload),
    /// Progress update for the running auto-play batch.
    AutoPlayInfoUpdate(AutoplayProgressPayload),
    /// The auto-play run was stopped before completing.
    AutoplayStopInfo,
    /// The auto-play run completed its configured round count.
    AutoplayFinished,
    /// Forward-compatible catch-all for unrecognized events.
    #[serde(other)]
    Unknown,
}

impl HubEvent {
    /// Parse and validate an event from its JSON wire form.
    pub fn from_json_str(raw: &str) -> Result<Self, HubEventError> {
        let event: Self = serde_json::from_str(raw)?;
        event.validate_payload()?;
        Ok(event)
    }

    fn validate_payload(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            HubEvent::GameData(payload) => payload.validate(),
            HubEvent::MultiplierUpdate(payload) => payload.validate(),
            HubEvent::NewGame(game) => game.validate(),
            HubEvent::AutoplayStartInfo(payload) => payload.validate(),
            _ => Ok(()),
        }
    }
}

/// Errors produced while decoding an inbound hub frame.
#[derive(Debug, thiserror::Error)]
pub enum HubEventError {
    /// The frame was not valid JSON for the event envelope.
    #[error("malformed hub event: {0}")]
    Decode(#[from] serde_json::Error),
    /// The frame decoded but carried out-of-range values.
    #[error("invalid hub event payload: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Initial session snapshot.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GameDataPayload {
    /// The connected player's profile.
    pub user: UserProfile,
    /// Round already in flight when the session attached, if any.
    #[validate(nested)]
    pub game: Option<GameDetails>,
}

/// Balance patch payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancePayload {
    /// New wallet balance in major units.
    pub balance: f64,
}

/// Fields of the current round that change on every page turn.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierUpdatePayload {
    /// Round this update belongs to.
    pub game_id: u64,
    /// Multiplier reached by this turn.
    #[validate(range(min = 0.0))]
    pub multiplier: f64,
    /// Multiplier the next turn would reach.
    pub next_multiplier: f64,
    /// Pages turned so far.
    pub turn: u32,
    /// Formula revealed on the freshly turned page.
    pub formula: String,
    /// Updated potential win in major units.
    pub potential_win: f64,
}

/// Terminal payload for a burned round.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnPayload {
    /// Round that burned.
    pub game_id: u64,
    /// Formula shown on the burning page.
    pub formula: String,
    /// Multiplier the round burned at.
    pub multiplier: f64,
}

/// Terminal payload for a cashed-out round.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinPayload {
    /// Round that settled.
    pub game_id: u64,
    /// Amount collected in major units.
    pub win_amount: f64,
}

/// Terminal payload for a jackpot round.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JackpotPayload {
    /// Round that hit the jackpot.
    pub game_id: u64,
    /// Jackpot amount in major units.
    pub amount: f64,
}

/// Acknowledgment that an auto-play run started.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AutoplayStartPayload {
    /// Number of rounds the server will play.
    #[validate(range(min = 1))]
    pub total_games: u32,
}

/// Progress report for the running auto-play batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoplayProgressPayload {
    /// Rounds completed so far.
    pub current_game: u32,
    /// Total rounds in the batch.
    pub total_games: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tagged_events() {
        let event = HubEvent::from_json_str(
            r#"{"event":"UpdateBalance","data":{"balance":12.5}}"#,
        )
        .unwrap();
        match event {
            HubEvent::UpdateBalance(payload) => assert_eq!(payload.balance, 12.5),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_unit_events_without_data() {
        let event = HubEvent::from_json_str(r#"{"event":"UserConnected"}"#).unwrap();
        assert!(matches!(event, HubEvent::UserConnected));
    }

    #[test]
    fn unknown_events_are_tolerated() {
        let event = HubEvent::from_json_str(r#"{"event":"SomethingNew","data":{}}"#).unwrap();
        assert!(matches!(event, HubEvent::Unknown));
    }

    #[test]
    fn rejects_out_of_range_payloads() {
        let err = HubEvent::from_json_str(
            r#"{"event":"MultiplierUpdate","data":{"gameId":1,"multiplier":-2.0,"nextMultiplier":1.0,"turn":1,"formula":"1+1=2","potentialWin":1.0}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, HubEventError::Validation(_)));
    }

    #[test]
    fn decodes_new_game_details() {
        let event = HubEvent::from_json_str(
            r#"{"event":"NewGame","data":{"id":9,"betAmount":100,"multiplier":1.0,"nextMultiplier":1.2,"turn":0,"formula":"1+2=3","potentialWin":10.0,"gameHash":"deadbeef"}}"#,
        )
        .unwrap();
        match event {
            HubEvent::NewGame(game) => {
                assert_eq!(game.id, 9);
                assert_eq!(game.formula, "1+2=3");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
