use serde::{Deserialize, Serialize};
use validator::Validate;

/// Player profile delivered with the initial game data.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display name shown in the header and leaderboard.
    pub username: String,
    /// Current wallet balance in major currency units.
    pub balance: f64,
}

/// State of the round currently in flight.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GameDetails {
    /// Server-side round identifier.
    pub id: u64,
    /// Stake placed on this round, in minor units (cents).
    #[validate(range(min = 1))]
    pub bet_amount: u64,
    /// Multiplier reached so far.
    #[validate(range(min = 0.0))]
    pub multiplier: f64,
    /// Multiplier the next page turn would reach.
    pub next_multiplier: f64,
    /// Number of pages turned this round.
    pub turn: u32,
    /// Compact formula string revealed on the current page.
    pub formula: String,
    /// Amount the player would collect by cashing out now, in major units.
    pub potential_win: f64,
    /// Provably-fair hash of the round.
    pub game_hash: String,
}

impl GameDetails {
    /// Potential win formatted for the amount overlay.
    pub fn potential_win_display(&self) -> String {
        format_amount(self.potential_win)
    }
}

/// One row of the session leaderboard.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Player identifier.
    pub id: u64,
    /// Display name.
    pub username: String,
    /// Multiplier the win was collected at.
    pub multiplier: f64,
    /// Win amount in major units.
    pub win: f64,
}

/// Auto-play configuration chosen by the player, plus server-reported progress.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPlayOptions {
    /// Number of rounds to play automatically.
    pub total_games: u32,
    /// Rounds already completed in the current auto-play run.
    pub current_game: u32,
    /// Multiplier at which to cash out automatically, when set.
    pub auto_cashout: Option<f64>,
}

/// Format an amount with thousands grouping and at most two decimals.
///
/// Whole amounts render without a fractional part, matching the display
/// format used for balances, bets and win overlays.
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let (whole, frac) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if frac != 0 {
        if frac % 10 == 0 {
            out.push_str(&format!(".{}", frac / 10));
        } else {
            out.push_str(&format!(".{frac:02}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_group_thousands_and_trim_zero_cents() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(10.0), "10");
        assert_eq!(format_amount(1234.5), "1,234.5");
        assert_eq!(format_amount(1234567.89), "1,234,567.89");
        assert_eq!(format_amount(-42.25), "-42.25");
    }

    #[test]
    fn game_details_round_trip() {
        let game = GameDetails {
            id: 17,
            bet_amount: 100,
            multiplier: 1.5,
            next_multiplier: 2.25,
            turn: 3,
            formula: "(1+2)*3=9".into(),
            potential_win: 10.0,
            game_hash: "abc123".into(),
        };
        let json = serde_json::to_string(&game).unwrap();
        assert!(json.contains("\"betAmount\":100"));
        let back: GameDetails = serde_json::from_str(&json).unwrap();
        assert_eq!(back, game);
    }
}
