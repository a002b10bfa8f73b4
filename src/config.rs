//! Application-level configuration loading, including the animation calibration set.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "EMBER_BOOK_FRONT_CONFIG_PATH";

/// Immutable runtime configuration shared across the application.
///
/// Every duration, offset and bound in here is an asset-specific calibration
/// constant tied to the shipped animation clips; swapping the clips means
/// re-deriving these values, so none of them is hard-coded at a call site.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Wall-clock seconds the book-opening sequence plays on a fresh session.
    pub open_duration: f32,
    /// Wall-clock seconds for a single page turn.
    pub turn_duration: f32,
    /// Wall-clock seconds for the win reveal (formula plus skeletal playback).
    pub win_duration: f32,
    /// Wall-clock seconds for the burn sequence.
    pub burn_duration: f32,
    /// Wall-clock seconds for the "place your bet" prompt sequence.
    pub place_next_bet_duration: f32,

    /// Fraction of the win duration allocated to the formula reveal.
    pub win_reveal_ratio: f32,
    /// Fraction of the place-next-bet duration spent on the page turn.
    pub place_next_bet_turn_ratio: f32,

    /// Seconds trimmed off the turn clip's tail (freeze-frame reserve).
    pub turn_tail_trim: f32,
    /// Seconds trimmed off the win clip's tail.
    pub win_tail_trim: f32,
    /// Offset into the win clip where playback freezes until the reveal ends.
    pub win_lead_offset: f32,
    /// Seconds trimmed off the burn clip's tail.
    pub burn_tail_trim: f32,
    /// Seconds trimmed off the burn clip's native duration before scaling.
    pub burn_native_trim: f32,
    /// Offset into the burn clip where playback starts.
    pub burn_entry_offset: f32,

    /// Lower play-head bound of the open idle oscillation.
    pub idle_min: f32,
    /// Upper play-head bound of the open idle oscillation.
    pub idle_max: f32,
    /// Absolute time-scale of the idle oscillation (sign flips at the bounds).
    pub idle_speed: f32,

    /// Time-scale multiplier applied by `finish()` fast-forwards.
    pub finish_fast_forward: f32,
    /// Milliseconds `finish()` waits between speeding the turn and the win.
    pub finish_turn_beat_ms: u64,
    /// Time-scale applied to an already-running turn track by a new show.
    pub turn_retarget_factor: f32,

    /// Time-scale of the jackpot right slot's leading sub-window.
    pub jackpot_right_scale: f32,
    /// Time-scale applied to the jackpot left slot once the right completes.
    pub jackpot_left_fast_forward: f32,
    /// Milliseconds between the jackpot celebration and the next-bet prompt.
    pub jackpot_pause_ms: u64,

    /// Glyph playback speed above which a glyph jumps straight to its last frame.
    pub glyph_skip_speed: f32,
    /// Pixels between laid-out formula glyphs before scaling.
    pub glyph_spacing: f32,
    /// Maximum uniform scale applied to formula glyphs.
    pub glyph_max_scale: f32,

    /// Milliseconds before a pending remote call surfaces the loading indicator.
    pub loader_delay_ms: u64,
    /// Reconnect backoff schedule in milliseconds.
    pub reconnect_schedule_ms: Vec<u64>,
    /// Selectable bet presets shown to the player.
    pub bet_amounts: Vec<f64>,
    /// Default bet amount preselected at session start.
    pub default_bet_amount: f64,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in calibration set.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded calibration set from config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            open_duration: 2.5,
            turn_duration: 1.0,
            win_duration: 5.0,
            burn_duration: 3.0,
            place_next_bet_duration: 1.5,
            win_reveal_ratio: 0.3,
            place_next_bet_turn_ratio: 0.7,
            turn_tail_trim: 1.2,
            win_tail_trim: 1.7,
            win_lead_offset: 6.6,
            burn_tail_trim: 1.5,
            burn_native_trim: 4.5,
            burn_entry_offset: 3.0,
            idle_min: 0.01,
            idle_max: 0.3,
            idle_speed: 0.25,
            finish_fast_forward: 7.0,
            finish_turn_beat_ms: 200,
            turn_retarget_factor: 5.0,
            jackpot_right_scale: 0.3,
            jackpot_left_fast_forward: 50.0,
            jackpot_pause_ms: 2000,
            glyph_skip_speed: 5.0,
            glyph_spacing: 50.0,
            glyph_max_scale: 0.6,
            loader_delay_ms: 600,
            reconnect_schedule_ms: vec![0, 2000, 5000, 10000],
            bet_amounts: vec![0.5, 1.0, 2.0, 5.0, 10.0],
            default_bet_amount: 1.0,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
