//! Formula reveal: tokenizes the server's compact formula string and plays
//! the matching glyph clips strictly in order inside the reveal rail.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use uuid::Uuid;

use crate::engine::{AnimationEngine, GlyphSpec, SlotName};
use crate::error::SequenceError;

/// Width of the rail rectangle the glyphs are laid out in, in stage pixels.
const RAIL_WIDTH: f32 = 700.0;
/// Vertical nudge applied to the equals glyph so it sits on the baseline.
const EQUAL_BASELINE_NUDGE: f32 = 25.0;
/// Scale factor and raise applied to exponent digits.
const EXPONENT_SCALE: f32 = 0.6;
const EXPONENT_RAISE: f32 = -40.0;

/// One glyph of a decoded formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphToken {
    /// A digit 0–9.
    Digit(u8),
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `=`
    Equal,
    /// `(`
    OpenBracket,
    /// `)`
    CloseBracket,
    /// A two-character `^N` exponent escape, carrying its digit.
    Exponent(u8),
}

impl GlyphToken {
    /// Asset-manifest key of the clip rendering this token.
    ///
    /// Exponents render with their digit's clip, scaled down and raised.
    pub fn asset_key(&self) -> String {
        match self {
            GlyphToken::Digit(d) | GlyphToken::Exponent(d) => d.to_string(),
            GlyphToken::Plus => "plus".into(),
            GlyphToken::Minus => "minus".into(),
            GlyphToken::Multiply => "multiply".into(),
            GlyphToken::Divide => "divide".into(),
            GlyphToken::Equal => "equal".into(),
            GlyphToken::OpenBracket => "open-bracket".into(),
            GlyphToken::CloseBracket => "close-bracket".into(),
        }
    }
}

/// Decode a compact formula string into glyph tokens.
///
/// `^N` is a two-character escape producing a single exponent token; blanks
/// and unrecognized characters are dropped.
pub fn tokenize(formula: &str) -> Vec<GlyphToken> {
    let mut tokens = Vec::new();
    let mut chars = formula.chars().peekable();
    while let Some(c) = chars.next() {
        let token = match c {
            '0'..='9' => Some(GlyphToken::Digit(c as u8 - b'0')),
            '+' => Some(GlyphToken::Plus),
            '-' => Some(GlyphToken::Minus),
            '*' => Some(GlyphToken::Multiply),
            '/' => Some(GlyphToken::Divide),
            '=' => Some(GlyphToken::Equal),
            '(' => Some(GlyphToken::OpenBracket),
            ')' => Some(GlyphToken::CloseBracket),
            '^' => chars
                .peek()
                .and_then(|next| next.to_digit(10))
                .map(|digit| {
                    chars.next();
                    GlyphToken::Exponent(digit as u8)
                }),
            _ => None,
        };
        if let Some(token) = token {
            tokens.push(token);
        }
    }
    tokens
}

/// Layout and pacing calibration of the reveal rail.
#[derive(Debug, Clone, Copy)]
pub struct FormulaTuning {
    /// Playback speed above which a glyph jumps straight to its last frame.
    pub skip_speed: f32,
    /// Pixels between glyphs before scaling.
    pub spacing: f32,
    /// Maximum uniform glyph scale.
    pub max_scale: f32,
}

impl Default for FormulaTuning {
    fn default() -> Self {
        Self {
            skip_speed: 5.0,
            spacing: 50.0,
            max_scale: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevealSignal {
    Running,
    Cancelled,
    Finished,
}

struct ActiveReveal {
    id: Uuid,
    signal: watch::Sender<RevealSignal>,
}

/// Plays an ordered list of glyph clips left-to-right, one at a time.
///
/// A single reveal is active at any moment: a new `show` call implicitly
/// cancels the prior one and rebuilds the sprite rail.
pub struct FormulaReveal {
    engine: Arc<AnimationEngine>,
    tuning: FormulaTuning,
    active: Mutex<Option<ActiveReveal>>,
}

impl FormulaReveal {
    /// Build the sequencer over the shared engine.
    pub fn new(engine: Arc<AnimationEngine>, tuning: FormulaTuning) -> Self {
        Self {
            engine,
            tuning,
            active: Mutex::new(None),
        }
    }

    /// Play the token sequence inside `slot`'s rail within `duration` seconds.
    ///
    /// Glyphs play strictly sequentially; each glyph's completion starts the
    /// next. Resolves after the last glyph, or early when [`Self::finish`]
    /// fast-forwards the rail; rejects with a cancellation error when a newer
    /// show supersedes this one.
    pub async fn show(
        &self,
        slot: SlotName,
        tokens: &[GlyphToken],
        duration: f32,
    ) -> Result<(), SequenceError> {
        let id = Uuid::new_v4();
        let mut signal_rx = {
            let mut active = self.lock_active();
            if let Some(prev) = active.take() {
                let _ = prev.signal.send(RevealSignal::Cancelled);
            }
            let (tx, rx) = watch::channel(RevealSignal::Running);
            *active = Some(ActiveReveal { id, signal: tx });
            rx
        };

        let specs = self.layout(tokens);
        self.engine.begin_glyphs(slot, specs);

        let total_native: f32 = tokens
            .iter()
            .filter_map(|token| self.engine.catalog().glyph(&token.asset_key()))
            .map(|clip| clip.native_duration())
            .sum();
        let speed = if duration > 0.0 {
            total_native / duration
        } else {
            f32::INFINITY
        };

        for index in 0..self.engine.glyph_count() {
            match *signal_rx.borrow() {
                RevealSignal::Cancelled => return Err(SequenceError::Cancelled),
                RevealSignal::Finished => return Ok(()),
                RevealSignal::Running => {}
            }

            // ultra-fast playback is visually illegible; skip straight to the
            // final frame instead
            if speed > self.tuning.skip_speed {
                self.engine.glyph_jump_to_end(index);
                continue;
            }

            let Some(done) = self.engine.play_glyph(index, speed) else {
                break;
            };
            tokio::select! {
                biased;
                changed = signal_rx.wait_for(|signal| *signal != RevealSignal::Running) => {
                    return match changed {
                        Ok(signal) if *signal == RevealSignal::Finished => Ok(()),
                        _ => Err(SequenceError::Cancelled),
                    };
                }
                res = done => {
                    if res.is_err() {
                        return Err(SequenceError::Cancelled);
                    }
                }
            }
        }

        let mut active = self.lock_active();
        if active.as_ref().is_some_and(|reveal| reveal.id == id) {
            *active = None;
        }
        Ok(())
    }

    /// Fast-forward the active reveal: every remaining glyph becomes visible
    /// at its last frame immediately and the pending show resolves through
    /// its completion path. Safe no-op when nothing is active.
    pub fn finish(&self) {
        let taken = self.lock_active().take();
        if let Some(reveal) = taken {
            self.engine.finish_glyphs();
            let _ = reveal.signal.send(RevealSignal::Finished);
        }
    }

    /// Whether a reveal is currently in flight.
    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    fn layout(&self, tokens: &[GlyphToken]) -> Vec<GlyphSpec> {
        let catalog = self.engine.catalog();
        let widths: Vec<(GlyphToken, f32)> = tokens
            .iter()
            .filter_map(|token| {
                catalog
                    .glyph(&token.asset_key())
                    .map(|clip| (*token, clip.width))
            })
            .collect();

        let total_width_raw: f32 = widths
            .iter()
            .map(|(_, width)| width + self.tuning.spacing)
            .sum();
        if total_width_raw <= 0.0 {
            return Vec::new();
        }
        let scale = (RAIL_WIDTH / total_width_raw).min(self.tuning.max_scale);
        // center the laid-out run when it fits inside the rail
        let mut x = ((RAIL_WIDTH - total_width_raw * scale) / 2.0).max(0.0);

        widths
            .into_iter()
            .map(|(token, width)| {
                let (glyph_scale, mut y) = match token {
                    GlyphToken::Exponent(_) => (scale * EXPONENT_SCALE, EXPONENT_RAISE),
                    _ => (scale, 0.0),
                };
                if token == GlyphToken::Equal {
                    y += EQUAL_BASELINE_NUDGE;
                }
                let spec = GlyphSpec {
                    key: token.asset_key(),
                    x,
                    y,
                    scale: glyph_scale,
                };
                x += (width + self.tuning.spacing) * scale;
                spec
            })
            .collect()
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveReveal>> {
        self.active.lock().expect("formula state poisoned")
    }
}
