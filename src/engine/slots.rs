use std::fmt;

use tokio::sync::oneshot;

/// Names of the skeletal animation slots owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotName {
    /// Book-opening clip, also hosts the breathing idle.
    Open,
    /// Page-turn clip.
    Turn,
    /// Win reveal clip.
    Win,
    /// Burn clip.
    Burn,
    /// Left half of the jackpot celebration.
    JackpotLeft,
    /// Right half of the jackpot celebration.
    JackpotRight,
}

impl SlotName {
    /// Every slot, in stage order.
    pub const ALL: [SlotName; 6] = [
        SlotName::Open,
        SlotName::Turn,
        SlotName::Win,
        SlotName::Burn,
        SlotName::JackpotLeft,
        SlotName::JackpotRight,
    ];

    /// Asset-manifest key for this slot.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Open => "open",
            SlotName::Turn => "turn",
            SlotName::Win => "win",
            SlotName::Burn => "burn",
            SlotName::JackpotLeft => "jackpotLeft",
            SlotName::JackpotRight => "jackpotRight",
        }
    }

    /// Parse a manifest key back into a slot name.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|slot| slot.as_str() == key)
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placement of a slot on the stage, recomputed on every resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotTransform {
    /// Horizontal scale factor.
    pub scale_x: f32,
    /// Vertical scale factor.
    pub scale_y: f32,
    /// Stage x coordinate of the slot anchor.
    pub x: f32,
    /// Stage y coordinate of the slot anchor.
    pub y: f32,
}

impl Default for SlotTransform {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            x: 0.0,
            y: 0.0,
        }
    }
}

/// Parameters for starting a playback track on a slot.
#[derive(Debug, Clone, Copy)]
pub struct TrackSpec {
    /// Play-head position the track starts at, in clip seconds.
    pub start_time: f32,
    /// Playback speed factor relative to the clip's native rate.
    pub time_scale: f32,
    /// Seconds trimmed off the clip's tail; completion fires at
    /// `native_duration - end_trim`.
    pub end_trim: f32,
}

impl TrackSpec {
    /// Track playing the whole clip once at the given speed.
    pub fn from_start(time_scale: f32) -> Self {
        Self {
            start_time: 0.0,
            time_scale,
            end_trim: 0.0,
        }
    }
}

/// Bounds of the perpetual idle oscillation installed on a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdleBounds {
    /// Lower play-head bound in clip seconds.
    pub min: f32,
    /// Upper play-head bound in clip seconds.
    pub max: f32,
    /// Absolute oscillation speed; the sign flips at each bound.
    pub speed: f32,
}

/// An active playback track. At most one exists per slot at any time.
pub(crate) struct TrackEntry {
    pub(crate) track_time: f32,
    pub(crate) time_scale: f32,
    pub(crate) animation_end: f32,
    pub(crate) waiters: Vec<oneshot::Sender<()>>,
}

/// What a transient overlay displays.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayKind {
    /// Static "current winning" title art.
    Title,
    /// Formatted amount label.
    Amount(String),
    /// "Place your bet" prompt text.
    BetPrompt(String),
}

/// When an overlay becomes visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RevealRule {
    /// Visible from the first frame.
    Immediate,
    /// Hidden until the slot's underlying skeletal attachment appears,
    /// so text never shows before its background art.
    AttachmentVisible,
    /// Drops from above the stage over the given number of seconds,
    /// completing a waiter when it lands.
    TimedDrop {
        /// Seconds the drop takes.
        duration: f32,
    },
}

/// Transient text/sprite overlay attached to a slot for one sequence.
pub(crate) struct Overlay {
    pub(crate) kind: OverlayKind,
    pub(crate) reveal: RevealRule,
    pub(crate) visible: bool,
    pub(crate) elapsed: f32,
    pub(crate) waiters: Vec<oneshot::Sender<()>>,
}

/// Placement and pacing of one formula glyph on the reveal rail.
#[derive(Debug, Clone)]
pub struct GlyphSpec {
    /// Asset-manifest key of the glyph clip.
    pub key: String,
    /// Rail-relative x position.
    pub x: f32,
    /// Rail-relative y position.
    pub y: f32,
    /// Uniform scale applied to the sprite.
    pub scale: f32,
}

/// A glyph sprite instantiated on the rail.
pub(crate) struct GlyphSprite {
    pub(crate) spec: GlyphSpec,
    pub(crate) frames: u32,
    pub(crate) fps: f32,
    pub(crate) frame: f32,
    pub(crate) speed: f32,
    pub(crate) playing: bool,
    pub(crate) visible: bool,
    pub(crate) waiters: Vec<oneshot::Sender<()>>,
}

impl GlyphSprite {
    pub(crate) fn last_frame(&self) -> f32 {
        self.frames.saturating_sub(1) as f32
    }
}

/// Per-slot runtime state: visibility, placement, track, idle and overlays.
pub(crate) struct SlotState {
    pub(crate) visible: bool,
    pub(crate) transform: SlotTransform,
    pub(crate) track: Option<TrackEntry>,
    pub(crate) idle: Option<IdleBounds>,
    pub(crate) overlays: Vec<Overlay>,
}

impl SlotState {
    pub(crate) fn hidden() -> Self {
        Self {
            visible: false,
            transform: SlotTransform::default(),
            track: None,
            idle: None,
            overlays: Vec::new(),
        }
    }
}
