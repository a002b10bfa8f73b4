//! Animation engine handle: named slot state, playback tracks, overlays and
//! the formula glyph rail, advanced by an explicit frame tick.
//!
//! Rendering internals stay outside this crate; the engine models exactly the
//! surface the sequence controllers orchestrate against. All state lives
//! behind one mutex because realtime network callbacks and the frame loop
//! would otherwise race; every critical section is short and completion
//! notifications are dispatched only after the lock is released.

/// Asset catalog loading and calibration metadata.
pub mod assets;
/// Stage layout math for the named slots.
pub mod layout;
/// Slot, track, overlay and glyph state types.
pub mod slots;

use std::sync::Mutex;

use indexmap::IndexMap;
use tokio::sync::oneshot;

pub use self::assets::{AssetCatalog, AssetError};
pub use self::layout::Viewport;
pub use self::slots::{
    GlyphSpec, IdleBounds, OverlayKind, RevealRule, SlotName, SlotTransform, TrackSpec,
};

use self::slots::{GlyphSprite, Overlay, SlotState, TrackEntry};

struct GlyphRail {
    parent: SlotName,
    glyphs: Vec<GlyphSprite>,
}

struct EngineState {
    surface: Option<Viewport>,
    slots: IndexMap<SlotName, SlotState>,
    rail: Option<GlyphRail>,
}

/// Shared handle over the per-session animation state.
///
/// Exactly one engine exists per session. Constructing it requires a loaded
/// [`AssetCatalog`], so every named slot is guaranteed to have calibration
/// data before any controller runs.
pub struct AnimationEngine {
    catalog: AssetCatalog,
    inner: Mutex<EngineState>,
}

impl AnimationEngine {
    /// Build the engine over a fully loaded catalog; all slots start hidden.
    pub fn new(catalog: AssetCatalog) -> Self {
        let slots = SlotName::ALL
            .into_iter()
            .map(|name| (name, SlotState::hidden()))
            .collect();
        Self {
            catalog,
            inner: Mutex::new(EngineState {
                surface: None,
                slots,
                rail: None,
            }),
        }
    }

    /// Calibration data the controllers size their playback against.
    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    /// Idempotently mount the rendering surface and lay the slots out.
    pub fn attach_surface(&self, viewport: Viewport) {
        let mut state = self.lock();
        state.surface = Some(viewport);
        self.apply_layout(&mut state, viewport);
    }

    /// Recompute every slot's placement for new container dimensions.
    ///
    /// Best-effort: silently a no-op until a surface is attached.
    pub fn resize(&self, viewport: Viewport) {
        let mut state = self.lock();
        if state.surface.is_none() {
            return;
        }
        state.surface = Some(viewport);
        self.apply_layout(&mut state, viewport);
    }

    /// Set every slot's visibility to false without touching track state.
    pub fn hide_all_slots(&self) {
        let mut state = self.lock();
        for slot in state.slots.values_mut() {
            slot.visible = false;
        }
    }

    /// Toggle one slot's visibility.
    pub fn set_visible(&self, name: SlotName, visible: bool) {
        self.lock().slots[&name].visible = visible;
    }

    /// Whether the slot is currently visible.
    pub fn is_visible(&self, name: SlotName) -> bool {
        self.lock().slots[&name].visible
    }

    /// Current stage placement of the slot, for the render shell.
    pub fn slot_transform(&self, name: SlotName) -> SlotTransform {
        self.lock().slots[&name].transform
    }

    /// Whether the slot currently has an active track.
    pub fn has_track(&self, name: SlotName) -> bool {
        self.lock().slots[&name].track.is_some()
    }

    /// Start a playback track on a slot, replacing any existing track and
    /// removing any idle oscillation.
    ///
    /// Returns a receiver that resolves when the track naturally reaches its
    /// (tail-trimmed) end. Replacing a track drops its waiters, which is how
    /// a superseded show observes cancellation.
    pub fn start_track(&self, name: SlotName, spec: TrackSpec) -> oneshot::Receiver<()> {
        let native = self.catalog.slot(name).duration;
        let (tx, rx) = oneshot::channel();
        let mut state = self.lock();
        let slot = &mut state.slots[&name];
        slot.idle = None;
        slot.track = Some(TrackEntry {
            track_time: spec.start_time,
            time_scale: spec.time_scale,
            animation_end: native - spec.end_trim,
            waiters: vec![tx],
        });
        rx
    }

    /// Subscribe to the completion of the slot's existing track, if any.
    pub fn watch_track(&self, name: SlotName) -> Option<oneshot::Receiver<()>> {
        let mut state = self.lock();
        let track = state.slots[&name].track.as_mut()?;
        let (tx, rx) = oneshot::channel();
        track.waiters.push(tx);
        Some(rx)
    }

    /// Multiply the slot's current time-scale by a factor.
    pub fn scale_track(&self, name: SlotName, factor: f32) {
        if let Some(track) = self.lock().slots[&name].track.as_mut() {
            track.time_scale *= factor;
        }
    }

    /// Overwrite the slot's time-scale.
    pub fn set_time_scale(&self, name: SlotName, time_scale: f32) {
        if let Some(track) = self.lock().slots[&name].track.as_mut() {
            track.time_scale = time_scale;
        }
    }

    /// Set the slot's time-scale only while the track is still frozen at
    /// zero. Returns whether the value was applied.
    ///
    /// Lets the natural finalize path and a concurrent `finish()` fast-forward
    /// write the scale in either order without undoing each other.
    pub fn finalize_time_scale(&self, name: SlotName, time_scale: f32) -> bool {
        if let Some(track) = self.lock().slots[&name].track.as_mut() {
            if track.time_scale == 0.0 {
                track.time_scale = time_scale;
                return true;
            }
        }
        false
    }

    /// Current time-scale of the slot's track.
    pub fn time_scale(&self, name: SlotName) -> Option<f32> {
        self.lock().slots[&name].track.as_ref().map(|t| t.time_scale)
    }

    /// Current play-head position of the slot's track.
    pub fn track_time(&self, name: SlotName) -> Option<f32> {
        self.lock().slots[&name].track.as_ref().map(|t| t.track_time)
    }

    /// Drop the slot's track and idle state without firing completions.
    pub fn clear_track(&self, name: SlotName) {
        let mut state = self.lock();
        let slot = &mut state.slots[&name];
        slot.track = None;
        slot.idle = None;
    }

    /// Install the perpetual idle oscillation on a slot.
    ///
    /// Creates a track when none exists. The track never completes; it is
    /// exited only by a timed [`Self::start_track`] on the same slot, which
    /// also removes the oscillation.
    pub fn start_idle(&self, name: SlotName, bounds: IdleBounds) {
        let native = self.catalog.slot(name).duration;
        let mut state = self.lock();
        let slot = &mut state.slots[&name];
        match slot.track.as_mut() {
            Some(track) => {
                track.track_time = 0.0;
                track.time_scale = bounds.speed;
            }
            None => {
                slot.track = Some(TrackEntry {
                    track_time: 0.0,
                    time_scale: bounds.speed,
                    animation_end: native,
                    waiters: Vec::new(),
                });
            }
        }
        slot.idle = Some(bounds);
    }

    /// Whether the slot is currently idling.
    pub fn idle_active(&self, name: SlotName) -> bool {
        self.lock().slots[&name].idle.is_some()
    }

    /// Attach a transient overlay to a slot.
    ///
    /// Returns a completion receiver for [`RevealRule::TimedDrop`] overlays.
    pub fn add_overlay(
        &self,
        name: SlotName,
        kind: OverlayKind,
        reveal: RevealRule,
    ) -> Option<oneshot::Receiver<()>> {
        let mut state = self.lock();
        let slot = &mut state.slots[&name];
        let (visible, waiters, rx) = match reveal {
            RevealRule::Immediate => (true, Vec::new(), None),
            RevealRule::AttachmentVisible => (false, Vec::new(), None),
            RevealRule::TimedDrop { .. } => {
                let (tx, rx) = oneshot::channel();
                (true, vec![tx], Some(rx))
            }
        };
        slot.overlays.push(Overlay {
            kind,
            reveal,
            visible,
            elapsed: 0.0,
            waiters,
        });
        rx
    }

    /// Remove every transient overlay from a slot.
    pub fn remove_overlays(&self, name: SlotName) {
        self.lock().slots[&name].overlays.clear();
    }

    /// Kinds and visibility of the slot's overlays, in attach order.
    pub fn overlay_states(&self, name: SlotName) -> Vec<(OverlayKind, bool)> {
        self.lock().slots[&name]
            .overlays
            .iter()
            .map(|overlay| (overlay.kind.clone(), overlay.visible))
            .collect()
    }

    /// Replace the glyph rail with freshly laid-out sprites, all hidden at
    /// frame zero.
    pub fn begin_glyphs(&self, parent: SlotName, specs: Vec<GlyphSpec>) {
        let glyphs = specs
            .into_iter()
            .filter_map(|spec| {
                let clip = self.catalog.glyph(&spec.key)?;
                Some(GlyphSprite {
                    frames: clip.frames,
                    fps: clip.fps,
                    frame: 0.0,
                    speed: 1.0,
                    playing: false,
                    visible: false,
                    waiters: Vec::new(),
                    spec,
                })
            })
            .collect();
        self.lock().rail = Some(GlyphRail { parent, glyphs });
    }

    /// Number of sprites on the current rail.
    pub fn glyph_count(&self) -> usize {
        self.lock().rail.as_ref().map_or(0, |rail| rail.glyphs.len())
    }

    /// Slot the current glyph rail is attached to, if one exists.
    pub fn glyph_parent(&self) -> Option<SlotName> {
        self.lock().rail.as_ref().map(|rail| rail.parent)
    }

    /// Placement of every rail sprite, for the render shell.
    pub fn glyph_layout(&self) -> Vec<GlyphSpec> {
        self.lock()
            .rail
            .as_ref()
            .map(|rail| rail.glyphs.iter().map(|glyph| glyph.spec.clone()).collect())
            .unwrap_or_default()
    }

    /// Start one glyph playing at the given speed; resolves on its last frame.
    pub fn play_glyph(&self, index: usize, speed: f32) -> Option<oneshot::Receiver<()>> {
        let mut state = self.lock();
        let glyph = state.rail.as_mut()?.glyphs.get_mut(index)?;
        let (tx, rx) = oneshot::channel();
        glyph.speed = speed;
        glyph.playing = true;
        glyph.visible = true;
        glyph.waiters.push(tx);
        Some(rx)
    }

    /// Show a glyph frozen on its last frame without animating it.
    pub fn glyph_jump_to_end(&self, index: usize) {
        let mut state = self.lock();
        if let Some(glyph) = state.rail.as_mut().and_then(|rail| rail.glyphs.get_mut(index)) {
            glyph.frame = glyph.last_frame();
            glyph.playing = false;
            glyph.visible = true;
        }
    }

    /// Freeze the whole rail on its final frames and fire pending waiters.
    pub fn finish_glyphs(&self) {
        let mut finished = Vec::new();
        {
            let mut state = self.lock();
            if let Some(rail) = state.rail.as_mut() {
                for glyph in rail.glyphs.iter_mut() {
                    glyph.frame = glyph.last_frame();
                    glyph.playing = false;
                    glyph.visible = true;
                    finished.append(&mut glyph.waiters);
                }
            }
        }
        for waiter in finished {
            let _ = waiter.send(());
        }
    }

    /// Drop the glyph rail entirely.
    pub fn clear_glyphs(&self) {
        self.lock().rail = None;
    }

    /// Frame, playing and visible state per rail sprite, in layout order.
    pub fn glyph_states(&self) -> Vec<(f32, bool, bool)> {
        self.lock()
            .rail
            .as_ref()
            .map(|rail| {
                rail.glyphs
                    .iter()
                    .map(|glyph| (glyph.frame, glyph.playing, glyph.visible))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Advance every track, idle oscillation, overlay and glyph by `dt`
    /// seconds, then dispatch completion notifications.
    pub fn advance(&self, dt: f32) {
        let mut finished: Vec<oneshot::Sender<()>> = Vec::new();
        {
            let mut state = self.lock();
            let state = &mut *state;
            for (name, slot) in state.slots.iter_mut() {
                let reveal_at = self.catalog.slot(*name).attachment_reveal_time;
                let mut completed = false;
                if let Some(track) = slot.track.as_mut() {
                    track.track_time += dt * track.time_scale;
                    if let Some(idle) = slot.idle {
                        if track.track_time >= idle.max {
                            track.track_time = idle.max;
                            track.time_scale = -idle.speed;
                        } else if track.track_time <= idle.min {
                            track.track_time = idle.min;
                            track.time_scale = idle.speed;
                        }
                    } else if track.track_time >= track.animation_end {
                        completed = true;
                    }
                }
                if completed {
                    if let Some(mut done) = slot.track.take() {
                        finished.append(&mut done.waiters);
                    }
                }

                let attachment_visible = match (slot.track.as_ref(), reveal_at) {
                    (Some(track), Some(at)) => track.track_time >= at,
                    _ => false,
                };
                for overlay in slot.overlays.iter_mut() {
                    match overlay.reveal {
                        RevealRule::Immediate => {}
                        RevealRule::AttachmentVisible => {
                            if attachment_visible {
                                overlay.visible = true;
                            }
                        }
                        RevealRule::TimedDrop { duration } => {
                            overlay.elapsed += dt;
                            if overlay.elapsed >= duration {
                                finished.append(&mut overlay.waiters);
                            }
                        }
                    }
                }
            }

            if let Some(rail) = state.rail.as_mut() {
                for glyph in rail.glyphs.iter_mut().filter(|glyph| glyph.playing) {
                    glyph.frame += dt * glyph.fps * glyph.speed;
                    if glyph.frame >= glyph.last_frame() {
                        glyph.frame = glyph.last_frame();
                        glyph.playing = false;
                        finished.append(&mut glyph.waiters);
                    }
                }
            }
        }

        for waiter in finished {
            let _ = waiter.send(());
        }
    }

    fn apply_layout(&self, state: &mut EngineState, viewport: Viewport) {
        let open_clip = self.catalog.slot(SlotName::Open).clone();
        for (name, slot) in state.slots.iter_mut() {
            slot.transform = layout::slot_transform(*name, &open_clip, &viewport);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.inner.lock().expect("engine state poisoned")
    }
}
