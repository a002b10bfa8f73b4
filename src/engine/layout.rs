use crate::engine::assets::SlotClip;
use crate::engine::slots::{SlotName, SlotTransform};

/// Dimensions of the rendering container and its two sibling UI regions.
///
/// The stage occupies whatever vertical space the notification header and
/// the flip footer leave over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Container width in pixels.
    pub width: f32,
    /// Container height in pixels.
    pub height: f32,
    /// Height of the notification header above the stage.
    pub notification_height: f32,
    /// Height of the flip footer below the stage.
    pub flip_height: f32,
}

impl Viewport {
    /// Usable stage dimensions after subtracting the sibling regions.
    pub fn stage_size(&self) -> (f32, f32) {
        (
            self.width,
            self.height - self.notification_height - self.flip_height,
        )
    }
}

/// Compute a slot's placement for the current stage size.
///
/// All slots share a uniform base scale derived from the open clip's
/// skeleton dimensions; a few slots carry calibrated offsets on top: the
/// burn clip sits against the left edge and is stretched vertically, and
/// the jackpot halves are widened (right) and nudged down (left) to meet
/// in the middle of the stage.
pub(crate) fn slot_transform(slot: SlotName, open_clip: &SlotClip, viewport: &Viewport) -> SlotTransform {
    let (width, height) = viewport.stage_size();
    let scale_x = width / open_clip.skeleton_width * 0.99;
    let scale_y = height / open_clip.skeleton_height;

    match slot {
        SlotName::JackpotRight => SlotTransform {
            scale_x: scale_x * 1.57,
            scale_y,
            x: width / 2.0 - width * 0.106,
            y: height / 2.0,
        },
        SlotName::JackpotLeft => SlotTransform {
            scale_x,
            scale_y,
            x: width / 2.0,
            y: height / 2.0 + height * 0.012,
        },
        SlotName::Burn => SlotTransform {
            scale_x,
            scale_y: scale_y * 1.1,
            x: 10.0,
            y: height / 2.0 + height * 0.012 + 25.0,
        },
        _ => SlotTransform {
            scale_x,
            scale_y,
            x: width / 2.0,
            y: height / 2.0,
        },
    }
}
