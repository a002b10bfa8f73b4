//! Startup asset catalog: clip calibration metadata plus on-disk presence checks.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::engine::slots::SlotName;

/// Manifest keys of every glyph clip the formula sequencer can request.
pub const GLYPH_KEYS: [&str; 17] = [
    "0",
    "1",
    "2",
    "3",
    "4",
    "5",
    "6",
    "7",
    "8",
    "9",
    "divide",
    "close-bracket",
    "open-bracket",
    "minus",
    "plus",
    "multiply",
    "equal",
];

/// Errors raised while loading the asset catalog. All of them are fatal for
/// the session; there is no partial-content fallback.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The manifest file could not be read.
    #[error("failed to read asset manifest: {0}")]
    Io(#[from] std::io::Error),
    /// The manifest file is not valid JSON for the expected shape.
    #[error("failed to parse asset manifest: {0}")]
    Parse(#[from] serde_json::Error),
    /// A named skeletal slot is missing from the manifest.
    #[error("manifest is missing slot `{0}`")]
    MissingSlot(String),
    /// A glyph clip is missing from the manifest.
    #[error("manifest is missing glyph `{0}`")]
    MissingGlyph(String),
    /// A file referenced by the manifest does not exist on disk.
    #[error("missing asset file `{0}`")]
    MissingFile(PathBuf),
}

/// Calibration metadata for one skeletal clip.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotClip {
    /// Native clip duration in seconds.
    pub duration: f32,
    /// Authored skeleton width, the basis of the stage scale.
    pub skeleton_width: f32,
    /// Authored skeleton height.
    pub skeleton_height: f32,
    /// Play-head time at which the text-backdrop attachment appears, for
    /// clips that gate overlays on it.
    #[serde(default)]
    pub attachment_reveal_time: Option<f32>,
}

/// Calibration metadata for one glyph clip.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphClip {
    /// Frame count of the clip.
    pub frames: u32,
    /// Native frame rate.
    pub fps: f32,
    /// Sprite width in pixels at scale 1.
    pub width: f32,
    /// Sprite height in pixels at scale 1.
    pub height: f32,
}

impl GlyphClip {
    /// Wall-clock seconds one full playback takes at native speed.
    pub fn native_duration(&self) -> f32 {
        self.frames as f32 / self.fps
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    slots: IndexMap<String, SlotClip>,
    glyphs: IndexMap<String, GlyphClip>,
    font: String,
    title_image: String,
}

/// Loaded calibration data for every clip the engine can play.
///
/// A catalog only exists after every asset loaded successfully, which is
/// what lets controllers assume non-null slot handles: constructing an
/// [`super::AnimationEngine`] requires a catalog, so the all-or-nothing
/// loading invariant holds by construction.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    slots: IndexMap<SlotName, SlotClip>,
    glyphs: IndexMap<String, GlyphClip>,
}

impl AssetCatalog {
    /// Load the catalog from an asset directory.
    ///
    /// Reads `manifest.json`, then verifies in parallel that every named
    /// skeletal pair (`skeleton.json` + `skeleton.atlas`), every glyph GIF,
    /// the font file and the title image exist. Any failure is fatal.
    pub async fn load(dir: &Path) -> Result<Self, AssetError> {
        let manifest_path = dir.join("manifest.json");
        let raw = tokio::fs::read_to_string(&manifest_path).await?;
        let manifest: Manifest = serde_json::from_str(&raw)?;

        let mut slots = IndexMap::new();
        for name in SlotName::ALL {
            let clip = manifest
                .slots
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| AssetError::MissingSlot(name.as_str().to_string()))?;
            slots.insert(name, clip);
        }

        let mut glyphs = IndexMap::new();
        for key in GLYPH_KEYS {
            let clip = manifest
                .glyphs
                .get(key)
                .cloned()
                .ok_or_else(|| AssetError::MissingGlyph(key.to_string()))?;
            glyphs.insert(key.to_string(), clip);
        }

        let mut paths = Vec::new();
        for name in SlotName::ALL {
            paths.push(dir.join("spines").join(name.as_str()).join("skeleton.json"));
            paths.push(dir.join("spines").join(name.as_str()).join("skeleton.atlas"));
        }
        for key in GLYPH_KEYS {
            paths.push(dir.join("gifs").join(format!("{key}.gif")));
        }
        paths.push(dir.join(&manifest.font));
        paths.push(dir.join(&manifest.title_image));

        try_join_all(paths.into_iter().map(|path| async move {
            tokio::fs::metadata(&path)
                .await
                .map_err(|_| AssetError::MissingFile(path))
        }))
        .await?;

        info!(
            dir = %dir.display(),
            slots = slots.len(),
            glyphs = glyphs.len(),
            "asset catalog loaded"
        );
        Ok(Self { slots, glyphs })
    }

    /// Build a catalog from already-verified parts.
    pub fn from_parts(
        slots: IndexMap<SlotName, SlotClip>,
        glyphs: IndexMap<String, GlyphClip>,
    ) -> Self {
        Self { slots, glyphs }
    }

    /// Calibration of a named slot clip.
    pub fn slot(&self, name: SlotName) -> &SlotClip {
        &self.slots[&name]
    }

    /// Calibration of a glyph clip, when the key is known.
    pub fn glyph(&self, key: &str) -> Option<&GlyphClip> {
        self.glyphs.get(key)
    }
}

#[cfg(test)]
pub(crate) fn test_catalog() -> AssetCatalog {
    let mut slots = IndexMap::new();
    for (name, duration, reveal) in [
        (SlotName::Open, 3.0, None),
        (SlotName::Turn, 6.0, None),
        (SlotName::Win, 14.9, Some(7.0)),
        (SlotName::Burn, 12.0, None),
        (SlotName::JackpotLeft, 4.0, Some(1.0)),
        (SlotName::JackpotRight, 3.0, None),
    ] {
        slots.insert(
            name,
            SlotClip {
                duration,
                skeleton_width: 1000.0,
                skeleton_height: 500.0,
                attachment_reveal_time: reveal,
            },
        );
    }

    let mut glyphs = IndexMap::new();
    for key in GLYPH_KEYS {
        glyphs.insert(
            key.to_string(),
            GlyphClip {
                frames: 24,
                fps: 60.0,
                width: 220.0,
                height: 260.0,
            },
        );
    }

    AssetCatalog::from_parts(slots, glyphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_fails_on_missing_manifest() {
        let err = AssetCatalog::load(Path::new("/nonexistent")).await.unwrap_err();
        assert!(matches!(err, AssetError::Io(_)));
    }

    #[test]
    fn glyph_native_duration_from_frames_and_fps() {
        let clip = GlyphClip {
            frames: 24,
            fps: 60.0,
            width: 1.0,
            height: 1.0,
        };
        assert!((clip.native_duration() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_catalog_covers_all_slots_and_glyphs() {
        let catalog = test_catalog();
        for name in SlotName::ALL {
            assert!(catalog.slot(name).duration > 0.0);
        }
        for key in GLYPH_KEYS {
            assert!(catalog.glyph(key).is_some());
        }
    }
}
