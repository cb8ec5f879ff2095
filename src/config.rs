use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The set of operations a batch run (or a scripted single-file run) applies
/// to each image, in fixed order: resize, crop, preset, strip.
///
/// Operations combine independently; an empty set is invalid for batch use
/// because every task would be a no-op copy.
///
/// # Example
///
/// ```rust
/// use metascrub::config::{OperationSet, ResizeSpec};
///
/// let ops = OperationSet {
///     resize: Some(ResizeSpec {
///         width: 1920,
///         height: 1080,
///         keep_aspect: true,
///     }),
///     strip: true,
///     ..OperationSet::default()
/// };
/// assert!(ops.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationSet {
    /// Remove all auxiliary metadata by pixel-only re-encode.
    #[serde(default)]
    pub strip: bool,
    /// Aspect-locked resize toward this target box.
    #[serde(default)]
    pub resize: Option<ResizeSpec>,
    /// Anchored crop to this target size.
    #[serde(default)]
    pub crop: Option<CropSpec>,
    /// Apply a derived device preset, by catalog name.
    #[serde(default)]
    pub preset: Option<String>,
}

impl OperationSet {
    pub fn is_empty(&self) -> bool {
        !self.strip && self.resize.is_none() && self.crop.is_none() && self.preset.is_none()
    }

    /// Short label used to prefix batch output file names, mirroring the
    /// operation order: `resized_cropped_preset_stripped`.
    pub fn label(&self) -> String {
        let mut parts = Vec::new();
        if self.resize.is_some() {
            parts.push("resized");
        }
        if self.crop.is_some() {
            parts.push("cropped");
        }
        if self.preset.is_some() {
            parts.push("preset");
        }
        if self.strip {
            parts.push("stripped");
        }
        if parts.is_empty() {
            parts.push("processed");
        }
        parts.join("_")
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            bail!("no operations selected");
        }
        if let Some(resize) = &self.resize {
            if resize.width == 0 || resize.height == 0 {
                bail!("resize target must be non-zero in both dimensions");
            }
        }
        if let Some(crop) = &self.crop {
            if crop.width == 0 || crop.height == 0 {
                bail!("crop target must be non-zero in both dimensions");
            }
        }
        Ok(())
    }
}

/// Target box for a resize. With `keep_aspect` the source is scaled by the
/// smaller axis ratio so it fits inside the box without distortion; without
/// it the image is stretched to exactly `width` x `height`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub width: u32,
    pub height: u32,
    #[serde(default = "keep_aspect_default")]
    pub keep_aspect: bool,
}

fn keep_aspect_default() -> bool {
    true
}

/// Target size and anchor for a crop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CropSpec {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub anchor: Anchor,
}

/// Where the crop window sits inside the source image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl FromStr for Anchor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "center" | "centre" => Ok(Anchor::Center),
            "top-left" | "topleft" => Ok(Anchor::TopLeft),
            "top-right" | "topright" => Ok(Anchor::TopRight),
            "bottom-left" | "bottomleft" => Ok(Anchor::BottomLeft),
            "bottom-right" | "bottomright" => Ok(Anchor::BottomRight),
            other => bail!("unknown crop anchor '{other}'"),
        }
    }
}
