//! Pixel-geometry operations: resize (aspect-locked or stretched) and
//! anchored crop.
//!
//! Both operate purely on decoded pixel buffers; persisting the result (and
//! the metadata consequences of re-encoding) is the caller's concern.

use anyhow::{Result, bail};
use image::DynamicImage;
use image::imageops::FilterType;

use crate::config::{Anchor, CropSpec, ResizeSpec};

/// Final dimensions of a resize. With `keep_aspect` the source is scaled by
/// the smaller of the two axis ratios so the result fits inside the target
/// box without distortion; without it the target is taken as-is.
pub fn resize_target(source: (u32, u32), spec: ResizeSpec) -> (u32, u32) {
    if !spec.keep_aspect {
        return (spec.width, spec.height);
    }
    let (sw, sh) = source;
    let ratio_w = spec.width as f64 / sw as f64;
    let ratio_h = spec.height as f64 / sh as f64;
    let ratio = ratio_w.min(ratio_h);
    let w = ((sw as f64 * ratio).round() as u32).max(1);
    let h = ((sh as f64 * ratio).round() as u32).max(1);
    (w, h)
}

/// Resize with Lanczos3 resampling.
pub fn resize(img: &DynamicImage, spec: ResizeSpec) -> DynamicImage {
    let (w, h) = resize_target((img.width(), img.height()), spec);
    img.resize_exact(w, h, FilterType::Lanczos3)
}

/// Top-left origin of the crop window for the given anchor.
///
/// A target larger than the source in either dimension is an error; there is
/// no silent clamping.
pub fn crop_origin(source: (u32, u32), spec: CropSpec) -> Result<(u32, u32)> {
    let (sw, sh) = source;
    if spec.width > sw || spec.height > sh {
        bail!(
            "crop target {}x{} exceeds source {}x{}",
            spec.width,
            spec.height,
            sw,
            sh
        );
    }
    let slack_x = sw - spec.width;
    let slack_y = sh - spec.height;
    let origin = match spec.anchor {
        Anchor::Center => (slack_x / 2, slack_y / 2),
        Anchor::TopLeft => (0, 0),
        Anchor::TopRight => (slack_x, 0),
        Anchor::BottomLeft => (0, slack_y),
        Anchor::BottomRight => (slack_x, slack_y),
    };
    Ok(origin)
}

/// Anchored crop to the target size.
pub fn crop(img: &DynamicImage, spec: CropSpec) -> Result<DynamicImage> {
    let (x, y) = crop_origin((img.width(), img.height()), spec)?;
    Ok(img.crop_imm(x, y, spec.width, spec.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn resize_scales_by_the_smaller_ratio() {
        // 4000x3000 into a 1920x1080 box: the height ratio (0.36) wins over
        // the width ratio (0.48).
        assert_eq!(
            resize_target(
                (4000, 3000),
                ResizeSpec {
                    width: 1920,
                    height: 1080,
                    keep_aspect: true,
                }
            ),
            (1440, 1080)
        );
        // Wide source into a square box: width ratio wins.
        assert_eq!(
            resize_target(
                (2000, 1000),
                ResizeSpec {
                    width: 500,
                    height: 500,
                    keep_aspect: true,
                }
            ),
            (500, 250)
        );
    }

    #[test]
    fn stretched_resize_takes_the_target_verbatim() {
        assert_eq!(
            resize_target(
                (4000, 3000),
                ResizeSpec {
                    width: 1920,
                    height: 1080,
                    keep_aspect: false,
                }
            ),
            (1920, 1080)
        );

        let img = DynamicImage::ImageRgb8(RgbImage::new(400, 300));
        let out = resize(
            &img,
            ResizeSpec {
                width: 100,
                height: 100,
                keep_aspect: false,
            },
        );
        assert_eq!((out.width(), out.height()), (100, 100));
    }

    #[test]
    fn resize_never_collapses_to_zero() {
        assert_eq!(
            resize_target(
                (10000, 10),
                ResizeSpec {
                    width: 100,
                    height: 100,
                    keep_aspect: true,
                }
            ),
            (100, 1)
        );
    }

    #[test]
    fn resize_produces_target_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(400, 300));
        let out = resize(
            &img,
            ResizeSpec {
                width: 144,
                height: 108,
                keep_aspect: true,
            },
        );
        assert_eq!((out.width(), out.height()), (144, 108));
    }

    #[test]
    fn bottom_right_crop_window() {
        let spec = CropSpec {
            width: 600,
            height: 500,
            anchor: Anchor::BottomRight,
        };
        assert_eq!(crop_origin((1000, 800), spec).unwrap(), (400, 300));
    }

    #[test]
    fn center_crop_splits_the_slack() {
        let spec = CropSpec {
            width: 500,
            height: 400,
            anchor: Anchor::Center,
        };
        assert_eq!(crop_origin((1001, 801), spec).unwrap(), (250, 200));
    }

    #[test]
    fn oversized_crop_is_rejected() {
        let spec = CropSpec {
            width: 2000,
            height: 100,
            anchor: Anchor::Center,
        };
        let err = crop_origin((1000, 800), spec).unwrap_err();
        assert!(err.to_string().contains("exceeds source"));
    }

    #[test]
    fn crop_produces_target_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(100, 80));
        let out = crop(
            &img,
            CropSpec {
                width: 40,
                height: 30,
                anchor: Anchor::TopRight,
            },
        )
        .unwrap();
        assert_eq!((out.width(), out.height()), (40, 30));
    }
}
