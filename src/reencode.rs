//! Pixel-only re-save: rebuild the output container from decoded pixels so no
//! auxiliary metadata from the source survives.
//!
//! JPEG output goes through a fixed quality-95 baseline profile on RGB pixels;
//! PNG/GIF/BMP output carries pixel data only. `verify_clean` inspects the
//! written container for leftover metadata carriers.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF, ImageICC};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::exif::temp_sibling;

const JPEG_QUALITY: u8 = 95;

/// Output format for a destination path: taken from the extension, defaulting
/// to JPEG when the extension is missing or unknown.
pub fn format_for_path(path: &Path) -> ImageFormat {
    ImageFormat::from_path(path).unwrap_or(ImageFormat::Jpeg)
}

/// Re-encode pixels to `dest` under the metadata-suppressing profile for the
/// destination format. The write goes to a temp sibling first and is renamed
/// into place, so a failed encode leaves no partial file at `dest`.
pub fn write_clean(img: &DynamicImage, dest: &Path) -> Result<()> {
    let format = format_for_path(dest);
    let tmp = temp_sibling(dest);

    let encode = || -> Result<()> {
        match format {
            ImageFormat::Jpeg => {
                // Baseline, fixed quality, RGB. No source EXIF, ICC, or
                // progressive scan structure carries over.
                let file = File::create(&tmp)
                    .with_context(|| format!("failed to create {}", tmp.display()))?;
                let mut writer = BufWriter::new(file);
                let rgb = img.to_rgb8();
                let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
                rgb.write_with_encoder(encoder)
                    .context("JPEG encode failed")?;
            }
            other => {
                img.save_with_format(&tmp, other)
                    .with_context(|| format!("{other:?} encode failed"))?;
            }
        }
        Ok(())
    };

    if let Err(e) = encode() {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }

    if let Err(e) = std::fs::rename(&tmp, dest) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("failed to move clean output into {}", dest.display()));
    }
    Ok(())
}

/// Check a written file for leftover metadata carriers.
///
/// JPEG: no EXIF, no ICC profile, no APP1/APP13/COM segments. PNG: no eXIf
/// and no textual chunks. GIF/BMP have no carrier this tool writes, so they
/// pass by construction once they decode.
pub fn verify_clean(path: &Path) -> Result<bool> {
    let format = format_for_path(path);
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    match format {
        ImageFormat::Jpeg => {
            let jpeg = Jpeg::from_bytes(Bytes::from(bytes))
                .map_err(|e| anyhow::anyhow!("failed to parse JPEG structure: {e}"))?;
            if jpeg.exif().is_some() || jpeg.icc_profile().is_some() {
                return Ok(false);
            }
            const APP1: u8 = 0xE1;
            const APP13: u8 = 0xED;
            const COM: u8 = 0xFE;
            let dirty = jpeg
                .segments()
                .iter()
                .any(|s| matches!(s.marker(), APP1 | APP13 | COM));
            Ok(!dirty)
        }
        ImageFormat::Png => {
            let png = Png::from_bytes(Bytes::from(bytes))
                .map_err(|e| anyhow::anyhow!("failed to parse PNG structure: {e}"))?;
            if png.exif().is_some() {
                return Ok(false);
            }
            let dirty = png.chunks().iter().any(|c| {
                matches!(&c.kind(), b"eXIf" | b"tEXt" | b"zTXt" | b"iTXt")
            });
            Ok(!dirty)
        }
        _ => {
            // Decodability is the only check left for formats without a
            // standard metadata carrier.
            image::open(path)
                .with_context(|| format!("failed to decode {}", path.display()))?;
            Ok(true)
        }
    }
}
