//! Single-file editing handle.
//!
//! [`ImageEditor`] wraps one opened image and composes the codec, re-encoder,
//! and transform operations. Every persisted mutation goes through a temp
//! sibling and an atomic rename, after which the handle reopens from disk so
//! in-memory state never drifts from the file.

use anyhow::{Context, Result, anyhow};
use image::{ColorType, DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};

use crate::config::{CropSpec, ResizeSpec};
use crate::exif::{self, MetadataRecord};
use crate::preset::find_preset;
use crate::{reencode, transform};

pub struct ImageEditor {
    path: PathBuf,
    img: DynamicImage,
    format: ImageFormat,
}

impl ImageEditor {
    /// Open an image file for editing.
    pub fn open(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("failed to open image {}", path.display()))?;
        let format = reencode::format_for_path(path);
        log::debug!(
            "opened {} ({}x{}, {format:?})",
            path.display(),
            img.width(),
            img.height()
        );
        Ok(Self {
            path: path.to_path_buf(),
            img,
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.img.width(), self.img.height())
    }

    pub fn color(&self) -> ColorType {
        self.img.color()
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Current metadata of the underlying file.
    pub fn metadata(&self) -> Result<MetadataRecord> {
        exif::read_metadata(&self.path)
    }

    /// Rebuild the file from pixels only, dropping every auxiliary metadata
    /// block, then reopen.
    pub fn strip_all_metadata(&mut self) -> Result<()> {
        reencode::write_clean(&self.img, &self.path)?;
        self.reopen()
    }

    /// Write a metadata-free copy of the current pixels to `dest`. The
    /// original file is untouched.
    pub fn save_clean_copy(&self, dest: &Path) -> Result<()> {
        reencode::write_clean(&self.img, dest)
    }

    /// Check the underlying file for leftover metadata carriers.
    pub fn verify_clean(&self) -> Result<bool> {
        reencode::verify_clean(&self.path)
    }

    /// Aspect-locked resize, persisted in place.
    ///
    /// Persisting goes through the pixel re-encoder, so metadata does not
    /// survive a resize; callers wanting metadata re-apply it afterwards.
    pub fn resize(&mut self, spec: ResizeSpec) -> Result<()> {
        self.img = transform::resize(&self.img, spec);
        reencode::write_clean(&self.img, &self.path)?;
        self.reopen()
    }

    /// Anchored crop, persisted in place. Fails without touching the file if
    /// the target exceeds the source.
    pub fn crop(&mut self, spec: CropSpec) -> Result<()> {
        self.img = transform::crop(&self.img, spec)?;
        reencode::write_clean(&self.img, &self.path)?;
        self.reopen()
    }

    /// Merge name-keyed string fields into the embedded metadata.
    pub fn update_metadata(&mut self, fields: &[(String, String)]) -> Result<()> {
        exif::write_fields(&self.path, fields)?;
        self.reopen()
    }

    /// Apply a freshly derived copy of a built-in device preset.
    pub fn apply_preset(&mut self, name: &str) -> Result<()> {
        let base = find_preset(name).ok_or_else(|| anyhow!("unknown preset '{name}'"))?;
        let record = base.derive().to_record()?;
        exif::write_metadata(&self.path, &record)?;
        self.reopen()
    }

    fn reopen(&mut self) -> Result<()> {
        self.img = image::open(&self.path)
            .with_context(|| format!("failed to reopen {}", self.path.display()))?;
        Ok(())
    }
}
