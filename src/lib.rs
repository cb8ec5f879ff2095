//! # metascrub
//!
//! EXIF/metadata editor and stripper for JPEG, PNG, GIF, and BMP images —
//! read and rewrite embedded metadata, rebuild files from pixels only,
//! apply realistic device presets, and process whole directories over a
//! worker pool.
//!
//! ## Quick Start
//!
//! Single-file editing goes through [`ImageEditor`]:
//!
//! ```rust,no_run
//! use metascrub::ImageEditor;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut editor = ImageEditor::open(Path::new("photo.jpg"))?;
//!
//!     // Show what's embedded
//!     for entry in editor.metadata()?.iter() {
//!         println!("{}: {}", entry.display_name(), entry.value);
//!     }
//!
//!     // Rebuild from pixels only, then make it look like a phone shot
//!     editor.strip_all_metadata()?;
//!     editor.apply_preset("iPhone 12")?;
//!     assert!(!editor.verify_clean()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! Batch jobs run one operation set across a directory:
//!
//! ```rust,no_run
//! use metascrub::batch::{collect_images, run_batch, DEFAULT_WORKERS};
//! use metascrub::config::{OperationSet, ResizeSpec};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let files = collect_images(Path::new("./photos"), false)?;
//!     let ops = OperationSet {
//!         strip: true,
//!         resize: Some(ResizeSpec { width: 1920, height: 1080, keep_aspect: true }),
//!         ..OperationSet::default()
//!     };
//!     let report = run_batch(&files, Path::new("./out"), &ops, DEFAULT_WORKERS, |task| {
//!         println!("{}: {:?}", task.source.display(), task.state);
//!     })?;
//!     println!("{} ok, {} failed", report.succeeded, report.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Metadata Write | Strip (pixel re-encode) |
//! |--------|----------------|-------------------------|
//! | JPEG (`.jpg`, `.jpeg`) | APP1 segment splice | quality-95 baseline |
//! | PNG (`.png`) | eXIf chunk | pixel-lossless |
//! | GIF (`.gif`) | rejected (no standard carrier) | supported |
//! | BMP (`.bmp`) | rejected (no standard carrier) | supported |
//!
//! ## Modules
//!
//! - [`exif`] — metadata codec: tag table, read path, type-coercing write path
//! - [`reencode`] — pixel-only re-save and cleanliness verification
//! - [`transform`] — aspect-locked resize and anchored crop
//! - [`preset`] — built-in device profiles with bounded-random derivation
//! - [`batch`] — directory processing over a fixed worker pool
//! - [`editor`] — single-file editing handle composing the above
//! - [`config`] — operation-set configuration

pub mod batch;
pub mod config;
pub mod editor;
pub mod exif;
pub mod preset;
pub mod reencode;
pub mod transform;

pub use editor::ImageEditor;
