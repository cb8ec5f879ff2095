//! Batch processing: apply one operation set to a directory of images over a
//! fixed-size worker pool.
//!
//! Each file becomes exactly one task. Workers pull tasks from a channel and
//! push one terminal result each; the submitting thread gathers results in
//! completion order and owns all task-state mutation. Failures never abort
//! the run.

use anyhow::{Context, Result};
use crossbeam_channel::unbounded;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use walkdir::WalkDir;

use crate::config::OperationSet;
use crate::exif::write_metadata;
use crate::preset::find_preset;
use crate::{reencode, transform};

pub const DEFAULT_WORKERS: usize = 4;

const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Lifecycle of one batch task. Every task ends in exactly one terminal
/// state; the payload carries the human-readable outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Running,
    Succeeded(String),
    Failed(String),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded(_) | TaskState::Failed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchTask {
    pub source: PathBuf,
    pub output: PathBuf,
    pub state: TaskState,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub tasks: Vec<BatchTask>,
    pub succeeded: usize,
    pub failed: usize,
}

pub fn is_image_ext(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| IMAGE_EXTS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Collect the image files under `dir`, sorted by path for a stable task
/// order. `recursive` walks subdirectories; otherwise only the top level.
pub fn collect_images(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_image_ext(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files)
}

/// Output path for one source file: `{label}_{stem}{ext}` under `output_dir`,
/// with a numeric suffix when that name is already taken on disk or by an
/// earlier task in the same run.
///
/// The on-disk check happens at planning time; a file created between
/// planning and the write will be overwritten.
fn output_path(
    output_dir: &Path,
    label: &str,
    source: &Path,
    taken: &mut HashSet<PathBuf>,
) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");

    let mut candidate = output_dir.join(format!("{label}_{stem}.{ext}"));
    let mut counter = 1u32;
    while candidate.exists() || taken.contains(&candidate) {
        candidate = output_dir.join(format!("{label}_{stem}_{counter}.{ext}"));
        counter += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Run the full operation set for one file, writing the result to `output`.
/// Returns the human-readable outcome line.
pub fn process_file(source: &Path, output: &Path, ops: &OperationSet) -> Result<String> {
    let mut img = image::open(source)
        .with_context(|| format!("failed to open {}", source.display()))?;
    let mut notes = Vec::new();

    if let Some(spec) = ops.resize {
        img = transform::resize(&img, spec);
        notes.push(format!("resized to {}x{}", img.width(), img.height()));
    }
    if let Some(spec) = ops.crop {
        img = transform::crop(&img, spec)?;
        notes.push(format!("cropped to {}x{}", spec.width, spec.height));
    }

    // Re-encoding from pixels is what drops the source metadata, so the
    // strip operation has no extra step of its own here.
    reencode::write_clean(&img, output)?;
    if ops.strip {
        notes.push("metadata stripped".to_string());
    }

    if let Some(name) = &ops.preset {
        let base =
            find_preset(name).ok_or_else(|| anyhow::anyhow!("unknown preset '{name}'"))?;
        let record = base.derive().to_record()?;
        write_metadata(output, &record)?;
        notes.push(format!("preset '{}' applied", base.name));
    }

    if notes.is_empty() {
        notes.push("copied".to_string());
    }
    Ok(notes.join(", "))
}

/// Worker-to-gatherer message. State mutation stays on the gathering side;
/// workers only report.
enum Event {
    Started(usize),
    Finished(usize, Result<String, String>),
}

/// Process `files` with `workers` OS threads, invoking `on_complete` once per
/// task as terminal states arrive (completion order, not submission order).
/// Each task moves Queued → Running → Succeeded/Failed.
pub fn run_batch(
    files: &[PathBuf],
    output_dir: &Path,
    ops: &OperationSet,
    workers: usize,
    mut on_complete: impl FnMut(&BatchTask),
) -> Result<BatchReport> {
    ops.validate()?;
    if files.is_empty() {
        anyhow::bail!("no image files to process");
    }
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir {}", output_dir.display()))?;

    let label = ops.label();
    let mut taken = HashSet::new();
    let mut tasks: Vec<BatchTask> = files
        .iter()
        .map(|source| BatchTask {
            source: source.clone(),
            output: output_path(output_dir, &label, source, &mut taken),
            state: TaskState::Queued,
        })
        .collect();

    let workers = workers.clamp(1, files.len());
    let (job_tx, job_rx) = unbounded::<usize>();
    let (event_tx, event_rx) = unbounded::<Event>();
    for idx in 0..tasks.len() {
        // receiver is still held locally, so this cannot fail
        let _ = job_tx.send(idx);
    }
    drop(job_tx);

    let completed = AtomicUsize::new(0);
    let total = tasks.len();
    // Workers only need the paths; the task list itself stays with the
    // gathering side for mutation.
    let specs: Vec<(PathBuf, PathBuf)> = tasks
        .iter()
        .map(|t| (t.source.clone(), t.output.clone()))
        .collect();
    let specs_ref = &specs;

    let mut succeeded = 0;
    let mut failed = 0;
    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let event_tx = event_tx.clone();
            let completed = &completed;
            scope.spawn(move || {
                for idx in job_rx {
                    let (source, output) = &specs_ref[idx];
                    if event_tx.send(Event::Started(idx)).is_err() {
                        break;
                    }
                    let outcome =
                        process_file(source, output, ops).map_err(|e| format!("{e:#}"));
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    log::debug!("processed {done}/{total}: {}", source.display());
                    if event_tx.send(Event::Finished(idx, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(event_tx);

        for event in event_rx.iter() {
            match event {
                Event::Started(idx) => {
                    tasks[idx].state = TaskState::Running;
                }
                Event::Finished(idx, outcome) => {
                    let task = &mut tasks[idx];
                    task.state = match outcome {
                        Ok(msg) => {
                            succeeded += 1;
                            TaskState::Succeeded(msg)
                        }
                        Err(msg) => {
                            failed += 1;
                            log::warn!("{}: {msg}", task.source.display());
                            TaskState::Failed(msg)
                        }
                    };
                    on_complete(task);
                }
            }
        }
    });

    log::info!("batch finished: {succeeded} succeeded, {failed} failed");
    Ok(BatchReport {
        tasks,
        succeeded,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResizeSpec;
    use image::{DynamicImage, RgbImage};
    use tempfile::TempDir;

    fn fixture(dir: &Path, name: &str, w: u32, h: u32) {
        DynamicImage::ImageRgb8(RgbImage::new(w, h))
            .save(dir.join(name))
            .unwrap();
    }

    fn strip_ops() -> OperationSet {
        OperationSet {
            strip: true,
            ..OperationSet::default()
        }
    }

    #[test]
    fn collect_skips_non_images_and_sorts() {
        let dir = TempDir::new().unwrap();
        fixture(dir.path(), "b.png", 4, 4);
        fixture(dir.path(), "a.jpg", 4, 4);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = collect_images(dir.path(), false).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.jpg", "b.png"]);
    }

    #[test]
    fn collect_recursive_descends() {
        let dir = TempDir::new().unwrap();
        fixture(dir.path(), "top.png", 4, 4);
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        fixture(&dir.path().join("sub"), "deep.png", 4, 4);

        assert_eq!(collect_images(dir.path(), false).unwrap().len(), 1);
        assert_eq!(collect_images(dir.path(), true).unwrap().len(), 2);
    }

    #[test]
    fn output_names_disambiguate_with_counters() {
        let dir = TempDir::new().unwrap();
        let mut taken = HashSet::new();
        let a = output_path(dir.path(), "stripped", Path::new("/x/photo.jpg"), &mut taken);
        let b = output_path(dir.path(), "stripped", Path::new("/y/photo.jpg"), &mut taken);
        let c = output_path(dir.path(), "stripped", Path::new("/z/photo.jpg"), &mut taken);

        assert_eq!(a.file_name().unwrap(), "stripped_photo.jpg");
        assert_eq!(b.file_name().unwrap(), "stripped_photo_1.jpg");
        assert_eq!(c.file_name().unwrap(), "stripped_photo_2.jpg");
    }

    #[test]
    fn output_names_avoid_existing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("stripped_photo.jpg"), "x").unwrap();
        let mut taken = HashSet::new();
        let p = output_path(dir.path(), "stripped", Path::new("/x/photo.jpg"), &mut taken);
        assert_eq!(p.file_name().unwrap(), "stripped_photo_1.jpg");
    }

    #[test]
    fn every_task_reaches_one_terminal_state() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fixture(src.path(), "a.png", 8, 8);
        fixture(src.path(), "b.png", 8, 8);
        // Not actually an image; decode will fail.
        std::fs::write(src.path().join("fake.jpg"), b"nope").unwrap();

        let files = collect_images(src.path(), false).unwrap();
        assert_eq!(files.len(), 3);

        let mut seen = 0;
        let report = run_batch(&files, out.path(), &strip_ops(), 2, |task| {
            assert!(task.state.is_terminal());
            seen += 1;
        })
        .unwrap();

        assert_eq!(seen, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert!(report.tasks.iter().all(|t| t.state.is_terminal()));
    }

    #[test]
    fn batch_resize_writes_resized_outputs() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fixture(src.path(), "big.png", 400, 300);

        let ops = OperationSet {
            resize: Some(ResizeSpec {
                width: 100,
                height: 75,
                keep_aspect: true,
            }),
            ..OperationSet::default()
        };
        let files = collect_images(src.path(), false).unwrap();
        let report = run_batch(&files, out.path(), &ops, 1, |_| {}).unwrap();
        assert_eq!(report.failed, 0);

        let written = out.path().join("resized_big.png");
        let img = image::open(&written).unwrap();
        assert_eq!((img.width(), img.height()), (100, 75));
    }

    #[test]
    fn empty_operation_set_is_rejected() {
        let out = TempDir::new().unwrap();
        let files = vec![PathBuf::from("/x/a.jpg")];
        assert!(run_batch(&files, out.path(), &OperationSet::default(), 1, |_| {}).is_err());
    }

    #[test]
    fn batch_preset_tags_the_outputs() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fixture(src.path(), "cat.jpg", 16, 16);

        let ops = OperationSet {
            preset: Some("iPhone 12".into()),
            ..OperationSet::default()
        };
        let files = collect_images(src.path(), false).unwrap();
        let report = run_batch(&files, out.path(), &ops, 1, |_| {}).unwrap();
        assert_eq!(report.failed, 0);

        let written = out.path().join("preset_cat.jpg");
        let record = crate::exif::read_metadata(&written).unwrap();
        assert!(record.get_by_name("Make").is_some());
    }
}
