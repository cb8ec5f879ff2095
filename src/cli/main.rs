use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

use metascrub::batch::{self, DEFAULT_WORKERS};
use metascrub::config::{Anchor, CropSpec, OperationSet, ResizeSpec};
use metascrub::exif::tags::IfdGroup;
use metascrub::preset::builtin_presets;
use metascrub::ImageEditor;

#[derive(Parser, Debug)]
#[command(
    name = "metascrub",
    version,
    about = "Image metadata editor — show, strip, rewrite, and preset EXIF data, single files or whole directories"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Strip all metadata (pixel-only rebuild, in place for single files)
    #[arg(long)]
    strip: bool,

    /// Save a metadata-free copy to FILE instead of editing in place
    #[arg(long, value_name = "FILE")]
    clean_copy: Option<PathBuf>,

    /// Verify that files carry no metadata and exit
    #[arg(long)]
    verify: bool,

    /// Set a metadata field, e.g. --set Make=Apple (repeatable)
    #[arg(long, value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Apply a device preset by name (see --list-presets)
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,

    /// List the built-in device presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Resize into a WxH box, e.g. --resize 1920x1080 (aspect-locked unless
    /// --stretch is given)
    #[arg(long, value_name = "WxH", value_parser = parse_resize)]
    resize: Option<ResizeSpec>,

    /// With --resize, ignore the aspect ratio and stretch to exactly WxH
    #[arg(long, requires = "resize")]
    stretch: bool,

    /// Anchored crop to WxH, e.g. --crop 800x600
    #[arg(long, value_name = "WxH", value_parser = parse_resize)]
    crop: Option<ResizeSpec>,

    /// Crop anchor: center, top-left, top-right, bottom-left, bottom-right
    #[arg(long, default_value = "center")]
    anchor: String,

    /// Batch mode: write results into this directory instead of in place
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Recurse into subdirectories when collecting images
    #[arg(short, long)]
    recursive: bool,

    /// Worker threads for batch mode
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_resize(s: &str) -> Result<ResizeSpec, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("'{s}' is not WxH"))?;
    let width: u32 = w.trim().parse().map_err(|_| format!("bad width in '{s}'"))?;
    let height: u32 = h.trim().parse().map_err(|_| format!("bad height in '{s}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("'{s}' has a zero dimension"));
    }
    Ok(ResizeSpec {
        width,
        height,
        keep_aspect: true,
    })
}

fn parse_set(arg: &str) -> Result<(String, String)> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("--set expects NAME=VALUE, got '{arg}'"))?;
    Ok((name.trim().to_string(), value.to_string()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if cli.list_presets {
        for preset in builtin_presets() {
            println!("{}", preset.name);
        }
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let anchor = Anchor::from_str(&cli.anchor)?;
    let crop = cli.crop.map(|c| CropSpec {
        width: c.width,
        height: c.height,
        anchor,
    });
    let resize = cli.resize.map(|mut r| {
        r.keep_aspect = !cli.stretch;
        r
    });

    // Batch mode: one operation set, applied per file into --output-dir.
    if let Some(output_dir) = &cli.output_dir {
        let ops = OperationSet {
            strip: cli.strip,
            resize,
            crop,
            preset: cli.preset.clone(),
        };
        return run_batch_mode(&cli, output_dir, &ops);
    }

    // Single-file mode: apply the requested operations to each path in turn.
    let fields: Vec<(String, String)> = cli
        .set
        .iter()
        .map(|s| parse_set(s))
        .collect::<Result<_>>()?;

    let mut failures = 0usize;
    for path in &cli.paths {
        if let Err(e) = process_single(&cli, path, &fields, resize, crop) {
            log::error!("{}: {e:#}", path.display());
            failures += 1;
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} file(s) failed");
    }
    Ok(())
}

fn run_batch_mode(cli: &Cli, output_dir: &PathBuf, ops: &OperationSet) -> Result<()> {
    let mut files = Vec::new();
    for path in &cli.paths {
        if path.is_dir() {
            files.extend(batch::collect_images(path, cli.recursive)?);
        } else if path.is_file() {
            files.push(path.clone());
        }
    }
    if files.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }
    log::info!("Found {} image(s) to process", files.len());

    let total = files.len();
    let mut done = 0usize;
    let report = batch::run_batch(&files, output_dir, ops, cli.workers, |task| {
        done += 1;
        match &task.state {
            batch::TaskState::Succeeded(msg) => {
                log::info!("[{done}/{total}] {}: {msg}", task.source.display());
            }
            batch::TaskState::Failed(msg) => {
                log::error!("[{done}/{total}] {}: {msg}", task.source.display());
            }
            _ => {}
        }
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    log::info!(
        "Done: {} succeeded, {} failed out of {total} images",
        report.succeeded,
        report.failed
    );
    if report.failed > 0 {
        anyhow::bail!("{} task(s) failed", report.failed);
    }
    Ok(())
}

fn process_single(
    cli: &Cli,
    path: &PathBuf,
    fields: &[(String, String)],
    resize: Option<ResizeSpec>,
    crop: Option<CropSpec>,
) -> Result<()> {
    let mut editor = ImageEditor::open(path)?;

    if cli.verify {
        let clean = editor.verify_clean()?;
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "path": path.display().to_string(), "clean": clean })
            );
        } else {
            let verdict = if clean { "clean" } else { "has metadata" };
            println!("{}: {verdict}", path.display());
        }
        return Ok(());
    }

    let mut acted = false;

    if let Some(spec) = resize {
        editor.resize(spec)?;
        let (w, h) = editor.dimensions();
        log::info!("{}: resized to {w}x{h}", path.display());
        acted = true;
    }
    if let Some(spec) = crop {
        editor.crop(spec)?;
        log::info!("{}: cropped to {}x{}", path.display(), spec.width, spec.height);
        acted = true;
    }
    if !fields.is_empty() {
        editor.update_metadata(fields)?;
        log::info!("{}: wrote {} field(s)", path.display(), fields.len());
        acted = true;
    }
    if let Some(name) = &cli.preset {
        editor.apply_preset(name)?;
        log::info!("{}: applied preset '{name}'", path.display());
        acted = true;
    }
    if cli.strip {
        editor.strip_all_metadata()?;
        log::info!("{}: metadata stripped", path.display());
        acted = true;
    }
    if let Some(dest) = &cli.clean_copy {
        editor.save_clean_copy(dest)?;
        log::info!("{}: clean copy at {}", path.display(), dest.display());
        acted = true;
    }

    // With nothing else requested, show the metadata.
    if !acted {
        show_metadata(cli, &editor)?;
    }
    Ok(())
}

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

fn show_metadata(cli: &Cli, editor: &ImageEditor) -> Result<()> {
    let record = editor.metadata()?;

    if cli.json {
        let entries: Vec<serde_json::Value> = record
            .iter()
            .map(|e| {
                serde_json::json!({
                    "group": e.group.label(),
                    "tag": e.display_name(),
                    "value": e.value.to_string(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "path": editor.path().display().to_string(),
                "entries": entries,
            }))?
        );
        return Ok(());
    }

    let (w, h) = editor.dimensions();
    println!();
    println!("{BOLD}File:{RESET} {} ({w} x {h})", editor.path().display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    if record.is_empty() {
        println!("  {DIM}(no metadata found){RESET}");
        println!();
        return Ok(());
    }

    let groups = [
        IfdGroup::Primary,
        IfdGroup::Thumbnail,
        IfdGroup::Exif,
        IfdGroup::Gps,
        IfdGroup::Interop,
    ];
    for group in groups {
        let entries: Vec<_> = record.iter().filter(|e| e.group == group).collect();
        if entries.is_empty() {
            continue;
        }
        println!("  {BOLD}{}{RESET}", group.label());
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for entry in entries {
            println!("  {:<28} : {}", entry.display_name(), entry.value);
        }
        println!();
    }
    Ok(())
}
