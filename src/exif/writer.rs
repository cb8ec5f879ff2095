use anyhow::{Context, Result, bail};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF};
use little_exif::endian::Endian;
use little_exif::exif_tag::ExifTag;
use little_exif::filetype::FileExtension;
use little_exif::ifd::ExifTagGroup;
use little_exif::metadata::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::tags::{IfdGroup, TagDef, TagType, find_tag};
use super::{MetadataEntry, MetadataRecord, TagValue};

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
// img-parts set_exif() expects just the TIFF data (after Exif\0\0)
const JPEG_EXIF_OVERHEAD: usize = 10; // 2 + 2 + 6

/// Coerce a raw string into the declared type of a tag.
///
/// Rules:
/// - ASCII tags take the string verbatim.
/// - Short/long tags take whitespace- or comma-separated integers.
/// - Rational tags take `num/den` literals, decimal floats (scaled to
///   hundredths), or bare integers (`n` → `n/1`), one per component.
/// - Byte/undefined tags take the raw UTF-8 bytes of the string.
pub fn coerce(raw: &str, ty: TagType) -> Result<TagValue> {
    fn components(raw: &str) -> impl Iterator<Item = &str> {
        raw.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
    }

    match ty {
        TagType::Ascii => Ok(TagValue::Ascii(raw.to_string())),
        TagType::Byte | TagType::Undefined => Ok(TagValue::Bytes(raw.as_bytes().to_vec())),
        TagType::Short => {
            let vals: Result<Vec<u16>, _> = components(raw).map(str::parse).collect();
            let vals = vals.with_context(|| format!("'{raw}' is not a valid short value"))?;
            if vals.is_empty() {
                bail!("empty value for short tag");
            }
            Ok(TagValue::Short(vals))
        }
        TagType::Long => {
            let vals: Result<Vec<u32>, _> = components(raw).map(str::parse).collect();
            let vals = vals.with_context(|| format!("'{raw}' is not a valid long value"))?;
            if vals.is_empty() {
                bail!("empty value for long tag");
            }
            Ok(TagValue::Long(vals))
        }
        TagType::Rational => {
            let vals: Result<Vec<(u32, u32)>> = components(raw)
                .map(|part| parse_rational(part, false).map(|(n, d)| (n as u32, d)))
                .collect();
            let vals = vals.with_context(|| format!("'{raw}' is not a valid rational value"))?;
            if vals.is_empty() {
                bail!("empty value for rational tag");
            }
            Ok(TagValue::Rational(vals))
        }
        TagType::SRational => {
            let vals: Result<Vec<(i32, i32)>> = components(raw)
                .map(|part| parse_rational(part, true).map(|(n, d)| (n as i32, d as i32)))
                .collect();
            let vals =
                vals.with_context(|| format!("'{raw}' is not a valid signed rational value"))?;
            if vals.is_empty() {
                bail!("empty value for signed rational tag");
            }
            Ok(TagValue::SRational(vals))
        }
    }
}

/// Parse one rational component: `num/den` literal, decimal float, or integer.
fn parse_rational(part: &str, signed: bool) -> Result<(i64, u32)> {
    if let Some((num, den)) = part.split_once('/') {
        let num: i64 = num.trim().parse().context("bad rational numerator")?;
        let den: u32 = den.trim().parse().context("bad rational denominator")?;
        if den == 0 {
            bail!("rational denominator must be non-zero");
        }
        if !signed && num < 0 {
            bail!("negative numerator for unsigned rational");
        }
        return Ok((num, den));
    }
    if part.contains('.') {
        let v: f64 = part.parse().context("bad decimal value")?;
        if !signed && v < 0.0 {
            bail!("negative value for unsigned rational");
        }
        // Same hundredths scaling the preset fields use.
        return Ok(((v * 100.0).round() as i64, 100));
    }
    let num: i64 = part.parse().context("bad integer value")?;
    if !signed && num < 0 {
        bail!("negative value for unsigned rational");
    }
    Ok((num, 1))
}

/// Resolve a field name and coerce its raw value into a typed entry.
///
/// Unknown names are rejected with a descriptive error; nothing is silently
/// shoehorned into an unrelated tag.
pub fn resolve_field(name: &str, raw: &str) -> Result<MetadataEntry> {
    let def: &TagDef = find_tag(name)
        .ok_or_else(|| anyhow::anyhow!("unknown metadata field name '{name}'"))?;
    let value = coerce(raw, def.ty)
        .with_context(|| format!("invalid value for {} ({:?})", def.name, def.ty))?;
    Ok(MetadataEntry {
        group: def.group,
        tag_id: def.id,
        value,
    })
}

/// Serialize a typed value to little-endian raw bytes for the IFD writer.
fn encode_value(value: &TagValue) -> Vec<u8> {
    match value {
        TagValue::Ascii(s) => {
            let mut bytes = s.as_bytes().to_vec();
            bytes.push(0);
            bytes
        }
        TagValue::Short(v) => v.iter().flat_map(|n| n.to_le_bytes()).collect(),
        TagValue::Long(v) => v.iter().flat_map(|n| n.to_le_bytes()).collect(),
        TagValue::Rational(v) => v
            .iter()
            .flat_map(|(n, d)| {
                let mut b = n.to_le_bytes().to_vec();
                b.extend_from_slice(&d.to_le_bytes());
                b
            })
            .collect(),
        TagValue::SRational(v) => v
            .iter()
            .flat_map(|(n, d)| {
                let mut b = n.to_le_bytes().to_vec();
                b.extend_from_slice(&d.to_le_bytes());
                b
            })
            .collect(),
        TagValue::Bytes(b) => b.clone(),
    }
}

fn exif_group(group: IfdGroup) -> Result<ExifTagGroup> {
    match group {
        IfdGroup::Primary => Ok(ExifTagGroup::GENERIC),
        IfdGroup::Exif => Ok(ExifTagGroup::EXIF),
        IfdGroup::Gps => Ok(ExifTagGroup::GPS),
        IfdGroup::Thumbnail | IfdGroup::Interop => {
            bail!("writes to the {} IFD are not supported", group.label())
        }
    }
}

/// Declared serialization format for a value being written.
fn value_format(value: &TagValue) -> little_exif::exif_tag_format::ExifTagFormat {
    use little_exif::exif_tag_format::ExifTagFormat;
    match value {
        TagValue::Ascii(_) => ExifTagFormat::STRING,
        TagValue::Short(_) => ExifTagFormat::INT16U,
        TagValue::Long(_) => ExifTagFormat::INT32U,
        TagValue::Rational(_) => ExifTagFormat::RATIONAL64U,
        TagValue::SRational(_) => ExifTagFormat::RATIONAL64S,
        TagValue::Bytes(_) => ExifTagFormat::UNDEF,
    }
}

fn build_exif_tag(entry: &MetadataEntry) -> Result<ExifTag> {
    let group = exif_group(entry.group)?;
    let raw = encode_value(&entry.value);
    ExifTag::from_u16_with_data(
        entry.tag_id,
        &value_format(&entry.value),
        &raw,
        &Endian::Little,
        &group,
    )
    .map_err(|e| {
        anyhow::anyhow!(
            "cannot encode tag 0x{:04x} in the {} IFD: {e:?}",
            entry.tag_id,
            entry.group.label()
        )
    })
}

// The panic hook is process-global; concurrent batch workers must not
// interleave their take/set/restore swaps or the silencing hook leaks.
static PANIC_HOOK_LOCK: Mutex<()> = Mutex::new(());

/// Load existing EXIF metadata from a file path using little_exif.
/// Returns None if it can't parse (instead of losing data).
fn load_existing_metadata(path: &Path) -> Option<Metadata> {
    let path_owned = path.to_path_buf();
    // Suppress panics from little_exif
    let result = {
        let _guard = PANIC_HOOK_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        let result = std::panic::catch_unwind(move || Metadata::new_from_path(&path_owned));
        std::panic::set_hook(prev_hook);
        result
    };

    match result {
        Ok(Ok(m)) => {
            let tag_count: usize = m.get_ifds().iter().map(|ifd| ifd.get_tags().len()).sum();
            if tag_count == 0 {
                None
            } else {
                log::debug!("loaded {tag_count} existing EXIF tags");
                Some(m)
            }
        }
        Ok(Err(e)) => {
            log::debug!("could not parse existing EXIF: {e}");
            None
        }
        Err(_) => {
            log::debug!("EXIF parser panicked; starting from an empty block");
            None
        }
    }
}

/// Temp sibling of `path`, in the same directory so the final rename stays on
/// one filesystem. The real extension is kept so format sniffing still works.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("tmp");
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    path.with_file_name(format!("{stem}.tmp.{ext}"))
}

enum Container {
    Jpeg,
    Png,
}

fn container_for(path: &Path) -> Result<Container> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => Ok(Container::Jpeg),
        "png" => Ok(Container::Png),
        "gif" | "bmp" => bail!(
            "{} files have no standard EXIF carrier; metadata writes are not supported",
            ext.to_uppercase()
        ),
        other => bail!("unsupported image format '{other}' for metadata write"),
    }
}

/// Merge the given entries into the image's embedded EXIF block and persist
/// the result atomically (temp sibling, then rename over the original).
///
/// Existing tags not named by `record` are preserved. JPEG gets an APP1
/// segment splice; PNG gets an eXIf chunk. GIF and BMP are rejected.
pub fn write_metadata(path: &Path, record: &MetadataRecord) -> Result<()> {
    if record.is_empty() {
        bail!("no metadata fields to write");
    }
    let container = container_for(path)?;

    let mut metadata = load_existing_metadata(path).unwrap_or_else(Metadata::new);
    for entry in record.iter() {
        let tag = build_exif_tag(entry)?;
        metadata.set_tag(tag);
    }

    let exif_bytes = metadata
        .as_u8_vec(FileExtension::JPEG)
        .context("failed to serialize EXIF block")?;
    if exif_bytes.len() <= JPEG_EXIF_OVERHEAD {
        bail!("serialized EXIF block is empty");
    }
    let tiff_data = exif_bytes[JPEG_EXIF_OVERHEAD..].to_vec();

    let file_bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let output = match container {
        Container::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(Bytes::from(file_bytes))
                .map_err(|e| anyhow::anyhow!("failed to parse JPEG structure: {e}"))?;
            jpeg.set_exif(Some(Bytes::from(tiff_data)));
            jpeg.encoder().bytes()
        }
        Container::Png => {
            let mut png = Png::from_bytes(Bytes::from(file_bytes))
                .map_err(|e| anyhow::anyhow!("failed to parse PNG structure: {e}"))?;
            png.set_exif(Some(Bytes::from(tiff_data)));
            png.encoder().bytes()
        }
    };

    let tmp = temp_sibling(path);
    std::fs::write(&tmp, &output)
        .with_context(|| format!("failed to write temp file {}", tmp.display()))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("failed to replace {}", path.display()));
    }

    log::debug!("wrote {} metadata fields to {}", record.len(), path.display());
    Ok(())
}

/// Resolve and write name-keyed string fields in one step.
pub fn write_fields(path: &Path, fields: &[(String, String)]) -> Result<()> {
    let mut record = MetadataRecord::new();
    for (name, raw) in fields {
        record.insert(resolve_field(name, raw)?);
    }
    write_metadata(path, &record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::read_metadata;
    use image::{DynamicImage, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn coerce_rational_literal() {
        assert_eq!(
            coerce("1/60", TagType::Rational).unwrap(),
            TagValue::Rational(vec![(1, 60)])
        );
    }

    #[test]
    fn coerce_decimal_scales_to_hundredths() {
        assert_eq!(
            coerce("2.5", TagType::Rational).unwrap(),
            TagValue::Rational(vec![(250, 100)])
        );
        assert_eq!(
            coerce("-0.5", TagType::SRational).unwrap(),
            TagValue::SRational(vec![(-50, 100)])
        );
    }

    #[test]
    fn coerce_integer_lists() {
        assert_eq!(
            coerce("2015 1511 2217 1330", TagType::Short).unwrap(),
            TagValue::Short(vec![2015, 1511, 2217, 1330])
        );
        assert_eq!(
            coerce("32", TagType::Short).unwrap(),
            TagValue::Short(vec![32])
        );
    }

    #[test]
    fn coerce_rejects_garbage() {
        assert!(coerce("not-a-number", TagType::Short).is_err());
        assert!(coerce("1/0", TagType::Rational).is_err());
        assert!(coerce("-3", TagType::Rational).is_err());
    }

    #[test]
    fn unknown_field_name_is_rejected() {
        let err = resolve_field("NotARealField", "whatever").unwrap_err();
        assert!(err.to_string().contains("NotARealField"));
    }

    #[test]
    fn gif_write_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("anim.gif");
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .save(&path)
            .unwrap();

        let err = write_fields(&path, &[("Make".into(), "Apple".into())]).unwrap_err();
        assert!(err.to_string().contains("GIF"));
    }

    #[test]
    fn make_roundtrips_through_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        DynamicImage::ImageRgb8(RgbImage::new(16, 16))
            .save(&path)
            .unwrap();

        write_fields(
            &path,
            &[
                ("Make".into(), "Apple".into()),
                ("Model".into(), "iPhone 12".into()),
            ],
        )
        .unwrap();

        let record = read_metadata(&path).unwrap();
        let make = record.get_by_name("Make").unwrap();
        assert_eq!(make.value, TagValue::Ascii("Apple".into()));
        let model = record.get_by_name("Model").unwrap();
        assert_eq!(model.value, TagValue::Ascii("iPhone 12".into()));
    }

    #[test]
    fn write_preserves_unrelated_tags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        DynamicImage::ImageRgb8(RgbImage::new(16, 16))
            .save(&path)
            .unwrap();

        write_fields(&path, &[("Make".into(), "Apple".into())]).unwrap();
        write_fields(&path, &[("Model".into(), "iPhone 12".into())]).unwrap();

        let record = read_metadata(&path).unwrap();
        assert!(record.get_by_name("Make").is_some());
        assert!(record.get_by_name("Model").is_some());
    }

    #[test]
    fn concurrent_writes_leave_the_panic_hook_intact() {
        use std::sync::atomic::{AtomicBool, Ordering};

        static MARKER_RAN: AtomicBool = AtomicBool::new(false);

        let dir = TempDir::new().unwrap();
        let paths: Vec<_> = (0..4)
            .map(|i| {
                let path = dir.path().join(format!("p{i}.jpg"));
                DynamicImage::ImageRgb8(RgbImage::new(8, 8))
                    .save(&path)
                    .unwrap();
                path
            })
            .collect();

        std::panic::set_hook(Box::new(|_| {
            MARKER_RAN.store(true, Ordering::SeqCst);
        }));

        std::thread::scope(|scope| {
            for path in &paths {
                scope.spawn(move || {
                    write_fields(path, &[("Make".into(), "Apple".into())]).unwrap();
                });
            }
        });

        // If a worker's swap had leaked the silencing hook, the marker hook
        // would be gone and this caught panic would not set the flag.
        let _ = std::panic::catch_unwind(|| panic!("hook check"));
        let _ = std::panic::take_hook();
        assert!(MARKER_RAN.load(Ordering::SeqCst));
    }

    #[test]
    fn temp_sibling_keeps_extension() {
        let tmp = temp_sibling(Path::new("/photos/cat.jpg"));
        assert_eq!(tmp, Path::new("/photos/cat.tmp.jpg"));
    }
}
