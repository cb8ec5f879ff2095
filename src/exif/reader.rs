use anyhow::{Context as _, Result};
use exif::{Context, In, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::tags::IfdGroup;
use super::{MetadataEntry, MetadataRecord, TagValue};

/// Read the embedded EXIF block of an image into a [`MetadataRecord`].
///
/// A file without an EXIF block (or with one the parser cannot make sense of)
/// yields an empty record — the "no metadata" sentinel — rather than an
/// error. Individually malformed entries are skipped. Only a file that cannot
/// be opened at all is reported as an error.
pub fn read_metadata(path: &Path) -> Result<MetadataRecord> {
    let file = File::open(path)
        .with_context(|| format!("failed to open image file {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            log::debug!("no readable EXIF in {}: {e}", path.display());
            return Ok(MetadataRecord::new());
        }
    };

    let mut record = MetadataRecord::new();
    for field in exif.fields() {
        let Some(group) = map_group(field.tag.context(), field.ifd_num) else {
            continue;
        };
        let Some(value) = map_value(&field.value) else {
            log::debug!(
                "skipping undecodable entry 0x{:04x} in {}",
                field.tag.number(),
                path.display()
            );
            continue;
        };
        record.insert(MetadataEntry {
            group,
            tag_id: field.tag.number(),
            value,
        });
    }

    Ok(record)
}

fn map_group(context: Context, ifd_num: In) -> Option<IfdGroup> {
    match context {
        Context::Tiff => {
            if ifd_num == In::THUMBNAIL {
                Some(IfdGroup::Thumbnail)
            } else {
                Some(IfdGroup::Primary)
            }
        }
        Context::Exif => Some(IfdGroup::Exif),
        Context::Gps => Some(IfdGroup::Gps),
        Context::Interop => Some(IfdGroup::Interop),
        _ => None,
    }
}

fn map_value(value: &Value) -> Option<TagValue> {
    match value {
        Value::Ascii(parts) => {
            // Join multi-string values; decode as UTF-8, falling back to a
            // literal byte representation.
            let mut text = String::new();
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    text.push('\n');
                }
                match std::str::from_utf8(part) {
                    Ok(s) => text.push_str(s.trim_end_matches('\0')),
                    Err(_) => text.push_str(&format!("{part:?}")),
                }
            }
            Some(TagValue::Ascii(text))
        }
        Value::Byte(v) => Some(TagValue::Bytes(v.clone())),
        Value::Short(v) => Some(TagValue::Short(v.clone())),
        Value::Long(v) => Some(TagValue::Long(v.clone())),
        Value::Rational(v) => Some(TagValue::Rational(
            v.iter().map(|r| (r.num, r.denom)).collect(),
        )),
        Value::SRational(v) => Some(TagValue::SRational(
            v.iter().map(|r| (r.num, r.denom)).collect(),
        )),
        Value::Undefined(bytes, _) => Some(TagValue::Bytes(bytes.clone())),
        // Preserve the remaining signed integer shapes opaquely via their
        // widened unsigned forms; anything else is skipped as malformed.
        Value::SByte(v) => Some(TagValue::Bytes(v.iter().map(|&b| b as u8).collect())),
        Value::SShort(v) => Some(TagValue::Short(v.iter().map(|&s| s as u16).collect())),
        Value::SLong(v) => Some(TagValue::Long(v.iter().map(|&l| l as u32).collect())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn metadata_free_png_reads_as_empty_sentinel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.png");
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .save(&path)
            .unwrap();

        let record = read_metadata(&path).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn missing_file_is_an_open_error() {
        assert!(read_metadata(Path::new("/nonexistent/photo.jpg")).is_err());
    }

    #[test]
    fn garbage_bytes_still_open_failure_or_sentinel() {
        // A file that exists but is not an image container: the EXIF parser
        // finds nothing, which is the sentinel, not an error.
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("noise.jpg");
        std::fs::write(&path, b"not an image at all").unwrap();

        let record = read_metadata(&path).unwrap();
        assert!(record.is_empty());
    }
}
