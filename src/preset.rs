//! Built-in device metadata profiles and bounded-random derivation.
//!
//! Each profile is an immutable base describing a real phone camera. Applying
//! one goes through [`PresetProfile::derive`], which randomizes the volatile
//! capture fields (timestamps, exposure, focus area) within plausible bounds
//! so repeated applications do not produce byte-identical metadata. Fields
//! absent from the base are never invented.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::exif::tags::find_tag;
use crate::exif::{MetadataEntry, MetadataRecord, TagValue};

/// Shutter speeds a phone camera plausibly picks in ordinary light.
pub const SHUTTER_SPEEDS: [(u32, u32); 8] = [
    (1, 30),
    (1, 40),
    (1, 50),
    (1, 60),
    (1, 80),
    (1, 100),
    (1, 125),
    (1, 160),
];

/// ISO sensitivities matching the shutter catalog.
pub const ISO_CATALOG: [u16; 9] = [50, 64, 80, 100, 125, 160, 200, 250, 320];

const TIMESTAMP_FIELDS: [&str; 3] = ["DateTime", "DateTimeOriginal", "DateTimeDigitized"];
const TIMESTAMP_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// A named device profile: an ordered list of (field name, typed value).
#[derive(Debug, Clone)]
pub struct PresetProfile {
    pub name: String,
    pub fields: Vec<(String, TagValue)>,
}

impl PresetProfile {
    pub fn get(&self, field: &str) -> Option<&TagValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    fn set(&mut self, field: &str, value: TagValue) {
        if let Some(slot) = self.fields.iter_mut().find(|(name, _)| name == field) {
            slot.1 = value;
        }
    }

    /// Derived copy with the volatile fields redrawn: one timestamp from the
    /// preceding 24-hour window applied to all three timestamp fields,
    /// exposure time and ISO from the fixed catalogs, brightness within
    /// ±1.0 EV of the base, subject area jittered (±100 px position, ±50 px
    /// extent, floored at zero), and white balance redrawn with a 3:1 bias
    /// toward automatic. The base itself is never mutated.
    pub fn derive(&self) -> PresetProfile {
        self.derive_with(Local::now(), &mut rand::thread_rng())
    }

    pub fn derive_with<R: Rng>(&self, now: DateTime<Local>, rng: &mut R) -> PresetProfile {
        let mut derived = self.clone();

        let stamp = now
            - Duration::hours(rng.gen_range(0..=23))
            - Duration::minutes(rng.gen_range(0..=59))
            - Duration::seconds(rng.gen_range(0..=59));
        let stamp = stamp.format(TIMESTAMP_FORMAT).to_string();
        for field in TIMESTAMP_FIELDS {
            if self.get(field).is_some() {
                derived.set(field, TagValue::Ascii(stamp.clone()));
            }
        }

        if self.get("ExposureTime").is_some() {
            let &(n, d) = SHUTTER_SPEEDS.choose(rng).unwrap_or(&(1, 60));
            derived.set("ExposureTime", TagValue::Rational(vec![(n, d)]));
        }

        if self.get("ISOSpeedRatings").is_some() {
            let &iso = ISO_CATALOG.choose(rng).unwrap_or(&100);
            derived.set("ISOSpeedRatings", TagValue::Short(vec![iso]));
        }

        if let Some(TagValue::SRational(pairs)) = self.get("BrightnessValue") {
            if let Some(&(n, d)) = pairs.first() {
                let base = n as f64 / d as f64;
                let jitter: f64 = rng.gen_range(-1.0..=1.0);
                let value = ((base + jitter) * 100.0) as i32;
                derived.set("BrightnessValue", TagValue::SRational(vec![(value, 100)]));
            }
        }

        if let Some(TagValue::Short(area)) = self.get("SubjectArea") {
            if let [x, y, w, h] = area[..] {
                let shift = |rng: &mut R, base: u16, span: i32| -> u16 {
                    (base as i32 + rng.gen_range(-span..=span)).max(0) as u16
                };
                let jittered = vec![
                    shift(rng, x, 100),
                    shift(rng, y, 100),
                    shift(rng, w, 50),
                    shift(rng, h, 50),
                ];
                derived.set("SubjectArea", TagValue::Short(jittered));
            }
        }

        if self.get("WhiteBalance").is_some() {
            // 3:1 toward automatic.
            let wb = *[0u16, 0, 0, 1].choose(rng).unwrap_or(&0);
            derived.set("WhiteBalance", TagValue::Short(vec![wb]));
        }

        derived
    }

    /// Resolve the profile's field names through the tag table into a record
    /// ready for the metadata writer.
    pub fn to_record(&self) -> Result<MetadataRecord> {
        let mut record = MetadataRecord::new();
        for (name, value) in &self.fields {
            let def = find_tag(name)
                .with_context(|| format!("preset field '{name}' has no tag table entry"))?;
            record.insert(MetadataEntry {
                group: def.group,
                tag_id: def.id,
                value: value.clone(),
            });
        }
        Ok(record)
    }
}

fn ascii(s: &str) -> TagValue {
    TagValue::Ascii(s.to_string())
}

fn short(v: u16) -> TagValue {
    TagValue::Short(vec![v])
}

fn long(v: u32) -> TagValue {
    TagValue::Long(vec![v])
}

fn rational(n: u32, d: u32) -> TagValue {
    TagValue::Rational(vec![(n, d)])
}

fn srational(n: i32, d: i32) -> TagValue {
    TagValue::SRational(vec![(n, d)])
}

fn bytes(b: &[u8]) -> TagValue {
    TagValue::Bytes(b.to_vec())
}

macro_rules! profile {
    ($name:literal, [ $(($field:literal, $value:expr)),* $(,)? ]) => {
        PresetProfile {
            name: $name.to_string(),
            fields: vec![ $( ($field.to_string(), $value) ),* ],
        }
    };
}

/// The built-in device catalog.
pub fn builtin_presets() -> Vec<PresetProfile> {
    vec![
        profile!("iPhone 12", [
            ("Make", ascii("Apple")),
            ("Model", ascii("iPhone 12")),
            ("Software", ascii("iOS 15.0")),
            ("DateTime", ascii("2024:01:20 15:30:00")),
            ("DateTimeOriginal", ascii("2024:01:20 15:30:00")),
            ("DateTimeDigitized", ascii("2024:01:20 15:30:00")),
            ("ExifVersion", bytes(b"0232")),
            ("ComponentsConfiguration", bytes(&[1, 2, 3, 0])),
            ("ShutterSpeedValue", srational(7022, 1000)),
            ("ApertureValue", rational(16, 10)),
            ("ExposureTime", rational(1, 60)),
            ("FNumber", rational(16, 10)),
            ("ExposureProgram", short(2)),
            ("ISOSpeedRatings", short(32)),
            ("ExifImageWidth", long(4032)),
            ("ExifImageHeight", long(3024)),
            ("FocalLength", rational(42, 10)),
            ("FocalLengthIn35mmFilm", short(26)),
            ("ColorSpace", short(1)),
            ("WhiteBalance", short(0)),
            ("BrightnessValue", srational(578, 100)),
            ("MeteringMode", short(5)),
            ("Flash", short(16)),
            ("SubjectArea", TagValue::Short(vec![2015, 1511, 2217, 1330])),
            ("SensingMethod", short(2)),
            ("SceneType", bytes(&[1])),
            ("ExposureMode", short(0)),
            ("DigitalZoomRatio", rational(1, 1)),
            ("SceneCaptureType", short(0)),
            (
                "LensSpecification",
                TagValue::Rational(vec![(154, 100), (789, 100), (16, 10), (24, 10)])
            ),
            ("LensMake", ascii("Apple")),
            ("LensModel", ascii("iPhone 12 back dual wide camera 4.2mm f/1.6")),
        ]),
        profile!("iPhone 13 Pro Max", [
            ("Make", ascii("Apple")),
            ("Model", ascii("iPhone 13 Pro Max")),
            ("Software", ascii("iOS 16.0")),
            ("DateTime", ascii("2024:01:20 15:30:00")),
            ("DateTimeOriginal", ascii("2024:01:20 15:30:00")),
            ("DateTimeDigitized", ascii("2024:01:20 15:30:00")),
            ("ExifVersion", bytes(b"0232")),
            ("ComponentsConfiguration", bytes(&[1, 2, 3, 0])),
            ("ShutterSpeedValue", srational(8022, 1000)),
            ("ApertureValue", rational(15, 10)),
            ("ExposureTime", rational(1, 120)),
            ("FNumber", rational(15, 10)),
            ("ExposureProgram", short(2)),
            ("ISOSpeedRatings", short(40)),
            ("ExifImageWidth", long(4032)),
            ("ExifImageHeight", long(3024)),
            ("FocalLength", rational(57, 10)),
            ("FocalLengthIn35mmFilm", short(35)),
            ("ColorSpace", short(1)),
            ("WhiteBalance", short(0)),
            ("BrightnessValue", srational(612, 100)),
            ("MeteringMode", short(5)),
            ("Flash", short(16)),
            ("SubjectArea", TagValue::Short(vec![2015, 1511, 2217, 1330])),
            ("SensingMethod", short(2)),
            ("SceneType", bytes(&[1])),
            ("ExposureMode", short(0)),
            ("DigitalZoomRatio", rational(1, 1)),
            ("SceneCaptureType", short(0)),
            (
                "LensSpecification",
                TagValue::Rational(vec![(154, 100), (789, 100), (15, 10), (28, 10)])
            ),
            ("LensMake", ascii("Apple")),
            ("LensModel", ascii("iPhone 13 Pro Max back triple camera 5.7mm f/1.5")),
        ]),
        profile!("Samsung Galaxy S21 Ultra", [
            ("Make", ascii("SAMSUNG")),
            ("Model", ascii("SM-G998B")),
            ("Software", ascii("G998BXXU3BUK8")),
            ("DateTime", ascii("2024:01:20 15:30:00")),
            ("DateTimeOriginal", ascii("2024:01:20 15:30:00")),
            ("DateTimeDigitized", ascii("2024:01:20 15:30:00")),
            ("ExifVersion", bytes(b"0220")),
            ("ComponentsConfiguration", bytes(&[1, 2, 3, 0])),
            ("ShutterSpeedValue", srational(6643, 1000)),
            ("ApertureValue", rational(18, 10)),
            ("ExposureTime", rational(1, 100)),
            ("FNumber", rational(18, 10)),
            ("ExposureProgram", short(2)),
            ("ISOSpeedRatings", short(50)),
            ("ExifImageWidth", long(4000)),
            ("ExifImageHeight", long(3000)),
            ("FocalLength", rational(67, 10)),
            ("FocalLengthIn35mmFilm", short(24)),
            ("ColorSpace", short(1)),
            ("WhiteBalance", short(0)),
            ("BrightnessValue", srational(745, 100)),
            ("MeteringMode", short(2)),
            ("Flash", short(0)),
            ("SubjectArea", TagValue::Short(vec![2000, 1500, 2200, 1320])),
            ("SensingMethod", short(2)),
            ("SceneType", bytes(&[1])),
            ("ExposureMode", short(0)),
            ("DigitalZoomRatio", rational(1, 1)),
            ("SceneCaptureType", short(0)),
            (
                "LensSpecification",
                TagValue::Rational(vec![(154, 100), (989, 100), (18, 10), (24, 10)])
            ),
            ("LensMake", ascii("Samsung")),
            ("LensModel", ascii("Samsung S5KHM3 24mm f/1.8")),
        ]),
        profile!("Xiaomi 12 Pro", [
            ("Make", ascii("Xiaomi")),
            ("Model", ascii("2201122C")),
            ("Software", ascii("MIUI 13")),
            ("DateTime", ascii("2024:01:20 15:30:00")),
            ("DateTimeOriginal", ascii("2024:01:20 15:30:00")),
            ("DateTimeDigitized", ascii("2024:01:20 15:30:00")),
            ("ExifVersion", bytes(b"0220")),
            ("ComponentsConfiguration", bytes(&[1, 2, 3, 0])),
            ("ShutterSpeedValue", srational(6022, 1000)),
            ("ApertureValue", rational(19, 10)),
            ("ExposureTime", rational(1, 90)),
            ("FNumber", rational(19, 10)),
            ("ExposureProgram", short(2)),
            ("ISOSpeedRatings", short(64)),
            ("ExifImageWidth", long(4096)),
            ("ExifImageHeight", long(3072)),
            ("FocalLength", rational(50, 10)),
            ("FocalLengthIn35mmFilm", short(24)),
            ("ColorSpace", short(1)),
            ("WhiteBalance", short(0)),
            ("BrightnessValue", srational(812, 100)),
            ("MeteringMode", short(5)),
            ("Flash", short(0)),
            ("SubjectArea", TagValue::Short(vec![2048, 1536, 2200, 1350])),
            ("SensingMethod", short(2)),
            ("SceneType", bytes(&[1])),
            ("ExposureMode", short(0)),
            ("DigitalZoomRatio", rational(1, 1)),
            ("SceneCaptureType", short(0)),
            (
                "LensSpecification",
                TagValue::Rational(vec![(154, 100), (789, 100), (19, 10), (24, 10)])
            ),
            ("LensMake", ascii("Sony")),
            ("LensModel", ascii("Sony IMX707 24mm f/1.9")),
        ]),
    ]
}

/// Look up a built-in profile by name, case-insensitively.
pub fn find_preset(name: &str) -> Option<PresetProfile> {
    builtin_presets()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}
