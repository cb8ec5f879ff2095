//! Static EXIF tag table: id ↔ name ↔ declared type, namespaced by IFD group.
//!
//! Built once as static data instead of scattering tag literals through the
//! codec. Coverage targets the common consumer tag set — camera/device
//! identification, capture settings, and GPS — not the full EXIF standard.

/// The IFD sub-table a tag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IfdGroup {
    /// IFD0 — primary image.
    Primary,
    /// IFD1 — thumbnail.
    Thumbnail,
    /// Exif-specific sub-IFD.
    Exif,
    /// GPS sub-IFD.
    Gps,
    /// Interoperability sub-IFD.
    Interop,
}

impl IfdGroup {
    /// Group search order for name-keyed writes: first match wins.
    pub const WRITE_PRIORITY: [IfdGroup; 4] = [
        IfdGroup::Primary,
        IfdGroup::Thumbnail,
        IfdGroup::Exif,
        IfdGroup::Gps,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IfdGroup::Primary => "Primary",
            IfdGroup::Thumbnail => "Thumbnail",
            IfdGroup::Exif => "Exif",
            IfdGroup::Gps => "GPS",
            IfdGroup::Interop => "Interop",
        }
    }
}

/// Declared value type of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagType {
    Ascii,
    Byte,
    Short,
    Long,
    Rational,
    SRational,
    Undefined,
}

/// One row of the tag table.
#[derive(Debug, Clone, Copy)]
pub struct TagDef {
    pub id: u16,
    pub group: IfdGroup,
    pub name: &'static str,
    pub ty: TagType,
}

macro_rules! tag {
    ($id:literal, $group:ident, $name:literal, $ty:ident) => {
        TagDef {
            id: $id,
            group: IfdGroup::$group,
            name: $name,
            ty: TagType::$ty,
        }
    };
}

/// The common consumer tag set. Unique per (group, id) and per (group, name).
pub static TAG_TABLE: &[TagDef] = &[
    // Primary image (IFD0)
    tag!(0x010E, Primary, "ImageDescription", Ascii),
    tag!(0x010F, Primary, "Make", Ascii),
    tag!(0x0110, Primary, "Model", Ascii),
    tag!(0x0112, Primary, "Orientation", Short),
    tag!(0x011A, Primary, "XResolution", Rational),
    tag!(0x011B, Primary, "YResolution", Rational),
    tag!(0x0128, Primary, "ResolutionUnit", Short),
    tag!(0x0131, Primary, "Software", Ascii),
    tag!(0x0132, Primary, "DateTime", Ascii),
    tag!(0x013B, Primary, "Artist", Ascii),
    tag!(0x0213, Primary, "YCbCrPositioning", Short),
    tag!(0x8298, Primary, "Copyright", Ascii),
    // Thumbnail (IFD1)
    tag!(0x0103, Thumbnail, "Compression", Short),
    tag!(0x0201, Thumbnail, "JPEGInterchangeFormat", Long),
    tag!(0x0202, Thumbnail, "JPEGInterchangeFormatLength", Long),
    // Exif sub-IFD
    tag!(0x829A, Exif, "ExposureTime", Rational),
    tag!(0x829D, Exif, "FNumber", Rational),
    tag!(0x8822, Exif, "ExposureProgram", Short),
    tag!(0x8827, Exif, "ISOSpeedRatings", Short),
    tag!(0x8830, Exif, "SensitivityType", Short),
    tag!(0x9000, Exif, "ExifVersion", Undefined),
    tag!(0x9003, Exif, "DateTimeOriginal", Ascii),
    tag!(0x9004, Exif, "DateTimeDigitized", Ascii),
    tag!(0x9101, Exif, "ComponentsConfiguration", Undefined),
    tag!(0x9102, Exif, "CompressedBitsPerPixel", Rational),
    tag!(0x9201, Exif, "ShutterSpeedValue", SRational),
    tag!(0x9202, Exif, "ApertureValue", Rational),
    tag!(0x9203, Exif, "BrightnessValue", SRational),
    tag!(0x9204, Exif, "ExposureBiasValue", SRational),
    tag!(0x9205, Exif, "MaxApertureValue", Rational),
    tag!(0x9206, Exif, "SubjectDistance", Rational),
    tag!(0x9207, Exif, "MeteringMode", Short),
    tag!(0x9208, Exif, "LightSource", Short),
    tag!(0x9209, Exif, "Flash", Short),
    tag!(0x920A, Exif, "FocalLength", Rational),
    tag!(0x9214, Exif, "SubjectArea", Short),
    tag!(0x9286, Exif, "UserComment", Undefined),
    tag!(0x9290, Exif, "SubSecTime", Ascii),
    tag!(0x9291, Exif, "SubSecTimeOriginal", Ascii),
    tag!(0x9292, Exif, "SubSecTimeDigitized", Ascii),
    tag!(0xA000, Exif, "FlashpixVersion", Undefined),
    tag!(0xA001, Exif, "ColorSpace", Short),
    tag!(0xA002, Exif, "ExifImageWidth", Long),
    tag!(0xA003, Exif, "ExifImageHeight", Long),
    tag!(0xA20E, Exif, "FocalPlaneXResolution", Rational),
    tag!(0xA20F, Exif, "FocalPlaneYResolution", Rational),
    tag!(0xA210, Exif, "FocalPlaneResolutionUnit", Short),
    tag!(0xA217, Exif, "SensingMethod", Short),
    tag!(0xA300, Exif, "FileSource", Undefined),
    tag!(0xA301, Exif, "SceneType", Undefined),
    tag!(0xA401, Exif, "CustomRendered", Short),
    tag!(0xA402, Exif, "ExposureMode", Short),
    tag!(0xA403, Exif, "WhiteBalance", Short),
    tag!(0xA404, Exif, "DigitalZoomRatio", Rational),
    tag!(0xA405, Exif, "FocalLengthIn35mmFilm", Short),
    tag!(0xA406, Exif, "SceneCaptureType", Short),
    tag!(0xA407, Exif, "GainControl", Short),
    tag!(0xA408, Exif, "Contrast", Short),
    tag!(0xA409, Exif, "Saturation", Short),
    tag!(0xA40A, Exif, "Sharpness", Short),
    tag!(0xA40C, Exif, "SubjectDistanceRange", Short),
    tag!(0xA432, Exif, "LensSpecification", Rational),
    tag!(0xA433, Exif, "LensMake", Ascii),
    tag!(0xA434, Exif, "LensModel", Ascii),
    // GPS sub-IFD
    tag!(0x0000, Gps, "GPSVersionID", Byte),
    tag!(0x0001, Gps, "GPSLatitudeRef", Ascii),
    tag!(0x0002, Gps, "GPSLatitude", Rational),
    tag!(0x0003, Gps, "GPSLongitudeRef", Ascii),
    tag!(0x0004, Gps, "GPSLongitude", Rational),
    tag!(0x0005, Gps, "GPSAltitudeRef", Byte),
    tag!(0x0006, Gps, "GPSAltitude", Rational),
    tag!(0x0007, Gps, "GPSTimeStamp", Rational),
    tag!(0x0012, Gps, "GPSMapDatum", Ascii),
    tag!(0x001B, Gps, "GPSProcessingMethod", Undefined),
    tag!(0x001D, Gps, "GPSDateStamp", Ascii),
    // Interoperability sub-IFD
    tag!(0x0001, Interop, "InteroperabilityIndex", Ascii),
];

/// Resolve a tag name within the group search priority; first match wins.
pub fn find_tag(name: &str) -> Option<&'static TagDef> {
    for group in IfdGroup::WRITE_PRIORITY {
        if let Some(def) = TAG_TABLE
            .iter()
            .find(|d| d.group == group && d.name == name)
        {
            return Some(def);
        }
    }
    None
}

/// Resolve the human-readable name of a (group, id) pair, if known.
pub fn tag_name(group: IfdGroup, id: u16) -> Option<&'static str> {
    TAG_TABLE
        .iter()
        .find(|d| d.group == group && d.id == id)
        .map(|d| d.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_is_unique_per_group() {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for def in TAG_TABLE {
            assert!(ids.insert((def.group, def.id)), "duplicate id {:#06x}", def.id);
            assert!(names.insert((def.group, def.name)), "duplicate name {}", def.name);
        }
    }

    #[test]
    fn find_tag_resolves_common_names() {
        assert_eq!(find_tag("Make").unwrap().id, 0x010F);
        assert_eq!(find_tag("Make").unwrap().group, IfdGroup::Primary);
        assert_eq!(find_tag("ExposureTime").unwrap().group, IfdGroup::Exif);
        assert_eq!(find_tag("GPSLatitude").unwrap().group, IfdGroup::Gps);
        assert!(find_tag("NotARealTag").is_none());
    }

    #[test]
    fn find_tag_respects_group_priority() {
        // DateTime lives in the primary group; the Exif group holds the
        // DateTimeOriginal/DateTimeDigitized variants under other names.
        let def = find_tag("DateTime").unwrap();
        assert_eq!(def.group, IfdGroup::Primary);
        assert_eq!(def.id, 0x0132);
    }

    #[test]
    fn tag_name_roundtrip() {
        assert_eq!(tag_name(IfdGroup::Exif, 0x9203), Some("BrightnessValue"));
        assert_eq!(tag_name(IfdGroup::Gps, 0x0002), Some("GPSLatitude"));
        assert_eq!(tag_name(IfdGroup::Primary, 0xBEEF), None);
    }

    #[test]
    fn declared_types_match_exif_spec() {
        assert_eq!(find_tag("Make").unwrap().ty, TagType::Ascii);
        assert_eq!(find_tag("ISOSpeedRatings").unwrap().ty, TagType::Short);
        assert_eq!(find_tag("ExifImageWidth").unwrap().ty, TagType::Long);
        assert_eq!(find_tag("ExposureTime").unwrap().ty, TagType::Rational);
        assert_eq!(find_tag("BrightnessValue").unwrap().ty, TagType::SRational);
    }
}
