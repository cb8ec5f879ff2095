//! EXIF metadata reading and writing.
//!
//! This module provides the metadata codec:
//!
//! - [`read_metadata`] — Parse the embedded EXIF block into a [`MetadataRecord`]
//! - [`write_metadata`] — Rewrite named fields with declared-type coercion and
//!   atomic temp-file replacement
//!
//! Tag identifiers are namespaced by IFD group (primary image, thumbnail,
//! Exif-specific, GPS, interoperability). The static tag table in [`tags`]
//! maps numeric ids to human-readable names and declared value types.

pub mod tags;

mod reader;
mod writer;

pub use reader::read_metadata;
pub use writer::{coerce, resolve_field, write_fields, write_metadata};

pub(crate) use writer::temp_sibling;

use tags::{IfdGroup, tag_name};

/// A typed EXIF value.
///
/// Multi-valued tags (GPS coordinates, subject area, lens specification)
/// carry all of their components in one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// NUL-terminated text in the container; decoded as UTF-8 on read.
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    /// Unsigned numerator/denominator pairs.
    Rational(Vec<(u32, u32)>),
    /// Signed numerator/denominator pairs (APEX fields).
    SRational(Vec<(i32, i32)>),
    /// Raw bytes — BYTE and UNDEFINED tags, and anything preserved opaquely.
    Bytes(Vec<u8>),
}

impl std::fmt::Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn join<T: std::fmt::Display>(
            f: &mut std::fmt::Formatter<'_>,
            vals: &[T],
        ) -> std::fmt::Result {
            for (i, v) in vals.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{v}")?;
            }
            Ok(())
        }

        fn join_pairs<T: std::fmt::Display>(
            f: &mut std::fmt::Formatter<'_>,
            vals: &[(T, T)],
        ) -> std::fmt::Result {
            for (i, (n, d)) in vals.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{n}/{d}")?;
            }
            Ok(())
        }

        match self {
            TagValue::Ascii(s) => write!(f, "{s}"),
            TagValue::Short(v) => join(f, v),
            TagValue::Long(v) => join(f, v),
            TagValue::Rational(v) => join_pairs(f, v),
            TagValue::SRational(v) => join_pairs(f, v),
            TagValue::Bytes(b) => {
                if b.len() <= 16 {
                    write!(f, "{b:?}")
                } else {
                    write!(f, "({} bytes)", b.len())
                }
            }
        }
    }
}

/// One decoded metadata entry: a tag in an IFD group with its value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub group: IfdGroup,
    pub tag_id: u16,
    pub value: TagValue,
}

impl MetadataEntry {
    /// Human-readable tag name, falling back to the raw numeric id for tags
    /// the table does not know.
    pub fn display_name(&self) -> String {
        match tag_name(self.group, self.tag_id) {
            Some(name) => name.to_string(),
            None => format!("Tag(0x{:04x})", self.tag_id),
        }
    }
}

/// Ordered collection of metadata entries, unique per (group, tag id).
///
/// An empty record is the "no metadata" sentinel — reading a file without an
/// EXIF block succeeds and returns this; it is not an error.
#[derive(Debug, Clone, Default)]
pub struct MetadataRecord {
    entries: Vec<MetadataEntry>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataEntry> {
        self.entries.iter()
    }

    pub fn get(&self, group: IfdGroup, tag_id: u16) -> Option<&MetadataEntry> {
        self.entries
            .iter()
            .find(|e| e.group == group && e.tag_id == tag_id)
    }

    /// Look up an entry by table name, searching groups in write-priority
    /// order (primary, thumbnail, Exif, GPS).
    pub fn get_by_name(&self, name: &str) -> Option<&MetadataEntry> {
        let def = tags::find_tag(name)?;
        self.get(def.group, def.id)
    }

    /// Insert an entry, replacing any existing entry for the same tag so the
    /// uniqueness invariant holds.
    pub fn insert(&mut self, entry: MetadataEntry) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.group == entry.group && e.tag_id == entry.tag_id)
        {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_is_sentinel() {
        let record = MetadataRecord::new();
        assert!(record.is_empty());
        assert_eq!(record.len(), 0);
    }

    #[test]
    fn insert_replaces_duplicate_tag() {
        let mut record = MetadataRecord::new();
        record.insert(MetadataEntry {
            group: IfdGroup::Primary,
            tag_id: 0x010F,
            value: TagValue::Ascii("Apple".into()),
        });
        record.insert(MetadataEntry {
            group: IfdGroup::Primary,
            tag_id: 0x010F,
            value: TagValue::Ascii("SAMSUNG".into()),
        });
        assert_eq!(record.len(), 1);
        assert_eq!(
            record.get(IfdGroup::Primary, 0x010F).unwrap().value,
            TagValue::Ascii("SAMSUNG".into())
        );
    }

    #[test]
    fn display_name_falls_back_to_raw_id() {
        let entry = MetadataEntry {
            group: IfdGroup::Primary,
            tag_id: 0xBEEF,
            value: TagValue::Short(vec![1]),
        };
        assert_eq!(entry.display_name(), "Tag(0xbeef)");

        let known = MetadataEntry {
            group: IfdGroup::Primary,
            tag_id: 0x010F,
            value: TagValue::Ascii("Apple".into()),
        };
        assert_eq!(known.display_name(), "Make");
    }

    #[test]
    fn get_by_name_resolves_through_table() {
        let mut record = MetadataRecord::new();
        record.insert(MetadataEntry {
            group: IfdGroup::Primary,
            tag_id: 0x0132,
            value: TagValue::Ascii("2024:01:20 15:30:00".into()),
        });
        let entry = record.get_by_name("DateTime").unwrap();
        assert_eq!(entry.group, IfdGroup::Primary);
    }

    #[test]
    fn value_display() {
        assert_eq!(TagValue::Rational(vec![(1, 60)]).to_string(), "1/60");
        assert_eq!(TagValue::Short(vec![4032]).to_string(), "4032");
        assert_eq!(TagValue::SRational(vec![(-50, 100)]).to_string(), "-50/100");
    }
}
