//! mdpeek core library for Linux software-RAID superblock inspection.
//!
//! This crate decodes the on-disk superblock of an md array member device
//! (version-1.x layout family) into an ordered, typed [`Document`]. The
//! decoder is layered as layout/reader/parser: `layout` holds the wire
//! geometry, `reader` performs primitive tagged field reads, and `parser`
//! drives them through the fixed section sequence. Decoding is a single
//! forward pass over a byte stream supplied by the caller; all I/O
//! acquisition (device open, stdin) stays outside this crate.
//!
//! Invariants:
//! - Sections appear in on-disk order and are never reordered or dropped
//!   (the trailing `Data` sample is optional, everything else mandatory).
//! - Field order inside a section mirrors byte order on disk.
//! - A returned `Document` owns all decoded bytes; nothing borrows from
//!   the input stream.
//! - Decoding is all-or-nothing except for the explicitly tolerated
//!   `Data` section.
//!
//! # Examples
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use mdpeek_core::parse_superblock;
//!
//! let input = BufReader::new(File::open("/dev/sdb1")?);
//! let document = parse_superblock(input)?;
//! for section in &document.sections {
//!     println!("{} ({} fields)", section.name, section.fields.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod superblock;

pub use superblock::error::SuperblockError;
pub use superblock::parse_superblock;
pub use superblock::reader::FieldReader;

/// Superblock/"Magic-Number" identification area (section 1).
pub const SECTION_IDENTIFICATION: &str = "Superblock/\"Magic-Number\" Identification area";
/// Per-array identification and configuration area (section 2).
pub const SECTION_ARRAY_CONFIG: &str = "Per-Array Identification & Configuration area";
/// Reshape-in-process metadata area (section 3).
pub const SECTION_RESHAPE: &str = "RAID-Reshape In-Process Metadata Storage/Recovery area";
/// Per-component-device information area (section 4).
pub const SECTION_DEVICE_INFO: &str = "This-Component-Device Information area";
/// Array-state information area (section 5).
pub const SECTION_ARRAY_STATE: &str = "Array-State Information area";
/// Device-roles table (section 6, sized by `raid_disks`).
pub const SECTION_DEVICE_ROLES: &str = "Device-Roles (Positions-in-Array) area";
/// Synthetic section holding the computed write-intent-bitmap offset.
pub const SECTION_BITMAP: &str = "Bitmap";
/// Optional section holding the first 512 bytes of the data region.
pub const SECTION_DATA: &str = "Data";

/// A decoded value tagged with its wire encoding kind.
///
/// The kind records how the bytes were read (width, endianness, signedness)
/// so a renderer can pick a display form without reinterpreting anything:
/// hex for the integer and raw kinds, binary for the bit-field kinds,
/// opaque bytes for text. `Bits32` and `Bits8` share their wire layout with
/// `U32` and a single raw byte; they differ only in display intent.
///
/// # Examples
/// ```
/// use mdpeek_core::FieldValue;
///
/// let value = FieldValue::U32(0xa92b_4efc);
/// assert_eq!(value.as_u32(), Some(0xa92b_4efc));
/// assert_eq!(value.wire_bytes(), vec![0xfc, 0x4e, 0x2b, 0xa9]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Unsigned 32-bit little-endian integer.
    U32(u32),
    /// Unsigned 64-bit little-endian integer.
    U64(u64),
    /// Signed 32-bit little-endian integer.
    I32(i32),
    /// 32-bit bit-field (u32 wire layout, binary display).
    Bits32(u32),
    /// 8-bit bit-field (single byte, binary display).
    Bits8(u8),
    /// Raw bytes (hex display).
    Raw(Vec<u8>),
    /// Fixed-length text, neither validated nor trimmed.
    Text(Vec<u8>),
}

impl FieldValue {
    /// The value when tagged `U32`.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            FieldValue::U32(value) => Some(*value),
            _ => None,
        }
    }

    /// The value when tagged `U64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::U64(value) => Some(*value),
            _ => None,
        }
    }

    /// The value when tagged `I32`.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            FieldValue::I32(value) => Some(*value),
            _ => None,
        }
    }

    /// The payload bytes when tagged `Raw` or `Text`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Raw(bytes) | FieldValue::Text(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Re-encode the value to its on-disk bytes under the tagged kind.
    ///
    /// Concatenating the wire bytes of every field of the on-disk sections
    /// in document order reproduces the decoded portion of the input
    /// stream; the synthetic `Bitmap` section is the one part of a
    /// document with no wire representation.
    ///
    /// # Examples
    /// ```
    /// use mdpeek_core::FieldValue;
    ///
    /// assert_eq!(FieldValue::U64(1).wire_bytes().len(), 8);
    /// assert_eq!(FieldValue::Bits8(0b1010_0001).wire_bytes(), vec![0xa1]);
    /// assert_eq!(FieldValue::Raw(vec![1, 2]).wire_bytes(), vec![1, 2]);
    /// ```
    pub fn wire_bytes(&self) -> Vec<u8> {
        match self {
            FieldValue::U32(value) => value.to_le_bytes().to_vec(),
            FieldValue::U64(value) => value.to_le_bytes().to_vec(),
            FieldValue::I32(value) => value.to_le_bytes().to_vec(),
            FieldValue::Bits32(value) => value.to_le_bytes().to_vec(),
            FieldValue::Bits8(value) => vec![*value],
            FieldValue::Raw(bytes) | FieldValue::Text(bytes) => bytes.clone(),
        }
    }
}

/// One named, decoded field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Stable field name (e.g. `magic`, `raid_disks`, `role0`).
    pub name: String,
    /// Decoded value with its encoding kind.
    pub value: FieldValue,
}

/// An ordered run of fields covering one on-disk area.
///
/// # Examples
/// ```
/// use mdpeek_core::{FieldValue, Section};
///
/// let mut section = Section::new("Bitmap");
/// section.push("total_offset_in_bytes", FieldValue::U32(4096));
/// assert_eq!(section.field("total_offset_in_bytes"), Some(&FieldValue::U32(4096)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section name; one of the `SECTION_*` constants in decoder output.
    pub name: String,
    /// Fields in on-disk order.
    pub fields: Vec<Field>,
}

impl Section {
    /// Create an empty section.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field, preserving insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push(Field {
            name: name.into(),
            value,
        });
    }

    /// Look up a field value by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }
}

/// The complete decoded superblock, sections in on-disk order.
///
/// # Examples
/// ```
/// use mdpeek_core::{Document, Section};
///
/// let document = Document {
///     sections: vec![Section::new("Bitmap")],
/// };
/// assert!(document.section("Bitmap").is_some());
/// assert!(document.section("Data").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Sections in the fixed decode order.
    pub sections: Vec<Section>,
}

impl Document {
    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }
}
