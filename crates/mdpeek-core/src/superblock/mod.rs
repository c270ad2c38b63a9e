//! md version-1.x superblock decoding.
//!
//! The parser locates the superblock (offset 0 for a 1.1 layout, the 4 KiB
//! aligned offset for 1.2), validates the magic number, then walks the five
//! fixed areas, the variable-length device-role table and the optional data
//! sample in a single forward pass. Byte geometry lives in `layout`, the
//! primitive tagged reads in `reader`.
//!
//! Errors are explicit and actionable (wrong magic, stream ending inside a
//! field, an implausible device count). Only the trailing data sample is
//! allowed to be missing; everything before it is mandatory.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::parse_superblock;
