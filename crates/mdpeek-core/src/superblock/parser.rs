use std::io::Read;

use super::error::SuperblockError;
use super::layout;
use super::reader::FieldReader;
use crate::{
    Document, FieldValue, SECTION_ARRAY_CONFIG, SECTION_ARRAY_STATE, SECTION_BITMAP, SECTION_DATA,
    SECTION_DEVICE_INFO, SECTION_DEVICE_ROLES, SECTION_IDENTIFICATION, SECTION_RESHAPE, Section,
};

/// Decode one md version-1.x superblock from the start of `input`.
///
/// The stream must begin at byte 0 of the member device (or a dump of it).
/// A leading zero word switches the parser to the 4 KiB aligned layout used
/// by version 1.2 before the magic number is checked.
///
/// # Errors
/// Returns [`SuperblockError::FormatMismatch`] when the magic number is
/// absent, [`SuperblockError::UnexpectedEndOfStream`] when the stream ends
/// inside a mandatory field, and [`SuperblockError::Io`] when the underlying
/// reader fails. A stream that ends before the data region only loses the
/// optional `Data` section.
pub fn parse_superblock<R: Read>(input: R) -> Result<Document, SuperblockError> {
    let mut reader = FieldReader::new(input);

    let mut superblock_start = 0u64;
    let mut magic = reader.le_u32()?;
    if magic == 0 {
        reader.skip(layout::ALIGNED_SUPERBLOCK_OFFSET - 4)?;
        superblock_start = layout::ALIGNED_SUPERBLOCK_OFFSET;
        magic = reader.le_u32()?;
    }
    if magic != layout::MD_MAGIC {
        return Err(SuperblockError::FormatMismatch {
            expected: layout::MD_MAGIC,
            actual: magic,
        });
    }

    let mut identification = Section::new(SECTION_IDENTIFICATION);
    identification.push("magic", FieldValue::U32(magic));
    identification.push("major_version", reader.read_u32()?);
    identification.push("feature_map", reader.read_bits32()?);
    identification.push("pad0", reader.read_raw(4)?);

    let mut config = Section::new(SECTION_ARRAY_CONFIG);
    config.push("set_uuid", reader.read_raw(layout::UUID_LEN)?);
    config.push("set_name", reader.read_text(layout::SET_NAME_LEN)?);
    config.push("ctime", reader.read_u64()?);
    config.push("level", reader.read_u32()?);
    config.push("layout", reader.read_u32()?);
    config.push("size", reader.read_u64()?);
    config.push("chunksize", reader.read_u32()?);
    let raid_disks = reader.le_u32()?;
    config.push("raid_disks", FieldValue::U32(raid_disks));
    let bitmap_offset = reader.le_i32()?;
    config.push("bitmap_offset", FieldValue::I32(bitmap_offset));

    let mut reshape = Section::new(SECTION_RESHAPE);
    reshape.push("new_level", reader.read_u32()?);
    reshape.push("reshape_position", reader.read_u64()?);
    reshape.push("delta_disks", reader.read_u32()?);
    reshape.push("new_layout", reader.read_u32()?);
    reshape.push("new_chunk", reader.read_u32()?);
    reshape.push("pad1", reader.read_raw(4)?);

    let mut device_info = Section::new(SECTION_DEVICE_INFO);
    let data_offset = reader.le_u64()?;
    device_info.push("data_offset", FieldValue::U64(data_offset));
    device_info.push("data_size", reader.read_u64()?);
    device_info.push("super_offset", reader.read_u64()?);
    device_info.push("recovery_offset", reader.read_u64()?);
    device_info.push("dev_number", reader.read_u32()?);
    device_info.push("cnt_corrected_read", reader.read_u32()?);
    device_info.push("device_uuid", reader.read_raw(layout::UUID_LEN)?);
    device_info.push("devflags", reader.read_bits8()?);
    device_info.push("pad2", reader.read_raw(7)?);

    let mut array_state = Section::new(SECTION_ARRAY_STATE);
    array_state.push("utime", reader.read_u64()?);
    array_state.push("events", reader.read_u64()?);
    array_state.push("resync_offset", reader.read_u64()?);
    array_state.push("sb_csum", reader.read_u32()?);
    array_state.push("max_dev", reader.read_u32()?);
    array_state.push("pad3", reader.read_raw(32)?);

    // Counts past the 0x300-byte reserved area are legal and extend the
    // region, but a count past MAX_RAID_DISKS can only come from a corrupt
    // or foreign block.
    if raid_disks > layout::MAX_RAID_DISKS {
        return Err(SuperblockError::InvalidField {
            field: "raid_disks",
            reason: "device count is implausibly large",
        });
    }

    let mut roles = Section::new(SECTION_DEVICE_ROLES);
    for index in 0..raid_disks {
        roles.push(
            format!("role{index}"),
            reader.read_raw(layout::ROLE_ENTRY_SIZE)?,
        );
    }
    let used = raid_disks as usize * layout::ROLE_ENTRY_SIZE;
    if used < layout::ROLES_AREA_SIZE {
        roles.push("remaining", reader.read_raw(layout::ROLES_AREA_SIZE - used)?);
    }

    // Computed, not read: sector offset relative to the superblock, scaled
    // to an absolute byte offset. Negative offsets (bitmap before the
    // superblock) wrap in the stored u32.
    let mut bitmap = Section::new(SECTION_BITMAP);
    let bitmap_total =
        i64::from(bitmap_offset) * layout::SECTOR_SIZE as i64 + superblock_start as i64;
    bitmap.push("total_offset_in_bytes", FieldValue::U32(bitmap_total as u32));

    let mut document = Document {
        sections: vec![
            identification,
            config,
            reshape,
            device_info,
            array_state,
            roles,
            bitmap,
        ],
    };

    if let Some(data) = read_data_sample(&mut reader, data_offset)? {
        document.sections.push(data);
    }

    Ok(document)
}

/// Sample the first sector of the data region, when the stream reaches it.
///
/// `data_offset` counts sectors from the start of the device, so the target
/// is absolute. A target that overflows or lies behind the bytes already
/// consumed is unreachable on a forward-only stream; a stream that simply
/// ends first is a short dump. Both cases drop the section instead of
/// failing the whole decode.
fn read_data_sample<R: Read>(
    reader: &mut FieldReader<R>,
    data_offset: u64,
) -> Result<Option<Section>, SuperblockError> {
    let target = match data_offset.checked_mul(layout::SECTOR_SIZE) {
        Some(target) => target,
        None => return Ok(None),
    };
    let gap = match target.checked_sub(reader.position()) {
        Some(gap) => gap,
        None => return Ok(None),
    };

    let sampled = reader
        .skip(gap)
        .and_then(|_| reader.read_raw(layout::DATA_SAMPLE_SIZE));
    match sampled {
        Ok(sample) => {
            let mut section = Section::new(SECTION_DATA);
            section.push("first512bytes", sample);
            Ok(Some(section))
        }
        Err(SuperblockError::UnexpectedEndOfStream { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_superblock;
    use crate::superblock::error::SuperblockError;
    use crate::superblock::layout;
    use crate::{
        FieldValue, SECTION_ARRAY_CONFIG, SECTION_BITMAP, SECTION_DATA, SECTION_DEVICE_ROLES,
    };
    use std::io::{self, Cursor, Read};

    fn minimal_image(raid_disks: u32) -> Vec<u8> {
        let mut image = vec![0u8; 0x400];
        image[..4].copy_from_slice(&layout::MD_MAGIC.to_le_bytes());
        image[92..96].copy_from_slice(&raid_disks.to_le_bytes());
        image
    }

    // Serves the wrapped bytes, then fails instead of reporting end of stream.
    struct FailingTail(Cursor<Vec<u8>>);

    impl Read for FailingTail {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.read(buf) {
                Ok(0) => Err(io::Error::other("device gone")),
                other => other,
            }
        }
    }

    // Raises Interrupted before every productive read.
    struct Interrupting {
        inner: Cursor<Vec<u8>>,
        ready: bool,
    }

    impl Read for Interrupting {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.ready {
                self.ready = false;
                self.inner.read(buf)
            } else {
                self.ready = true;
                Err(io::Error::new(io::ErrorKind::Interrupted, "signal"))
            }
        }
    }

    #[test]
    fn parses_minimal_version_1_1_image() {
        let document = parse_superblock(Cursor::new(minimal_image(1))).unwrap();
        assert_eq!(document.sections.len(), 7);

        let config = document.section(SECTION_ARRAY_CONFIG).unwrap();
        assert_eq!(config.field("raid_disks"), Some(&FieldValue::U32(1)));

        let roles = document.section(SECTION_DEVICE_ROLES).unwrap();
        assert_eq!(roles.fields.len(), 2);
        assert_eq!(roles.fields[0].name, "role0");
        assert_eq!(roles.field("remaining"), Some(&FieldValue::Raw(vec![0; 766])));

        let bitmap = document.section(SECTION_BITMAP).unwrap();
        assert_eq!(bitmap.field("total_offset_in_bytes"), Some(&FieldValue::U32(0)));
    }

    #[test]
    fn finds_aligned_superblock_after_zero_word() {
        let mut image = vec![0u8; 0x1400];
        image[0x1000..0x1004].copy_from_slice(&layout::MD_MAGIC.to_le_bytes());
        let document = parse_superblock(Cursor::new(image)).unwrap();

        let bitmap = document.section(SECTION_BITMAP).unwrap();
        assert_eq!(
            bitmap.field("total_offset_in_bytes"),
            Some(&FieldValue::U32(0x1000))
        );
        assert!(document.section(SECTION_DATA).is_none());
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut image = minimal_image(0);
        image[..4].copy_from_slice(&0xdead_beefu32.to_le_bytes());
        match parse_superblock(Cursor::new(image)).unwrap_err() {
            SuperblockError::FormatMismatch { expected, actual } => {
                assert_eq!(expected, layout::MD_MAGIC);
                assert_eq!(actual, 0xdead_beef);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reads_data_sample_at_sector_boundary() {
        let mut image = minimal_image(0);
        image[128..136].copy_from_slice(&2u64.to_le_bytes());
        image.extend_from_slice(&[0xab; 512]);

        let document = parse_superblock(Cursor::new(image)).unwrap();
        let data = document.section(SECTION_DATA).unwrap();
        assert_eq!(
            data.field("first512bytes"),
            Some(&FieldValue::Raw(vec![0xab; 512]))
        );
    }

    #[test]
    fn omits_data_section_when_stream_ends_first() {
        let mut image = minimal_image(0);
        image[128..136].copy_from_slice(&2u64.to_le_bytes());
        image.extend_from_slice(&[0xab; 100]);

        let document = parse_superblock(Cursor::new(image)).unwrap();
        assert_eq!(document.sections.len(), 7);
        assert!(document.section(SECTION_DATA).is_none());
    }

    #[test]
    fn io_error_during_data_sample_is_fatal() {
        let mut image = minimal_image(0);
        image[128..136].copy_from_slice(&2u64.to_le_bytes());

        let result = parse_superblock(FailingTail(Cursor::new(image)));
        assert!(matches!(result, Err(SuperblockError::Io(_))));
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let mut image = minimal_image(0);
        image[128..136].copy_from_slice(&3u64.to_le_bytes());
        image.extend_from_slice(&[0u8; 512]);
        image.extend_from_slice(&[0xab; 512]);

        let interrupted = parse_superblock(Interrupting {
            inner: Cursor::new(image.clone()),
            ready: false,
        })
        .unwrap();
        assert!(interrupted.section(SECTION_DATA).is_some());
        assert_eq!(interrupted, parse_superblock(Cursor::new(image)).unwrap());
    }

    #[test]
    fn rejects_oversized_device_count() {
        let image = minimal_image(70_000);
        match parse_superblock(Cursor::new(image)).unwrap_err() {
            SuperblockError::InvalidField { field, .. } => assert_eq!(field, "raid_disks"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
