pub const MD_MAGIC: u32 = 0xa92b_4efc;

pub const ALIGNED_SUPERBLOCK_OFFSET: u64 = 0x1000;
pub const SECTOR_SIZE: u64 = 512;

pub const UUID_LEN: usize = 16;
pub const SET_NAME_LEN: usize = 32;

pub const ROLE_ENTRY_SIZE: usize = 2;
pub const ROLES_AREA_SIZE: usize = 0x300;
pub const MAX_RAID_DISKS: u32 = 65_536;

pub const DATA_SAMPLE_SIZE: usize = 512;
