//! Tar record header codecs: V7, UStar and GNU.
//!
//! A tar archive is a sequence of 512-byte blocks. Each entry starts with a
//! header block; the formats share the first 257 bytes and differ in what
//! follows:
//!
//! | Offset | Size | Field    | Format |
//! |--------|------|----------|--------|
//! | 0      | 100  | name     | V7     |
//! | 100    | 8    | mode     | V7     |
//! | 108    | 8    | uid      | V7     |
//! | 116    | 8    | gid      | V7     |
//! | 124    | 12   | size     | V7     |
//! | 136    | 12   | mtime    | V7     |
//! | 148    | 8    | checksum | V7     |
//! | 156    | 1    | typeflag | V7     |
//! | 157    | 100  | linkname | V7     |
//! | 257    | 6    | magic    | UStar  |
//! | 263    | 2    | version  | UStar  |
//! | 265    | 32   | uname    | UStar  |
//! | 297    | 32   | gname    | UStar  |
//! | 329    | 8    | devmajor | UStar  |
//! | 337    | 8    | devminor | UStar  |
//! | 345    | 155  | prefix   | UStar  |
//!
//! Decoding goes through [`TarRecord::decode`] for a single block, with a
//! [`TarFormat`] tag selecting how deep to parse, or through
//! [`gnu::read_record`] for a block stream that may carry the GNU `L`/`K`
//! long-name extension records. Encoding is [`TarRecord::encode`], which
//! reproduces the exact zero-padded octal fillers and the `%06o\0 `
//! checksum form that GNU tar emits.

mod error;
pub mod gnu;
mod record;

pub use error::{HeaderError, Result};
pub use record::{
    compute_checksum, is_end_of_archive, stamp_checksum, verify_checksum, TarFormat, TarRecord,
    TypeFlag, UstarFields, UstarLayout, V7Layout,
};

/// Magic string of UStar headers (`"ustar\0"`).
pub const USTAR_MAGIC: &[u8; 6] = b"ustar\0";

/// Version field of UStar headers (`"00"`).
pub const USTAR_VERSION: &[u8; 2] = b"00";

/// Width of the `name` field.
pub const NAME_LEN: usize = 100;

/// Width of the `linkname` field.
pub const LINK_LEN: usize = 100;

/// Width of the UStar `prefix` field.
pub const PREFIX_LEN: usize = 155;
