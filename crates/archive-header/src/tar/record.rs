//! Raw header layouts and the logical tar record.

use std::borrow::Cow;
use std::fmt;

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::entry::{ArchiveEntry, EntryKind};
use crate::owner::{NameService, NOBODY_GROUP, NOBODY_USER};
use crate::{byte_sum, format_octal, parse_numeric, parse_octal, truncate_null};
use crate::{Block, BLOCK_SIZE};

use super::error::{HeaderError, Result};
use super::{LINK_LEN, NAME_LEN, PREFIX_LEN, USTAR_MAGIC, USTAR_VERSION};

const CHECKSUM_OFFSET: usize = 148;
const CHECKSUM_LEN: usize = 8;
const UNAME_LEN: usize = 32;

// ============================================================================
// Raw layouts
// ============================================================================

/// On-disk layout of a V7 (original Unix) tar header block.
///
/// Everything after `linkname` is undefined in this format.
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct V7Layout {
    /// File path, NUL-terminated if shorter than the field.
    pub name: [u8; 100],
    /// Permission bits in octal ASCII.
    pub mode: [u8; 8],
    /// Owner user id in octal ASCII.
    pub uid: [u8; 8],
    /// Owner group id in octal ASCII.
    pub gid: [u8; 8],
    /// Content size in octal ASCII.
    pub size: [u8; 12],
    /// Modification time in octal ASCII.
    pub mtime: [u8; 12],
    /// Header checksum in octal ASCII.
    pub checksum: [u8; 8],
    /// Entry type tag.
    pub typeflag: u8,
    /// Link target for hard and symbolic links.
    pub linkname: [u8; 100],
    /// Reserved padding up to the block boundary.
    pub pad: [u8; 255],
}

/// On-disk layout of a UStar (POSIX.1-1988) tar header block.
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct UstarLayout {
    /// File path, NUL-terminated if shorter than the field.
    pub name: [u8; 100],
    /// Permission bits in octal ASCII.
    pub mode: [u8; 8],
    /// Owner user id in octal ASCII.
    pub uid: [u8; 8],
    /// Owner group id in octal ASCII.
    pub gid: [u8; 8],
    /// Content size in octal ASCII.
    pub size: [u8; 12],
    /// Modification time in octal ASCII.
    pub mtime: [u8; 12],
    /// Header checksum in octal ASCII.
    pub checksum: [u8; 8],
    /// Entry type tag.
    pub typeflag: u8,
    /// Link target for hard and symbolic links.
    pub linkname: [u8; 100],
    /// Format magic, `"ustar\0"`.
    pub magic: [u8; 6],
    /// Format version, `"00"`.
    pub version: [u8; 2],
    /// Owner user name, NUL-terminated.
    pub uname: [u8; 32],
    /// Owner group name, NUL-terminated.
    pub gname: [u8; 32],
    /// Device major number in octal ASCII.
    pub devmajor: [u8; 8],
    /// Device minor number in octal ASCII.
    pub devminor: [u8; 8],
    /// Directory prefix for paths longer than the name field.
    pub prefix: [u8; 155],
    /// Reserved padding up to the block boundary.
    pub pad: [u8; 12],
}

impl fmt::Debug for V7Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("V7Layout")
            .field("name", &String::from_utf8_lossy(truncate_null(&self.name)))
            .field("typeflag", &self.typeflag)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for UstarLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UstarLayout")
            .field("name", &String::from_utf8_lossy(truncate_null(&self.name)))
            .field("typeflag", &self.typeflag)
            .field("magic", &self.magic)
            .field(
                "prefix",
                &String::from_utf8_lossy(truncate_null(&self.prefix)),
            )
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tags
// ============================================================================

/// How deep to parse a header block.
///
/// V7 is the common 257-byte core; UStar adds names, device numbers and the
/// path prefix; GNU is UStar plus the `L`/`K` long-name records handled by
/// [`gnu::read_record`](super::gnu::read_record).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TarFormat {
    /// Original Unix tar.
    V7,
    /// POSIX UStar.
    Ustar,
    /// GNU tar (UStar layout plus extension records).
    Gnu,
}

/// Entry type tag stored at offset 156.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeFlag {
    /// Regular file (`'0'` or NUL).
    Regular,
    /// Hard link (`'1'`).
    HardLink,
    /// Symbolic link (`'2'`).
    Symlink,
    /// Character device (`'3'`).
    CharDevice,
    /// Block device (`'4'`).
    BlockDevice,
    /// Directory (`'5'`).
    Directory,
    /// FIFO (`'6'`).
    Fifo,
    /// Reserved tag (`'7'`); rejected during UStar decoding.
    Reserved,
    /// GNU long file name extension (`'L'`).
    LongName,
    /// GNU long link name extension (`'K'`).
    LongLink,
    /// Any other tag byte.
    Other(u8),
}

impl TypeFlag {
    /// Parse a type tag byte. NUL is treated as a regular file.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'0' | b'\0' => TypeFlag::Regular,
            b'1' => TypeFlag::HardLink,
            b'2' => TypeFlag::Symlink,
            b'3' => TypeFlag::CharDevice,
            b'4' => TypeFlag::BlockDevice,
            b'5' => TypeFlag::Directory,
            b'6' => TypeFlag::Fifo,
            b'7' => TypeFlag::Reserved,
            b'L' => TypeFlag::LongName,
            b'K' => TypeFlag::LongLink,
            other => TypeFlag::Other(other),
        }
    }

    /// The on-disk tag byte. Regular files are written as NUL.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            TypeFlag::Regular => b'\0',
            TypeFlag::HardLink => b'1',
            TypeFlag::Symlink => b'2',
            TypeFlag::CharDevice => b'3',
            TypeFlag::BlockDevice => b'4',
            TypeFlag::Directory => b'5',
            TypeFlag::Fifo => b'6',
            TypeFlag::Reserved => b'7',
            TypeFlag::LongName => b'L',
            TypeFlag::LongLink => b'K',
            TypeFlag::Other(b) => b,
        }
    }

    /// Returns true for directory entries.
    #[must_use]
    pub fn is_dir(self) -> bool {
        self == TypeFlag::Directory
    }
}

// ============================================================================
// Logical record
// ============================================================================

/// UStar extension fields of a [`TarRecord`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UstarFields {
    /// Owner user name.
    pub user_name: String,
    /// Owner group name.
    pub group_name: String,
    /// Device major number.
    pub device_major: u32,
    /// Device minor number.
    pub device_minor: u32,
}

/// A decoded tar header record.
///
/// The record stores the logical view: `path` is already recomposed from
/// the UStar prefix and name fields, and numeric fields are plain integers.
/// It is mutable until encoded; [`TarRecord::encode`] lays the fields back
/// out at their documented offsets and stamps a fresh checksum.
#[derive(Clone, PartialEq, Eq)]
pub struct TarRecord {
    /// Format this record was decoded from or will be encoded as.
    pub format: TarFormat,
    /// Entry path. Directories end with `/`, other entries do not.
    pub path: Vec<u8>,
    /// Permission bits.
    pub mode: u32,
    /// Owner user id.
    pub uid: u64,
    /// Owner group id.
    pub gid: u64,
    /// Content size in bytes.
    pub size: u64,
    /// Modification time, seconds since the epoch.
    pub mtime: u64,
    /// Checksum as stored in the header; refreshed on encode.
    pub checksum: u64,
    /// Entry type tag.
    pub type_flag: TypeFlag,
    /// Link target; empty for entries that are not links.
    pub link_target: Vec<u8>,
    /// UStar extension fields; `None` for V7 records.
    pub ustar: Option<UstarFields>,
}

impl TarRecord {
    /// Create an empty record of the given format.
    #[must_use]
    pub fn new(format: TarFormat) -> Self {
        Self {
            format,
            path: Vec::new(),
            mode: 0,
            uid: 0,
            gid: 0,
            size: 0,
            mtime: 0,
            checksum: 0,
            type_flag: TypeFlag::Regular,
            link_target: Vec::new(),
            ustar: (format != TarFormat::V7).then(UstarFields::default),
        }
    }

    /// Decode a header block.
    ///
    /// The checksum is verified first; the `format` tag then selects how
    /// much of the block is interpreted. UStar decoding recomposes the
    /// logical path from the prefix and name fields and rejects the
    /// reserved type tag.
    ///
    /// # Errors
    ///
    /// [`HeaderError::ChecksumMismatch`] if the block fails verification,
    /// [`HeaderError::ReservedType`] for type `'7'` under UStar/GNU, and
    /// [`HeaderError::InvalidOctal`] for malformed numeric fields.
    pub fn decode(block: &Block, format: TarFormat) -> Result<Self> {
        let stored = verify_checksum(block)?;

        let v7 = V7Layout::ref_from_bytes(block).expect("layout spans the block");
        let mut record = TarRecord {
            format,
            path: truncate_null(&v7.name).to_vec(),
            mode: parse_numeric(&v7.mode)? as u32,
            uid: parse_numeric(&v7.uid)?,
            gid: parse_numeric(&v7.gid)?,
            size: parse_numeric(&v7.size)?,
            mtime: parse_numeric(&v7.mtime)?,
            checksum: stored,
            type_flag: TypeFlag::from_byte(v7.typeflag),
            link_target: truncate_null(&v7.linkname).to_vec(),
            ustar: None,
        };

        if format == TarFormat::V7 {
            return Ok(record);
        }

        if record.type_flag == TypeFlag::Reserved {
            return Err(HeaderError::ReservedType);
        }

        let ustar = UstarLayout::ref_from_bytes(block).expect("layout spans the block");
        let prefix = truncate_null(&ustar.prefix);
        if !prefix.is_empty() {
            let name = truncate_null(&ustar.name);
            let mut path = Vec::with_capacity(prefix.len() + 1 + name.len());
            path.extend_from_slice(prefix);
            path.push(b'/');
            path.extend_from_slice(name);
            record.path = path;
        }

        record.ustar = Some(UstarFields {
            user_name: String::from_utf8_lossy(truncate_null(&ustar.uname)).into_owned(),
            group_name: String::from_utf8_lossy(truncate_null(&ustar.gname)).into_owned(),
            device_major: parse_numeric(&ustar.devmajor)? as u32,
            device_minor: parse_numeric(&ustar.devminor)? as u32,
        });

        Ok(record)
    }

    /// Populate a record from entry metadata.
    ///
    /// Directory paths gain a trailing `/`, other paths lose one. For
    /// UStar and GNU records the owner names are resolved through `names`
    /// when available and fall back to `"nobody"`/`"nogroup"` otherwise,
    /// which is what GNU tar expects from foreign archives.
    ///
    /// # Errors
    ///
    /// [`HeaderError::ReservedType`] if a reserved entry is mapped onto a
    /// UStar or GNU record.
    pub fn from_entry(
        entry: &dyn ArchiveEntry,
        format: TarFormat,
        names: Option<&dyn NameService>,
    ) -> Result<Self> {
        let kind = entry.kind();

        let mut path = entry.path().to_vec();
        if kind == EntryKind::Directory {
            if !path.ends_with(b"/") {
                path.push(b'/');
            }
        } else {
            while path.last() == Some(&b'/') {
                path.pop();
            }
        }

        let ustar = match format {
            TarFormat::V7 => None,
            TarFormat::Ustar | TarFormat::Gnu => {
                let user_name = names
                    .and_then(|n| n.user_name(entry.uid()))
                    .unwrap_or_else(|| NOBODY_USER.to_string());
                let group_name = names
                    .and_then(|n| n.group_name(entry.gid()))
                    .unwrap_or_else(|| NOBODY_GROUP.to_string());
                Some(UstarFields {
                    user_name,
                    group_name,
                    device_major: entry.device_major(),
                    device_minor: entry.device_minor(),
                })
            }
        };

        Ok(Self {
            format,
            path,
            mode: entry.mode(),
            uid: entry.uid(),
            gid: entry.gid(),
            size: entry.size(),
            mtime: entry.mtime(),
            checksum: 0,
            type_flag: type_flag_for(kind, format)?,
            link_target: entry.link_target().map(<[u8]>::to_vec).unwrap_or_default(),
            ustar,
        })
    }

    /// Encode the record into a 512-byte block.
    ///
    /// All layout work happens in a scratch block; nothing is emitted when
    /// encoding fails, so a [`HeaderError::PathTooLong`] leaves the stream
    /// untouched.
    ///
    /// # Errors
    ///
    /// [`HeaderError::PathTooLong`] if the path or link target does not fit
    /// its fields, [`HeaderError::NumericOverflow`] if a numeric value does
    /// not fit its octal width.
    pub fn encode(&self) -> Result<Block> {
        let mut block = match self.format {
            TarFormat::V7 => {
                if self.path.len() > NAME_LEN {
                    return Err(HeaderError::PathTooLong {
                        len: self.path.len(),
                    });
                }
                self.encode_common(&self.path)?
            }
            TarFormat::Ustar | TarFormat::Gnu => {
                let (prefix, name) = split_path(&self.path)?;
                let mut block = self.encode_common(name)?;
                self.fill_ustar(&mut block, prefix)?;
                block
            }
        };
        stamp_checksum(&mut block)?;
        Ok(block)
    }

    /// The path as a lossy UTF-8 string, for diagnostics.
    #[must_use]
    pub fn path_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.path)
    }

    /// Lay out the common V7 fields with the checksum field as spaces.
    fn encode_common(&self, name: &[u8]) -> Result<Block> {
        if self.link_target.len() > LINK_LEN {
            return Err(HeaderError::PathTooLong {
                len: self.link_target.len(),
            });
        }

        let mut layout = V7Layout::new_zeroed();
        layout.name[..name.len()].copy_from_slice(name);
        format_octal(&mut layout.mode, u64::from(self.mode))?;
        format_octal(&mut layout.uid, self.uid)?;
        format_octal(&mut layout.gid, self.gid)?;
        format_octal(&mut layout.size, self.size)?;
        format_octal(&mut layout.mtime, self.mtime)?;
        layout.checksum = [b' '; CHECKSUM_LEN];
        layout.typeflag = self.type_flag.to_byte();
        layout.linkname[..self.link_target.len()].copy_from_slice(&self.link_target);

        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(layout.as_bytes());
        Ok(block)
    }

    /// Fill the UStar extension fields of an already laid-out block.
    fn fill_ustar(&self, block: &mut Block, prefix: &[u8]) -> Result<()> {
        let layout = UstarLayout::mut_from_bytes(block).expect("layout spans the block");
        layout.magic.copy_from_slice(USTAR_MAGIC);
        layout.version.copy_from_slice(USTAR_VERSION);

        let (user_name, group_name, major, minor) = match self.ustar.as_ref() {
            Some(fields) => (
                fields.user_name.as_bytes(),
                fields.group_name.as_bytes(),
                fields.device_major,
                fields.device_minor,
            ),
            None => (&[][..], &[][..], 0, 0),
        };
        let ulen = user_name.len().min(UNAME_LEN);
        layout.uname[..ulen].copy_from_slice(&user_name[..ulen]);
        let glen = group_name.len().min(UNAME_LEN);
        layout.gname[..glen].copy_from_slice(&group_name[..glen]);
        format_octal(&mut layout.devmajor, u64::from(major))?;
        format_octal(&mut layout.devminor, u64::from(minor))?;
        layout.prefix[..prefix.len()].copy_from_slice(prefix);
        Ok(())
    }
}

impl fmt::Debug for TarRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TarRecord")
            .field("format", &self.format)
            .field("path", &self.path_lossy())
            .field("type_flag", &self.type_flag)
            .field("mode", &format_args!("{:04o}", self.mode))
            .field("size", &self.size)
            .field("ustar", &self.ustar)
            .finish_non_exhaustive()
    }
}

/// Map an entry kind onto the type tag of the target format.
///
/// V7 knows only files, links, symlinks and directories; everything else
/// degrades to a regular file. UStar carries the full range but has no tag
/// for reserved entries.
fn type_flag_for(kind: EntryKind, format: TarFormat) -> Result<TypeFlag> {
    if format == TarFormat::V7 {
        return Ok(match kind {
            EntryKind::HardLink => TypeFlag::HardLink,
            EntryKind::Symlink => TypeFlag::Symlink,
            EntryKind::Directory => TypeFlag::Directory,
            _ => TypeFlag::Regular,
        });
    }
    match kind {
        EntryKind::Regular => Ok(TypeFlag::Regular),
        EntryKind::HardLink => Ok(TypeFlag::HardLink),
        EntryKind::Symlink => Ok(TypeFlag::Symlink),
        EntryKind::CharDevice => Ok(TypeFlag::CharDevice),
        EntryKind::BlockDevice => Ok(TypeFlag::BlockDevice),
        EntryKind::Directory => Ok(TypeFlag::Directory),
        EntryKind::Fifo => Ok(TypeFlag::Fifo),
        EntryKind::Reserved => Err(HeaderError::ReservedType),
    }
}

/// Split a logical path into UStar prefix and name halves.
///
/// Paths up to 100 bytes stay whole in the name field. Longer paths are
/// split at the last separator; for directory paths the trailing separator
/// is not a split point. Both halves must fit their fields.
fn split_path(path: &[u8]) -> Result<(&[u8], &[u8])> {
    if path.len() <= NAME_LEN {
        return Ok((&[], path));
    }

    let too_long = || HeaderError::PathTooLong { len: path.len() };

    let scan = match path.last() {
        Some(b'/') => &path[..path.len() - 1],
        _ => path,
    };
    let cut = scan
        .iter()
        .rposition(|&b| b == b'/')
        .ok_or_else(too_long)?;

    let (prefix, name) = (&path[..cut], &path[cut + 1..]);
    if prefix.len() > PREFIX_LEN || name.len() > NAME_LEN {
        return Err(too_long());
    }
    Ok((prefix, name))
}

// ============================================================================
// Checksums
// ============================================================================

/// Compute the checksum of a header block.
///
/// The sum runs over the whole block with the eight checksum bytes counted
/// as spaces (0x20), per the tar format definition.
#[must_use]
pub fn compute_checksum(block: &Block) -> u64 {
    byte_sum(&block[..CHECKSUM_OFFSET])
        + CHECKSUM_LEN as u64 * u64::from(b' ')
        + byte_sum(&block[CHECKSUM_OFFSET + CHECKSUM_LEN..])
}

/// Verify a header block's stored checksum and return it.
///
/// # Errors
///
/// [`HeaderError::ChecksumMismatch`] when the stored value disagrees with
/// the computed sum, [`HeaderError::InvalidOctal`] when the field cannot be
/// parsed at all.
pub fn verify_checksum(block: &Block) -> Result<u64> {
    let stored = parse_octal(&block[CHECKSUM_OFFSET..CHECKSUM_OFFSET + CHECKSUM_LEN])?;
    let computed = compute_checksum(block);
    if stored != computed {
        return Err(HeaderError::ChecksumMismatch { stored, computed });
    }
    Ok(stored)
}

/// Compute and write the checksum field of a laid-out block.
///
/// The field is written in the conservative form GNU tar emits: six
/// zero-padded octal digits, a NUL, a space. Returns the sum.
///
/// # Errors
///
/// [`HeaderError::NumericOverflow`] only if the sum cannot be represented,
/// which cannot happen for 512-byte blocks.
pub fn stamp_checksum(block: &mut Block) -> Result<u64> {
    block[CHECKSUM_OFFSET..CHECKSUM_OFFSET + CHECKSUM_LEN].copy_from_slice(b"        ");
    let sum = compute_checksum(block);
    format_octal(
        &mut block[CHECKSUM_OFFSET..CHECKSUM_OFFSET + CHECKSUM_LEN - 1],
        sum,
    )?;
    block[CHECKSUM_OFFSET + CHECKSUM_LEN - 1] = b' ';
    Ok(sum)
}

/// Whether a block is all zeros.
///
/// Two consecutive zero blocks terminate a tar archive; callers should
/// check this before attempting to decode a header.
#[must_use]
pub fn is_end_of_archive(block: &Block) -> bool {
    block.iter().all(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(size_of::<V7Layout>(), BLOCK_SIZE);
        assert_eq!(size_of::<UstarLayout>(), BLOCK_SIZE);
    }

    #[test]
    fn test_type_flag_round_trip() {
        let flags = [
            TypeFlag::Regular,
            TypeFlag::HardLink,
            TypeFlag::Symlink,
            TypeFlag::CharDevice,
            TypeFlag::BlockDevice,
            TypeFlag::Directory,
            TypeFlag::Fifo,
            TypeFlag::Reserved,
            TypeFlag::LongName,
            TypeFlag::LongLink,
            TypeFlag::Other(b'x'),
        ];
        for flag in flags {
            assert_eq!(TypeFlag::from_byte(flag.to_byte()), flag);
        }
        // both spellings of a regular file
        assert_eq!(TypeFlag::from_byte(b'0'), TypeFlag::Regular);
        assert_eq!(TypeFlag::from_byte(b'\0'), TypeFlag::Regular);
    }

    #[test]
    fn test_split_path_short() {
        let (prefix, name) = split_path(b"etc/hosts").unwrap();
        assert_eq!(prefix, b"");
        assert_eq!(name, b"etc/hosts");

        let path = [b'x'; NAME_LEN];
        let (prefix, name) = split_path(&path).unwrap();
        assert_eq!(prefix, b"");
        assert_eq!(name, &path[..]);
    }

    #[test]
    fn test_split_path_at_last_separator() {
        let path = format!("{}/{}", "d".repeat(120), "leaf.txt");
        let (prefix, name) = split_path(path.as_bytes()).unwrap();
        assert_eq!(prefix, "d".repeat(120).as_bytes());
        assert_eq!(name, b"leaf.txt");
    }

    #[test]
    fn test_split_path_directory_keeps_slash_in_name() {
        let path = format!("{}/{}/", "d".repeat(120), "sub");
        let (prefix, name) = split_path(path.as_bytes()).unwrap();
        assert_eq!(prefix, "d".repeat(120).as_bytes());
        assert_eq!(name, b"sub/");
    }

    #[test]
    fn test_split_path_rejects_unsplittable() {
        // no separator at all
        let path = [b'x'; 150];
        assert!(matches!(
            split_path(&path),
            Err(HeaderError::PathTooLong { len: 150 })
        ));

        // basename longer than the name field
        let path = format!("d/{}", "b".repeat(200));
        assert!(matches!(
            split_path(path.as_bytes()),
            Err(HeaderError::PathTooLong { .. })
        ));

        // directory half longer than the prefix field
        let path = format!("{}/n", "p".repeat(200));
        assert!(matches!(
            split_path(path.as_bytes()),
            Err(HeaderError::PathTooLong { .. })
        ));
    }

    #[test]
    fn test_is_end_of_archive() {
        assert!(is_end_of_archive(&[0u8; BLOCK_SIZE]));
        let mut block = [0u8; BLOCK_SIZE];
        block[511] = 1;
        assert!(!is_end_of_archive(&block));
    }

    #[test]
    fn test_stamp_writes_conservative_form() {
        let mut block = [0u8; BLOCK_SIZE];
        block[0] = b'a';
        let sum = stamp_checksum(&mut block).unwrap();

        let expected = format!("{sum:06o}\0 ");
        assert_eq!(&block[148..156], expected.as_bytes());
        assert_eq!(verify_checksum(&block).unwrap(), sum);
    }
}
