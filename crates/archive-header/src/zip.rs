//! The ZIP end-of-central-directory record.
//!
//! Every ZIP archive ends with the EOCD record: a 22-byte fixed prefix
//! (signature plus seven little-endian fields) followed by a free-form
//! comment. The codec here reads and writes exactly that record; locating
//! it inside an archive and the per-file headers of the central directory
//! belong to the surrounding engine.
//!
//! | Offset | Size | Field                      |
//! |--------|------|----------------------------|
//! | 0      | 4    | signature (`PK\x05\x06`)   |
//! | 4      | 2    | disk number                |
//! | 6      | 2    | central directory disk     |
//! | 8      | 2    | entries on this disk       |
//! | 10     | 2    | total entries              |
//! | 12     | 4    | central directory size     |
//! | 16     | 4    | central directory start    |
//! | 20     | 2    | comment length             |
//! | 22     | n    | comment                    |
//!
//! The record targets single-disk archives: writing the entry count forces
//! both disk fields to zero and keeps the per-disk count in sync, and the
//! comment length is always derived from the comment itself. Those derived
//! fields deliberately have no setters.

use std::io::{Read, Write};

use thiserror::Error;
use zerocopy::{
    little_endian::{U16, U32},
    FromBytes, Immutable, IntoBytes, KnownLayout,
};

/// EOCD signature as a little-endian integer.
pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;

/// EOCD signature bytes as they appear in the archive.
pub const EOCD_MAGIC: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];

/// Byte length of the fixed record part following the signature.
const FIXED_LEN: usize = 18;

/// Errors raised by the EOCD codec.
#[derive(Debug, Error)]
pub enum EocdError {
    /// The underlying stream failed or ended early.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes at the expected position are not an EOCD signature.
    #[error("not an end-of-central-directory signature: {found:02x?}")]
    BadSignature {
        /// The four bytes actually read.
        found: [u8; 4],
    },

    /// The comment does not fit the 16-bit length field.
    #[error("comment of {0} bytes exceeds the 16-bit length field")]
    CommentTooLong(usize),
}

/// Result type for EOCD operations.
pub type Result<T> = std::result::Result<T, EocdError>;

/// Fixed EOCD fields, without the signature.
///
/// The signature is read and checked separately; this struct maps the 18
/// bytes that follow it.
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
struct EocdFixed {
    disk_number: U16,
    central_directory_disk: U16,
    entries_on_disk: U16,
    total_entries: U16,
    central_directory_size: U32,
    central_directory_start: U32,
    comment_length: U16,
}

/// Check whether a byte prefix starts an EOCD record.
#[must_use]
pub fn is_signature(bytes: &[u8]) -> bool {
    bytes.len() >= EOCD_MAGIC.len() && bytes[..EOCD_MAGIC.len()] == EOCD_MAGIC
}

/// The ZIP end-of-central-directory record.
///
/// Fields are private: all seven numbers and the comment can be read, but
/// only the entry count, the central directory size/start and the comment
/// can be written. `diskNumber`, `centralDirectoryDisk`, the per-disk entry
/// count and the comment length are derived.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    disk_number: u16,
    central_directory_disk: u16,
    entries_on_disk: u16,
    total_entries: u16,
    central_directory_size: u32,
    central_directory_start: u32,
    comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    /// Create an empty single-disk record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a record, including its signature, from the stream.
    ///
    /// # Errors
    ///
    /// [`EocdError::BadSignature`] if the stream does not start with
    /// `PK\x05\x06`; [`EocdError::Io`] on short reads.
    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if !is_signature(&magic) {
            return Err(EocdError::BadSignature { found: magic });
        }
        Self::read_after_signature(reader)
    }

    /// Read a record whose signature has already been consumed.
    ///
    /// Reads the 18 fixed bytes, then exactly as many comment bytes as the
    /// length field announces.
    ///
    /// # Errors
    ///
    /// [`EocdError::Io`] on short reads.
    pub fn read_after_signature(reader: &mut impl Read) -> Result<Self> {
        let mut buf = [0u8; FIXED_LEN];
        reader.read_exact(&mut buf)?;
        let fixed = EocdFixed::ref_from_bytes(&buf).expect("buffer matches the layout");

        let mut comment = vec![0u8; usize::from(fixed.comment_length.get())];
        reader.read_exact(&mut comment)?;

        Ok(Self {
            disk_number: fixed.disk_number.get(),
            central_directory_disk: fixed.central_directory_disk.get(),
            entries_on_disk: fixed.entries_on_disk.get(),
            total_entries: fixed.total_entries.get(),
            central_directory_size: fixed.central_directory_size.get(),
            central_directory_start: fixed.central_directory_start.get(),
            comment,
        })
    }

    /// Write the record: signature, fixed fields, comment.
    ///
    /// # Errors
    ///
    /// [`EocdError::Io`] if the stream rejects the bytes.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        let fixed = EocdFixed {
            disk_number: U16::new(self.disk_number),
            central_directory_disk: U16::new(self.central_directory_disk),
            entries_on_disk: U16::new(self.entries_on_disk),
            total_entries: U16::new(self.total_entries),
            central_directory_size: U32::new(self.central_directory_size),
            central_directory_start: U32::new(self.central_directory_start),
            comment_length: U16::new(self.comment_length()),
        };
        writer.write_all(&EOCD_MAGIC)?;
        writer.write_all(fixed.as_bytes())?;
        writer.write_all(&self.comment)?;
        Ok(())
    }

    /// Number of this disk.
    #[must_use]
    pub fn disk_number(&self) -> u16 {
        self.disk_number
    }

    /// Disk on which the central directory starts.
    #[must_use]
    pub fn central_directory_disk(&self) -> u16 {
        self.central_directory_disk
    }

    /// Central directory entries on this disk.
    #[must_use]
    pub fn entries_on_disk(&self) -> u16 {
        self.entries_on_disk
    }

    /// Central directory entries in the whole archive.
    #[must_use]
    pub fn total_entries(&self) -> u16 {
        self.total_entries
    }

    /// Byte size of the central directory.
    #[must_use]
    pub fn central_directory_size(&self) -> u32 {
        self.central_directory_size
    }

    /// Offset of the start of the central directory.
    #[must_use]
    pub fn central_directory_start(&self) -> u32 {
        self.central_directory_start
    }

    /// The archive comment.
    #[must_use]
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// Length of the archive comment, as stored on disk.
    #[must_use]
    pub fn comment_length(&self) -> u16 {
        self.comment.len() as u16
    }

    /// Total encoded length: 22 fixed bytes plus the comment.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        EOCD_MAGIC.len() + FIXED_LEN + self.comment.len()
    }

    /// Set the archive entry count.
    ///
    /// Single-disk policy: the per-disk count follows the total, and both
    /// disk numbers are forced to zero.
    pub fn set_total_entries(&mut self, entries: u16) {
        self.total_entries = entries;
        self.entries_on_disk = entries;
        self.disk_number = 0;
        self.central_directory_disk = 0;
    }

    /// Set the byte size of the central directory.
    pub fn set_central_directory_size(&mut self, size: u32) {
        self.central_directory_size = size;
    }

    /// Set the offset of the start of the central directory.
    pub fn set_central_directory_start(&mut self, start: u32) {
        self.central_directory_start = start;
    }

    /// Replace the archive comment; the stored length follows it.
    ///
    /// # Errors
    ///
    /// [`EocdError::CommentTooLong`] if the comment exceeds 65,535 bytes.
    pub fn set_comment(&mut self, comment: impl Into<Vec<u8>>) -> Result<()> {
        let comment = comment.into();
        if comment.len() > usize::from(u16::MAX) {
            return Err(EocdError::CommentTooLong(comment.len()));
        }
        self.comment = comment;
        Ok(())
    }
}
