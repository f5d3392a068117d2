//! Error types for the tar header codecs.

use thiserror::Error;

/// Errors raised while decoding or encoding tar header records.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The stored checksum disagrees with the sum computed over the block.
    ///
    /// The archive is corrupt or mis-framed; traversal should stop here.
    #[error("header checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch {
        /// Checksum value decoded from the header field.
        stored: u64,
        /// Sum computed over the block with the checksum field as spaces.
        computed: u64,
    },

    /// The path cannot be stored in the name and prefix fields.
    #[error("path of {len} bytes does not fit the header name and prefix fields")]
    PathTooLong {
        /// Byte length of the offending path.
        len: usize,
    },

    /// The reserved type tag `7` was found in a UStar header.
    #[error("header uses the reserved type tag '7'")]
    ReservedType,

    /// A numeric field contains characters outside octal ASCII.
    #[error("invalid octal field: {0:?}")]
    InvalidOctal(Vec<u8>),

    /// A value needs more octal digits than its on-disk field provides.
    #[error("value {value} does not fit a {width}-byte octal field")]
    NumericOverflow {
        /// The value that was being encoded.
        value: u64,
        /// On-disk width of the field, including the NUL terminator.
        width: usize,
    },

    /// The block stream ended in the middle of a record.
    #[error("short read: block stream ended inside a record")]
    ShortRead,
}

/// Result type for tar header operations.
pub type Result<T> = std::result::Result<T, HeaderError>;
