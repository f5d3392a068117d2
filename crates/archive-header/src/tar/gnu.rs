//! The GNU `L`/`K` long-name extension protocol.
//!
//! GNU tar stores paths and link targets longer than the header fields in
//! the payload of pseudo-records that precede the real header: a type `'L'`
//! record carries the file name, a type `'K'` record the link target. The
//! payload occupies ⌈size/512⌉ blocks and one further block boundary is
//! consumed after it, so the real header follows the group.
//!
//! [`read_record`] runs this protocol over a [`BlockFile`]: it accumulates
//! pending names until a non-extension record arrives, applies the pending
//! names to it and returns it. Writing long names is not mirrored here; the
//! encoder emits plain UStar records.

use log::debug;

use crate::block::{BlockFile, BLOCK_SIZE};

use super::error::Result;
use super::record::{TarFormat, TarRecord, TypeFlag};

/// Read one logical record, resolving GNU long-name extensions.
///
/// The cursor must be on a header block. Extension records (`'L'`, `'K'`)
/// and their payloads are consumed; the first record with any other tag
/// terminates the group and is returned with the pending long names
/// applied. A long file name replaces the whole logical path, ignoring any
/// prefix split in the terminating header.
///
/// On return the cursor has advanced past the terminating header, so the
/// caller's `current` yields the first content block of the entry.
///
/// # Errors
///
/// Any decode error of the underlying headers, or
/// [`HeaderError::ShortRead`](super::HeaderError::ShortRead) if the stream
/// ends inside the group.
pub fn read_record(file: &mut (impl BlockFile + ?Sized)) -> Result<TarRecord> {
    let mut pending_name: Option<Vec<u8>> = None;
    let mut pending_link: Option<Vec<u8>> = None;

    loop {
        let mut record = TarRecord::decode(file.current()?, TarFormat::Gnu)?;
        // the stream may end right behind the last record; a failed advance
        // surfaces on the next read that actually needs a block
        let _ = file.next();

        match record.type_flag {
            TypeFlag::LongName => {
                let payload = read_payload(file, record.size)?;
                debug!("long name extension of {} bytes", payload.len());
                pending_name = Some(payload);
            }
            TypeFlag::LongLink => {
                let payload = read_payload(file, record.size)?;
                debug!("long link extension of {} bytes", payload.len());
                pending_link = Some(payload);
            }
            _ => {
                if let Some(name) = pending_name {
                    record.path = name;
                }
                if let Some(link) = pending_link {
                    record.link_target = link;
                }
                return Ok(record);
            }
        }
    }
}

/// Read an extension payload of `len` bytes.
///
/// The payload spans ⌈len/512⌉ blocks; the bytes past `len` in the final
/// block are discarded, as is a single trailing NUL terminator. One more
/// block boundary is consumed afterwards so the cursor lands on the next
/// header.
fn read_payload(file: &mut (impl BlockFile + ?Sized), len: u64) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    for _ in 0..len.div_ceil(BLOCK_SIZE as u64) {
        data.extend_from_slice(file.current()?);
        let _ = file.next();
    }
    data.truncate(len as usize);
    if data.last() == Some(&0) {
        data.pop();
    }
    let _ = file.next();
    Ok(data)
}
