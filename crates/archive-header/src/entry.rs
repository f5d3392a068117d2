//! The entry DTO contract: what the codecs need to know about a file.
//!
//! Archive engines carry their own per-entry metadata type; the codecs only
//! require the read-only view defined by [`ArchiveEntry`]. [`EntryMeta`] is
//! a plain owned implementation for callers without their own DTO.

/// The kind of file system object an archive entry describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file.
    Regular,
    /// Hard link to another entry in the archive.
    HardLink,
    /// Symbolic link.
    Symlink,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Directory.
    Directory,
    /// FIFO / named pipe.
    Fifo,
    /// The reserved tag `7`; never produced by well-formed archives.
    Reserved,
}

impl EntryKind {
    /// Returns true for directory entries.
    #[must_use]
    pub fn is_dir(self) -> bool {
        self == EntryKind::Directory
    }
}

/// Read-only view of one archive entry's metadata.
///
/// Paths and link targets are byte strings: tar does not mandate any text
/// encoding and real archives contain non-UTF-8 names.
pub trait ArchiveEntry {
    /// The entry path, without any leading separator policy applied.
    fn path(&self) -> &[u8];

    /// Permission bits.
    fn mode(&self) -> u32;

    /// Owner user id.
    fn uid(&self) -> u64;

    /// Owner group id.
    fn gid(&self) -> u64;

    /// Content size in bytes.
    fn size(&self) -> u64;

    /// Modification time, seconds since the epoch.
    fn mtime(&self) -> u64;

    /// Link target for hard and symbolic links.
    fn link_target(&self) -> Option<&[u8]>;

    /// What kind of object this entry is.
    fn kind(&self) -> EntryKind;

    /// Device major number (character and block devices).
    fn device_major(&self) -> u32 {
        0
    }

    /// Device minor number (character and block devices).
    fn device_minor(&self) -> u32 {
        0
    }
}

/// Owned entry metadata implementing [`ArchiveEntry`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryMeta {
    pub path: Vec<u8>,
    pub mode: u32,
    pub uid: u64,
    pub gid: u64,
    pub size: u64,
    pub mtime: u64,
    pub link_target: Option<Vec<u8>>,
    pub kind: EntryKind,
    pub device_major: u32,
    pub device_minor: u32,
}

impl Default for EntryMeta {
    fn default() -> Self {
        Self {
            path: Vec::new(),
            mode: 0o644,
            uid: 0,
            gid: 0,
            size: 0,
            mtime: 0,
            link_target: None,
            kind: EntryKind::Regular,
            device_major: 0,
            device_minor: 0,
        }
    }
}

impl ArchiveEntry for EntryMeta {
    fn path(&self) -> &[u8] {
        &self.path
    }

    fn mode(&self) -> u32 {
        self.mode
    }

    fn uid(&self) -> u64 {
        self.uid
    }

    fn gid(&self) -> u64 {
        self.gid
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mtime(&self) -> u64 {
        self.mtime
    }

    fn link_target(&self) -> Option<&[u8]> {
        self.link_target.as_deref()
    }

    fn kind(&self) -> EntryKind {
        self.kind
    }

    fn device_major(&self) -> u32 {
        self.device_major
    }

    fn device_minor(&self) -> u32 {
        self.device_minor
    }
}
