//! Interfaces to the FAT filesystem implementation.
//!
//! The boot stages only mount a volume, open files by name and read them.
//! Directory structure, cluster chains and caching belong to whatever
//! implements [`FileSystem`]; that implementation reaches the card through
//! [`DiskIo`].

use core::fmt;

use embedded_error::mci::MciError;

/// Sector level access used by the filesystem implementation.
pub trait DiskIo {
    type Error;

    /// Identify the card and make it ready for transfers.
    fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Read the bytes at `offset` of `sector` into `target`.
    fn read_partial(
        &mut self,
        target: ReadTarget<'_>,
        sector: u32,
        offset: usize,
    ) -> Result<(), Self::Error>;

    /// With data: send up to `size_or_sector` bytes into the open block.
    /// Without data: open a write at sector `size_or_sector`, or finalize the
    /// open write when it is zero.
    fn write_partial(&mut self, data: Option<&[u8]>, size_or_sector: u32)
        -> Result<(), Self::Error>;
}

/// Where the requested part of a sector goes.
pub enum ReadTarget<'a> {
    /// Store the bytes, the buffer length is the byte count.
    Buffer(&'a mut [u8]),
    /// Hand `count` bytes one at a time to `sink` as they arrive.
    Stream { count: usize, sink: &'a mut dyn FnMut(u8) },
}

impl<'a> ReadTarget<'a> {
    pub fn count(&self) -> usize {
        match self {
            ReadTarget::Buffer(buffer) => buffer.len(),
            ReadTarget::Stream { count, .. } => *count,
        }
    }
}

/// FatFs result codes, `FR_OK` excluded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FsError {
    DiskErr = 1,
    IntErr,
    NotReady,
    NoFile,
    NoPath,
    InvalidName,
    Denied,
    Exist,
    InvalidObject,
    WriteProtected,
    InvalidDrive,
    NotEnabled,
    NoFileSystem,
    MkfsAborted,
    Timeout,
    Locked,
    NotEnoughCore,
    TooManyOpenFiles,
    InvalidParameter,
}

impl FsError {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            FsError::DiskErr => "DISK_ERR",
            FsError::IntErr => "INT_ERR",
            FsError::NotReady => "NOT_READY",
            FsError::NoFile => "NO_FILE",
            FsError::NoPath => "NO_PATH",
            FsError::InvalidName => "INVALID_NAME",
            FsError::Denied => "DENIED",
            FsError::Exist => "EXIST",
            FsError::InvalidObject => "INVALID_OBJECT",
            FsError::WriteProtected => "WRITE_PROTECTED",
            FsError::InvalidDrive => "INVALID_DRIVE",
            FsError::NotEnabled => "NOT_ENABLED",
            FsError::NoFileSystem => "NO_FILE_SYSTEM",
            FsError::MkfsAborted => "MKFS_ABORTED",
            FsError::Timeout => "TIMEOUT",
            FsError::Locked => "LOCKED",
            FsError::NotEnoughCore => "NOT_ENOUGH_CORE",
            FsError::TooManyOpenFiles => "TOO_MANY_OPEN_FILES",
            FsError::InvalidParameter => "INVALID_PARAMETER",
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rc={} FR_{}", self.code(), self.name())
    }
}

/// Any card failure below the filesystem is a disk error.
impl From<MciError> for FsError {
    fn from(_: MciError) -> Self {
        FsError::DiskErr
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// One directory entry. Names are 8.3 or shorter long names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirEntry {
    name: [u8; 32],
    name_len: usize,
    pub size: u64,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn new(name: &str, size: u64, is_dir: bool) -> Self {
        let mut entry = Self { size, is_dir, ..Default::default() };
        let len = name.len().min(entry.name.len());
        entry.name[..len].copy_from_slice(&name.as_bytes()[..len]);
        entry.name_len = len;
        entry
    }

    pub fn name(&self) -> &str {
        core::str::from_utf8(&self.name[..self.name_len]).unwrap_or("?")
    }
}

pub trait FileSystem {
    type File;
    type Dir;

    fn mount(&mut self) -> Result<(), FsError>;

    fn open(&mut self, name: &str, mode: OpenMode) -> Result<Self::File, FsError>;

    /// Read into `buffer` until it is full or the file ends, returning the
    /// number of bytes read.
    fn read(&mut self, file: &mut Self::File, buffer: &mut [u8]) -> Result<usize, FsError>;

    fn close(&mut self, file: Self::File) -> Result<(), FsError>;

    fn open_dir(&mut self, path: &str) -> Result<Self::Dir, FsError>;

    /// Next entry, `None` at the end of the directory.
    fn read_dir(&mut self, dir: &mut Self::Dir) -> Result<Option<DirEntry>, FsError>;
}
