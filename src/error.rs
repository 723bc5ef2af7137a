use std::fmt;

/// POSIX-flavored error taxonomy returned by every filesystem operation.
///
/// Reference: zealfs_v1.c / zealfs_v2.c, where each operation returns a
/// negative `errno` value directly. This enum names the same kinds without
/// committing to a concrete `errno`; `ZealError::to_errno` does that mapping
/// for adapters that need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZealError {
    /// A path component does not exist.
    NotFound,
    /// The target of create/mkdir/rename(NOREPLACE) already exists.
    AlreadyExists,
    /// Operation expected a file but found a directory.
    IsDirectory,
    /// Operation expected a directory but found a file.
    NotDirectory,
    /// rmdir on a non-empty directory.
    NotEmpty,
    /// Basename longer than 16 bytes.
    NameTooLong,
    /// Directory slot table is full.
    NoFileSlots,
    /// No free pages to satisfy a write or create (V1 wording).
    FileTooBig,
    /// No free pages to satisfy a write or create (V2 wording).
    NoSpace,
    /// No free slot in the destination directory during a cross-directory rename.
    NoMemory,
    /// rmdir on the root directory.
    AccessDenied,
    /// rename with RENAME_EXCHANGE, which is not supported.
    Fault,
    /// The image failed its post-load integrity check.
    Corrupt(String),
}

impl fmt::Display for ZealError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZealError::NotFound => write!(f, "no such file or directory"),
            ZealError::AlreadyExists => write!(f, "file exists"),
            ZealError::IsDirectory => write!(f, "is a directory"),
            ZealError::NotDirectory => write!(f, "not a directory"),
            ZealError::NotEmpty => write!(f, "directory not empty"),
            ZealError::NameTooLong => write!(f, "file name too long"),
            ZealError::NoFileSlots => write!(f, "too many open files in directory"),
            ZealError::FileTooBig => write!(f, "file too large"),
            ZealError::NoSpace => write!(f, "no space left on device"),
            ZealError::NoMemory => write!(f, "out of memory"),
            ZealError::AccessDenied => write!(f, "permission denied"),
            ZealError::Fault => write!(f, "bad address"),
            ZealError::Corrupt(msg) => write!(f, "corrupt filesystem image: {msg}"),
        }
    }
}

impl std::error::Error for ZealError {}

impl ZealError {
    /// Map to the closest POSIX errno, for adapters that need one.
    pub fn to_errno(self) -> i32 {
        match self {
            ZealError::NotFound => libc_enoent(),
            ZealError::AlreadyExists => libc_eexist(),
            ZealError::IsDirectory => libc_eisdir(),
            ZealError::NotDirectory => libc_enotdir(),
            ZealError::NotEmpty => libc_enotempty(),
            ZealError::NameTooLong => libc_enametoolong(),
            ZealError::NoFileSlots => libc_enfile(),
            ZealError::FileTooBig => libc_efbig(),
            ZealError::NoSpace => libc_enospc(),
            ZealError::NoMemory => libc_enomem(),
            ZealError::AccessDenied => libc_eacces(),
            ZealError::Fault => libc_efault(),
            ZealError::Corrupt(_) => libc_eio(),
        }
    }
}

impl From<ZealError> for std::io::Error {
    fn from(err: ZealError) -> Self {
        let kind = match err {
            ZealError::NotFound => std::io::ErrorKind::NotFound,
            ZealError::AlreadyExists => std::io::ErrorKind::AlreadyExists,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

// The core has no dependency on libc; these are the numeric constants for
// the platforms the bundled CLI targets (Linux). Kept local and tiny rather
// than pulling in the `libc` crate for a handful of i32 values.
const fn libc_enoent() -> i32 {
    2
}
const fn libc_eio() -> i32 {
    5
}
const fn libc_eacces() -> i32 {
    13
}
const fn libc_eexist() -> i32 {
    17
}
const fn libc_enotdir() -> i32 {
    20
}
const fn libc_eisdir() -> i32 {
    21
}
const fn libc_enfile() -> i32 {
    23
}
const fn libc_efbig() -> i32 {
    27
}
const fn libc_enospc() -> i32 {
    28
}
const fn libc_efault() -> i32 {
    14
}
const fn libc_enomem() -> i32 {
    12
}
const fn libc_enotempty() -> i32 {
    39
}
const fn libc_enametoolong() -> i32 {
    36
}

pub type Result<T> = std::result::Result<T, ZealError>;
