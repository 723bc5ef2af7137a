use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FsVersion {
    #[clap(name = "1")]
    V1,
    #[clap(name = "2")]
    V2,
}

impl From<FsVersion> for crate::layout::Version {
    fn from(value: FsVersion) -> Self {
        match value {
            FsVersion::V1 => crate::layout::Version::V1,
            FsVersion::V2 => crate::layout::Version::V2,
        }
    }
}

/// CLI options for the `zealfs` inspection tool.
///
/// Reference: `zealfs_main.c`'s `option_spec`/`show_help` (`--image`,
/// `--size`, `--mbr`, `-v1`/`-v2`). This binary has no FUSE mount loop
/// (out of scope, see `SPEC_FULL.md`); it formats/opens an image and
/// reports on it the way `mdbutil`'s CLI inspects a tablespace file.
#[derive(Parser)]
#[command(about = "Inspect, format, and browse ZealFS disk images")]
pub struct Config {
    /// Path to the disk image. Created if it does not already exist.
    #[clap(long, default_value = "zfs.img")]
    pub image: PathBuf,

    /// Size of a newly created image, in KB. Ignored when the image
    /// already exists.
    #[clap(long, default_value_t = 32)]
    pub size: u64,

    /// Write an MBR into a newly created image (ZealFSv2 only).
    #[clap(long, default_value_t = false)]
    pub mbr: bool,

    /// ZealFS format version to use when creating a new image.
    #[clap(long, value_enum)]
    pub version: FsVersion,

    /// List the contents of this directory after opening the image.
    #[clap(long, default_value = "/")]
    pub list: String,

    /// Where an external adapter would mount this image. The core never
    /// looks at this itself; it is forwarded as-is for whatever consumes
    /// this CLI's output.
    #[clap(long)]
    pub mountpoint: Option<PathBuf>,

    /// Map the image read-write instead of read-only.
    #[clap(long, default_value_t = false)]
    pub write: bool,
}

impl Config {
    pub fn size_bytes(&self) -> u64 {
        self.size * 1024
    }
}
