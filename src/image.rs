//! The mapped disk image: a writable byte buffer plus the `Layout` parsed
//! out of its header.
//!
//! Reference: `MmapTablespaceReader`/`MmapTablespaceWriter` in the teacher's
//! `tablespace.rs` for the mmap-rs open/flush lifecycle. Unlike the teacher,
//! ZealFS images are small enough (32KB-4GB) that a single read-write
//! mapping covers the whole lifecycle; there is no separate reader/writer
//! split.
//!
//! When the image carries an MBR (`mbr.rs`), the `Image` is mapped over the
//! whole file but `base_offset` points past the MBR sector at the start of
//! the ZealFS partition; every `Layout` geometry computation stays relative
//! to that offset.

use std::fs::{File, OpenOptions};
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use mmap_rs::{MmapMut, MmapOptions};

use crate::bitmap;
use crate::error::ZealError;
use crate::header;
use crate::layout::{Layout, Version};

pub struct Image {
    mmap: MmapMut,
    base_offset: usize,
    pub layout: Layout,
}

impl Image {
    /// Open an existing image file. `base_offset` is the byte offset of the
    /// ZealFS partition within the file (0 for a raw, MBR-less image).
    pub fn open(path: &Path, base_offset: usize) -> Result<Image> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("open disk image at {}", path.display()))?;
        let size = file
            .metadata()
            .context("get metadata for disk image")?
            .len();

        if (base_offset as u64) > size {
            anyhow::bail!(
                "partition offset {base_offset} is past the end of the {size}-byte image file"
            );
        }

        let mmap = map_file_mut(&file, size as usize)?;
        let layout = header::parse_layout(&mmap.as_slice()[base_offset..])
            .ok_or_else(|| anyhow::anyhow!("invalid or unrecognized ZealFS header"))?;

        Ok(Image {
            mmap,
            base_offset,
            layout,
        })
    }

    /// Format a brand-new image file of `total_size` bytes at `path`,
    /// starting at `base_offset` (0 unless an MBR precedes it).
    ///
    /// Reference: `format()` in zealfs_v1.c/zealfs_v2.c.
    pub fn create(
        path: &Path,
        base_offset: usize,
        total_size: u64,
        version: Version,
    ) -> Result<Image> {
        let file_len = base_offset as u64 + total_size;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("create disk image at {}", path.display()))?;
        file.set_len(file_len)
            .context("truncate disk image to requested size")?;

        let mmap = map_file_mut(&file, file_len as usize)?;
        let layout = match version {
            Version::V1 => Layout::new_v1(total_size),
            Version::V2 => Layout::new_v2(total_size),
        };

        let mut image = Image {
            mmap,
            base_offset,
            layout,
        };
        image.format(total_size);
        Ok(image)
    }

    /// An anonymous, file-less image used by unit tests: same geometry and
    /// formatting as `create`, without touching the filesystem.
    pub fn new_in_memory(layout: Layout, total_size: u64) -> Image {
        let mmap = MmapOptions::new(total_size as usize)
            .expect("mmap option")
            .map_mut()
            .expect("anonymous mmap");
        let mut image = Image {
            mmap,
            base_offset: 0,
            layout,
        };
        image.format(total_size);
        image
    }

    fn format(&mut self, total_size: u64) {
        let version = self.layout.version;
        let page_size = self.layout.page_size;
        let total_pages = (total_size / page_size as u64) as u32;

        let bytes = self.bytes_mut();
        bytes.fill(0);
        header::write_magic(bytes);
        header::write_version(bytes, version);
        header::write_bitmap_size(bytes, version, self.layout.bitmap_size);
        if version == Version::V2 {
            header::write_page_size_code(bytes, self.layout.page_size_code());
        }

        let fat_pages = self.layout.fat_pages as u32;
        let reserved = self.layout.reserved_pages() as u32;
        header::write_free_pages(bytes, version, total_pages - reserved);

        let bitmap = header::bitmap_slice_mut(bytes, &self.layout);
        // Page 0 (header) is always occupied; for V2, pages 1..=fat_pages
        // (the FAT itself) are occupied too.
        bitmap[0] = match fat_pages {
            0 => 1,
            1 => 0b0000_0011,
            _ => 0b0000_0111,
        };
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap.as_slice()[self.base_offset..]
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mmap.as_mut_slice()[self.base_offset..]
    }

    /// Total bytes of the partition this image covers (past the MBR, if
    /// any), independent of what the header's own bitmap claims.
    pub fn len(&self) -> usize {
        self.mmap.len() - self.base_offset
    }

    pub fn is_page_free(&self, page: u32) -> bool {
        bitmap::is_free(header::bitmap_slice(self.bytes(), &self.layout), page)
    }

    /// Reference: `freePage()` in `include/common.h`/`include/zealfs_v2.h`,
    /// which clears the bitmap bit and bumps `free_pages` in one step.
    pub fn mark_page_free(&mut self, page: u32) {
        let layout = self.layout;
        bitmap::mark_free(header::bitmap_slice_mut(self.bytes_mut(), &layout), page);
        let free = self.free_pages();
        self.set_free_pages(free + 1);
    }

    pub fn count_free_bitmap(&self) -> u32 {
        let total_pages = self.layout.total_pages_from_bitmap();
        bitmap::count_free(header::bitmap_slice(self.bytes(), &self.layout), total_pages)
    }

    /// Allocate the lowest-numbered free page, marking it used and
    /// decrementing `free_pages`. `out_of_space` picks the wording
    /// (`FileTooBig` for V1, `NoSpace` for V2) the caller's operation uses.
    pub fn allocate_page(&mut self, out_of_space: ZealError) -> crate::error::Result<u32> {
        let layout = self.layout;
        let total_pages = layout.total_pages_from_bitmap();
        let page = bitmap::allocate(
            header::bitmap_slice_mut(self.bytes_mut(), &layout),
            total_pages,
            out_of_space,
        )?;
        self.set_free_pages(self.free_pages() - 1);
        Ok(page)
    }

    pub fn free_pages(&self) -> u32 {
        header::read_free_pages(self.bytes(), self.layout.version)
    }

    pub fn set_free_pages(&mut self, value: u32) {
        let version = self.layout.version;
        header::write_free_pages(self.bytes_mut(), version, value);
    }

    pub fn flush(&self) -> Result<()> {
        self.mmap.flush(self.range()).context("flush disk image")
    }

    fn range(&self) -> Range<usize> {
        0..self.mmap.len()
    }
}

fn map_file_mut(file: &File, size: usize) -> Result<MmapMut> {
    let mmap = unsafe {
        MmapOptions::new(size)
            .context("mmap option")?
            .with_file(file, 0u64)
            .map_mut()
            .context("mmap disk image")?
    };
    Ok(mmap)
}
