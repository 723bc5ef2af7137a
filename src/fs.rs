//! The filesystem façade: the operations a FUSE adapter (or a test) drives.
//!
//! Reference: the `zealfs_*` functions in zealfs_v1.c/zealfs_v2.c. Several
//! quirks in the original are preserved deliberately rather than "fixed",
//! because this crate's job is byte-for-byte compatibility with images the
//! real Zeal 8-bit tooling produces and reads:
//!
//! - `write` grows `entry.size` by every byte written, even when writing
//!   inside the file's existing bounds (an overwrite at offset 0 inflates
//!   the stored size just as much as an append would).
//! - `rmdir` only clears the directory's entry flags; it never frees the
//!   directory's own content page, leaking it permanently.
//! - `create`'s "empty the new page" step zeroes only the first 256 bytes
//!   of the new page, not the full page — harmless for V1 and for V2 at
//!   the 256-byte page size, but it leaves the tail of larger V2 pages
//!   with whatever was there before.
//! - `rename` over an existing directory silently swallows the `IsDirectory`
//!   error from the internal unlink-the-destination step (the original
//!   discards `zealfs_unlink`'s return value entirely), so the destination
//!   directory's page is never freed even though its entry gets overwritten.

use crate::bcd::Timestamp;
use crate::chain;
use crate::entry::{self, stat_from_entry, DirEntry, FileStat, FLAG_IS_DIR, FLAG_OCCUPIED, NAME_MAX_LEN};
use crate::error::{Result, ZealError};
use crate::image::Image;
use crate::integrity;
use crate::path::{self, EntryHandle};

pub struct Filesystem {
    pub image: Image,
}

/// A resolved directory, ready for `readdir`. Root and non-root
/// directories have different entry counts (`getRootDirMaxEntries` vs
/// `getDirMaxEntries`), so this carries both rather than re-deriving them.
pub struct DirHandle {
    entries_offset: usize,
    max_entries: usize,
}

fn strip_leading_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// A synthetic `.`/`..` row, built fresh for each `readdir` call rather
/// than stored on disk.
fn dot_entry(name: &[u8]) -> DirEntry {
    let mut entry = DirEntry::empty();
    entry.flags = FLAG_OCCUPIED | FLAG_IS_DIR;
    entry.set_name(name);
    entry
}

/// Error used when a write/create pre-check determines there isn't enough
/// free space. Both versions spell this `EFBIG`.
const OUT_OF_SPACE_ON_CREATE: ZealError = ZealError::FileTooBig;
/// Exhausting the allocator mid-write (should not happen once the
/// pre-check above has passed) is `ENOSPC` in both versions.
const OUT_OF_SPACE_MID_WRITE: ZealError = ZealError::NoSpace;

impl Filesystem {
    pub fn new(image: Image) -> Filesystem {
        Filesystem { image }
    }

    /// Open an existing image and verify it, per `check_integrity()`.
    pub fn open(path: &std::path::Path, base_offset: usize) -> anyhow::Result<Filesystem> {
        let image = Image::open(path, base_offset)?;
        integrity::check(&image)?;
        Ok(Filesystem { image })
    }

    fn page_size(&self) -> usize {
        self.image.layout.page_size
    }

    pub fn getattr(&self, path: &str) -> Result<FileStat> {
        if path == "/" {
            return Ok(FileStat {
                is_dir: true,
                size: self.page_size() as u64,
                nlink: 2,
                mode_bits: 0o755,
                mtime: std::time::UNIX_EPOCH,
                atime: std::time::UNIX_EPOCH,
                ctime: std::time::UNIX_EPOCH,
            });
        }

        let rel = strip_leading_slash(path);
        let result = path::browse(&self.image, rel, false);
        let handle = result.found.ok_or(ZealError::NotFound)?;
        Ok(stat_from_entry(&handle.read(&self.image), self.page_size()))
    }

    /// Resolve a file path for reading/writing. Returns `NotDirectory` for
    /// a path that resolves to a directory, matching `zealfs_open`'s
    /// literal (if surprising) error choice.
    pub fn open_file(&self, path: &str) -> Result<EntryHandle> {
        if path == "/" {
            return Err(ZealError::IsDirectory);
        }
        let rel = strip_leading_slash(path);
        let result = path::browse(&self.image, rel, false);
        let handle = result.found.ok_or(ZealError::NotFound)?;
        if handle.read(&self.image).is_dir() {
            return Err(ZealError::NotDirectory);
        }
        Ok(handle)
    }

    pub fn opendir(&self, path: &str) -> Result<DirHandle> {
        if path == "/" {
            return Ok(DirHandle {
                entries_offset: self.image.layout.page_offset(0)
                    + self.image.layout.root_entries_offset(),
                max_entries: self.image.layout.root_max_entries(),
            });
        }

        let rel = strip_leading_slash(path);
        let result = path::browse(&self.image, rel, false);
        let handle = result.found.ok_or(ZealError::NotFound)?;
        let entry = handle.read(&self.image);
        if !entry.is_dir() {
            return Err(ZealError::NotDirectory);
        }
        Ok(DirHandle {
            entries_offset: self.image.layout.page_offset(entry.start_page),
            max_entries: self.image.layout.dir_max_entries(),
        })
    }

    /// Reference: `zealfs_readdir`, which `filler()`s `.` and `..` ahead of
    /// the real, occupied entries.
    pub fn readdir(&self, dir: &DirHandle) -> Vec<DirEntry> {
        let wide = self.image.layout.wide_entries();
        let mut entries = vec![dot_entry(b"."), dot_entry(b"..")];
        entries.extend((0..dir.max_entries).map(|i| {
            let offset = dir.entries_offset + i * entry::ENTRY_SIZE;
            DirEntry::decode(&self.image.bytes()[offset..offset + entry::ENTRY_SIZE], wide)
        }).filter(|e| e.is_occupied()));
        entries
    }

    /// Reference: `zealfs_read`. Clips the requested length to whatever
    /// remains of the file past `offset`, never the whole file size.
    pub fn read(&self, handle: &EntryHandle, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let entry = handle.read(&self.image);
        let page_payload = self.image.layout.payload_per_page() as u64;
        let mut jump_pages = offset / page_payload;
        let mut offset_in_page = (offset % page_payload) as usize;

        let want = (buf.len() as u64).min(entry.size.saturating_sub(offset)) as usize;
        let total = want;
        let mut remaining = want;

        let mut current_page = entry.start_page;
        while jump_pages > 0 {
            current_page = chain::next(&self.image, current_page);
            jump_pages -= 1;
        }

        let mut out_pos = 0;
        while remaining > 0 {
            let payload = chain::payload_range(&self.image, current_page);
            let available = payload.len() - offset_in_page;
            let count = available.min(remaining);
            let start = payload.start + offset_in_page;
            buf[out_pos..out_pos + count].copy_from_slice(&self.image.bytes()[start..start + count]);

            out_pos += count;
            remaining -= count;
            if remaining > 0 {
                current_page = chain::next(&self.image, current_page);
            }
            offset_in_page = 0;
        }

        Ok(total)
    }

    /// Reference: `zealfs_write`. `entry.size` grows by every byte written,
    /// even inside the file's existing bounds (see module docs).
    pub fn write(&mut self, handle: &EntryHandle, offset: u64, buf: &[u8]) -> Result<usize> {
        let page_payload = self.image.layout.payload_per_page() as u64;
        let jump_pages = offset / page_payload;
        let mut offset_in_page = (offset % page_payload) as usize;
        let remaining_in_page = page_payload as usize - offset_in_page;

        let total = buf.len();
        let free_budget = self.image.free_pages() as u64 * page_payload + remaining_in_page as u64;
        if free_budget < total as u64 {
            return Err(OUT_OF_SPACE_ON_CREATE);
        }

        let mut entry = handle.read(&self.image);
        let mut current_page = entry.start_page;
        for _ in 0..jump_pages {
            current_page = chain::next(&self.image, current_page);
        }

        let mut written = 0usize;
        let mut grown = 0u64;
        while written < total {
            let payload = chain::payload_range(&self.image, current_page);
            let count = (payload.len() - offset_in_page).min(total - written);
            let start = payload.start + offset_in_page;
            self.image.bytes_mut()[start..start + count].copy_from_slice(&buf[written..written + count]);

            grown += count as u64;
            written += count;

            let next = chain::next(&self.image, current_page);
            if next != chain::END_OF_CHAIN {
                current_page = next;
            } else if written < total {
                let new_page = self.image.allocate_page(OUT_OF_SPACE_MID_WRITE)?;
                chain::set_next(&mut self.image, current_page, Some(new_page));
                current_page = new_page;
            }
            offset_in_page = 0;
        }

        entry.size += grown;
        handle.write(&mut self.image, &entry);
        Ok(total)
    }

    fn create_both(&mut self, path: &str, is_dir: bool) -> Result<EntryHandle> {
        let rel = strip_leading_slash(path);
        let result = path::browse(&self.image, rel, true);
        if result.found.is_some() {
            return Err(ZealError::AlreadyExists);
        }
        let handle = result.free_slot.ok_or(ZealError::NoFileSlots)?;

        let name = basename(path);
        if name.len() > NAME_MAX_LEN {
            return Err(ZealError::NameTooLong);
        }

        let new_page = self.image.allocate_page(OUT_OF_SPACE_ON_CREATE)?;

        let mut entry = DirEntry::empty();
        entry.flags = FLAG_OCCUPIED | if is_dir { FLAG_IS_DIR } else { 0 };
        entry.set_name(name.as_bytes());
        entry.start_page = new_page;
        entry.size = if is_dir { self.page_size() as u64 } else { 0 };
        entry.timestamp = Timestamp::now();
        handle.write(&mut self.image, &entry);

        // Matches the original's hardcoded `memset(content, 0, 256)`: only
        // the first 256 bytes of the new page are cleared, even on a V2
        // image with a larger page size.
        let page_start = self.image.layout.page_offset(new_page);
        let clear_len = 256.min(self.image.layout.page_size);
        self.image.bytes_mut()[page_start..page_start + clear_len].fill(0);

        Ok(handle)
    }

    pub fn create(&mut self, path: &str) -> Result<EntryHandle> {
        self.create_both(path, false)
    }

    pub fn mkdir(&mut self, path: &str) -> Result<EntryHandle> {
        self.create_both(path, true)
    }

    fn unlink_handle(&mut self, handle: EntryHandle) -> Result<()> {
        let mut entry = handle.read(&self.image);
        if entry.is_dir() {
            return Err(ZealError::IsDirectory);
        }
        chain::unlink_chain(&mut self.image, entry.start_page);
        entry.flags = 0;
        handle.write(&mut self.image, &entry);
        Ok(())
    }

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let rel = strip_leading_slash(path);
        let result = path::browse(&self.image, rel, false);
        let handle = result.found.ok_or(ZealError::NotFound)?;
        self.unlink_handle(handle)
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        if path == "/" {
            return Err(ZealError::AccessDenied);
        }
        let rel = strip_leading_slash(path);
        let result = path::browse(&self.image, rel, false);
        let handle = result.found.ok_or(ZealError::NotFound)?;
        let mut entry = handle.read(&self.image);
        if !entry.is_dir() {
            return Err(ZealError::NotDirectory);
        }

        let dir_offset = self.image.layout.page_offset(entry.start_page);
        let max_entries = self.image.layout.dir_max_entries();
        let wide = self.image.layout.wide_entries();
        for i in 0..max_entries {
            let offset = dir_offset + i * entry::ENTRY_SIZE;
            let child = DirEntry::decode(&self.image.bytes()[offset..offset + entry::ENTRY_SIZE], wide);
            if child.is_occupied() {
                return Err(ZealError::NotEmpty);
            }
        }

        // The directory's own content page is intentionally not freed
        // here; see module docs.
        entry.flags = 0;
        handle.write(&mut self.image, &entry);
        Ok(())
    }

    /// `no_replace`/`exchange` mirror Linux's `RENAME_NOREPLACE`/
    /// `RENAME_EXCHANGE` flags; `RENAME_EXCHANGE` is unsupported, matching
    /// the original's unconditional `-EFAULT`.
    pub fn rename(&mut self, from: &str, to: &str, no_replace: bool, exchange: bool) -> Result<()> {
        let from_rel = strip_leading_slash(from);
        let to_rel = strip_leading_slash(to);

        let from_result = path::browse(&self.image, from_rel, false);
        let to_result = path::browse(&self.image, to_rel, true);

        let from_handle = from_result.found;
        let to_handle = to_result.found;

        if from_handle.is_none() || (to_handle.is_none() && exchange) {
            return Err(ZealError::NotFound);
        }
        if no_replace && to_handle.is_some() {
            return Err(ZealError::AlreadyExists);
        }
        if exchange {
            return Err(ZealError::Fault);
        }

        let from_handle = from_handle.unwrap();
        let new_name = basename(to);
        if new_name.len() > NAME_MAX_LEN {
            return Err(ZealError::NameTooLong);
        }

        let mut free_slot = to_result.free_slot;
        if let Some(existing) = to_handle {
            // Discard the result: renaming over an existing directory
            // leaves it un-freed, exactly as the original does.
            let _ = self.unlink_handle(existing);
            free_slot = Some(existing);
        }

        let mut from_entry = from_handle.read(&self.image);
        from_entry.set_name(new_name.as_bytes());

        let same_dir = dirname(from) == dirname(to);
        if same_dir {
            from_handle.write(&mut self.image, &from_entry);
        } else {
            let dest = free_slot.ok_or(ZealError::NoMemory)?;
            dest.write(&mut self.image, &from_entry);
            from_handle.write(&mut self.image, &DirEntry::empty());
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layout::Layout;

    fn new_fs_v1(total_size: u64) -> Filesystem {
        Filesystem::new(Image::new_in_memory(Layout::new_v1(total_size), total_size))
    }

    #[test]
    fn create_read_write_round_trip() {
        let mut fs = new_fs_v1(8192);
        let handle = fs.create("/hello.txt").unwrap();
        let written = fs.write(&handle, 0, b"hello world").unwrap();
        assert_eq!(written, 11);

        let mut buf = [0u8; 11];
        let read = fs.read(&handle, 0, &mut buf).unwrap();
        assert_eq!(read, 11);
        assert_eq!(&buf, b"hello world");
    }

    #[test]
    fn write_grows_size_even_on_overwrite() {
        let mut fs = new_fs_v1(8192);
        let handle = fs.create("/a.txt").unwrap();
        fs.write(&handle, 0, b"abcdef").unwrap();
        fs.write(&handle, 0, b"xy").unwrap();
        let entry = handle.read(&fs.image);
        // 6 bytes from the first write, plus 2 more counted on the
        // overwrite, even though nothing was appended.
        assert_eq!(entry.size, 8);
    }

    #[test]
    fn create_duplicate_fails() {
        let mut fs = new_fs_v1(8192);
        fs.create("/a.txt").unwrap();
        assert_eq!(fs.create("/a.txt"), Err(ZealError::AlreadyExists));
    }

    #[test]
    fn open_directory_as_file_is_not_directory_error() {
        let mut fs = new_fs_v1(8192);
        fs.mkdir("/sub").unwrap();
        assert_eq!(fs.open_file("/sub"), Err(ZealError::NotDirectory));
    }

    #[test]
    fn rmdir_requires_empty() {
        let mut fs = new_fs_v1(8192);
        fs.mkdir("/sub").unwrap();
        fs.create("/sub/a.txt").unwrap();
        assert_eq!(fs.rmdir("/sub"), Err(ZealError::NotEmpty));
    }

    #[test]
    fn rmdir_root_is_access_denied() {
        let mut fs = new_fs_v1(8192);
        assert_eq!(fs.rmdir("/"), Err(ZealError::AccessDenied));
    }

    #[test]
    fn unlink_then_lookup_not_found() {
        let mut fs = new_fs_v1(8192);
        fs.create("/a.txt").unwrap();
        fs.unlink("/a.txt").unwrap();
        assert_eq!(fs.getattr("/a.txt"), Err(ZealError::NotFound));
    }

    #[test]
    fn rename_same_directory() {
        let mut fs = new_fs_v1(8192);
        fs.create("/a.txt").unwrap();
        fs.rename("/a.txt", "/b.txt", false, false).unwrap();
        assert!(fs.getattr("/a.txt").is_err());
        assert!(fs.getattr("/b.txt").is_ok());
    }

    #[test]
    fn rename_noreplace_existing_fails() {
        let mut fs = new_fs_v1(8192);
        fs.create("/a.txt").unwrap();
        fs.create("/b.txt").unwrap();
        assert_eq!(
            fs.rename("/a.txt", "/b.txt", true, false),
            Err(ZealError::AlreadyExists)
        );
    }

    #[test]
    fn rename_across_directories() {
        let mut fs = new_fs_v1(8192);
        fs.mkdir("/sub").unwrap();
        fs.create("/a.txt").unwrap();
        fs.rename("/a.txt", "/sub/a.txt", false, false).unwrap();
        assert!(fs.getattr("/a.txt").is_err());
        assert!(fs.getattr("/sub/a.txt").is_ok());
    }

    #[test]
    fn readdir_lists_dot_dirs_then_occupied_entries() {
        let mut fs = new_fs_v1(8192);
        fs.create("/a.txt").unwrap();
        fs.create("/b.txt").unwrap();
        let dir = fs.opendir("/").unwrap();
        let names: Vec<_> = fs
            .readdir(&dir)
            .into_iter()
            .map(|e| e.name_bytes().to_vec())
            .collect();
        assert_eq!(names.len(), 4);
        assert_eq!(names[0], b".".to_vec());
        assert_eq!(names[1], b"..".to_vec());
        assert!(names.contains(&b"a.txt".to_vec()));
        assert!(names.contains(&b"b.txt".to_vec()));
    }

    #[test]
    fn read_clips_to_remaining_size_from_offset() {
        let mut fs = new_fs_v1(8192);
        let handle = fs.create("/a.txt").unwrap();
        fs.write(&handle, 0, b"0123456789").unwrap();

        // Ask for 10 bytes starting at offset 5: only 5 bytes remain past
        // the offset, so the read must clip there, not at the whole size.
        let mut buf = [0xAAu8; 10];
        let read = fs.read(&handle, 5, &mut buf).unwrap();
        assert_eq!(read, 5);
        assert_eq!(&buf[..5], b"56789");
    }
}
