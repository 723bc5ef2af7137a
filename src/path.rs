//! Path resolution: walking a `/`-separated path down through nested
//! directories of 32-byte entries.
//!
//! Reference: `browse_path` in zealfs_v1.c/zealfs_v2.c. The original takes
//! the path with its leading `/` already stripped, an `entries` pointer for
//! the directory currently being searched, a `root` flag (root has fewer
//! max entries than a regular directory), and an optional out-pointer for a
//! free slot. It recurses into a subdirectory's own entries when the path
//! has more components left, with no check that the matched entry is
//! actually a directory — found-but-wrong-type is left for the caller
//! (`lookup`/`open`/`opendir`) to report as ENOTDIR/EISDIR.
//!
//! The free slot handed back is the *first* empty entry encountered while
//! scanning the final directory; once set it is never overwritten by a
//! later empty entry.

use crate::entry::{DirEntry, NAME_MAX_LEN};
use crate::image::Image;

/// A resolved (or free) directory slot: nothing more than the absolute byte
/// offset of its 32-byte record, per the "entry handles instead of
/// pointers" design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHandle {
    pub byte_offset: usize,
}

impl EntryHandle {
    pub fn read(&self, image: &Image) -> DirEntry {
        let wide = image.layout.wide_entries();
        DirEntry::decode(
            &image.bytes()[self.byte_offset..self.byte_offset + crate::entry::ENTRY_SIZE],
            wide,
        )
    }

    pub fn write(&self, image: &mut Image, entry: &DirEntry) {
        let wide = image.layout.wide_entries();
        entry.encode(
            &mut image.bytes_mut()[self.byte_offset..self.byte_offset + crate::entry::ENTRY_SIZE],
            wide,
        );
    }
}

pub struct BrowseResult {
    pub found: Option<EntryHandle>,
    pub free_slot: Option<EntryHandle>,
}

/// Resolve `path` (no leading `/`) starting from the root directory.
/// `want_free_slot` mirrors passing a non-NULL `free_entry` to
/// `browse_path`: only meaningful when the final component is absent, and
/// always scanned for even when `found` comes back `Some` (the original
/// does too, it's just unused by callers in that case).
pub fn browse(image: &Image, path: &str, want_free_slot: bool) -> BrowseResult {
    let root_offset =
        image.layout.page_offset(0) + image.layout.root_entries_offset();
    let max_entries = image.layout.root_max_entries();

    let mut free_slot = None;
    let found = browse_dir(
        image,
        path,
        root_offset,
        max_entries,
        want_free_slot.then_some(&mut free_slot),
    );

    BrowseResult { found, free_slot }
}

fn split_first_component(path: &str) -> (&str, Option<&str>) {
    match path.find('/') {
        Some(idx) => (&path[..idx], Some(&path[idx + 1..])),
        None => (path, None),
    }
}

fn browse_dir(
    image: &Image,
    path: &str,
    dir_offset: usize,
    max_entries: usize,
    mut free_slot: Option<&mut Option<EntryHandle>>,
) -> Option<EntryHandle> {
    let (name, rest) = split_first_component(path);
    if name.len() > NAME_MAX_LEN {
        return None;
    }
    let is_last = rest.is_none();
    let wide = image.layout.wide_entries();

    for i in 0..max_entries {
        let byte_offset = dir_offset + i * crate::entry::ENTRY_SIZE;
        let entry = DirEntry::decode(
            &image.bytes()[byte_offset..byte_offset + crate::entry::ENTRY_SIZE],
            wide,
        );

        if !entry.is_occupied() {
            if is_last {
                if let Some(slot) = free_slot.as_deref_mut() {
                    if slot.is_none() {
                        *slot = Some(EntryHandle { byte_offset });
                    }
                }
            }
            continue;
        }

        if entry.name_matches(name.as_bytes()) {
            if is_last {
                return Some(EntryHandle { byte_offset });
            }
            let sub_offset = image.layout.page_offset(entry.start_page);
            let sub_max = image.layout.dir_max_entries();
            return browse_dir(image, rest.unwrap(), sub_offset, sub_max, free_slot);
        }
    }

    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entry::FLAG_OCCUPIED;
    use crate::layout::Layout;

    fn put_entry(image: &mut Image, offset: usize, name: &[u8], page: u32) {
        let mut entry = DirEntry::empty();
        entry.flags = FLAG_OCCUPIED;
        entry.set_name(name);
        entry.start_page = page;
        let wide = image.layout.wide_entries();
        entry.encode(
            &mut image.bytes_mut()[offset..offset + crate::entry::ENTRY_SIZE],
            wide,
        );
    }

    #[test]
    fn finds_top_level_file() {
        let layout = Layout::new_v1(4096);
        let mut image = Image::new_in_memory(layout, 4096);
        let root_offset = image.layout.page_offset(0) + image.layout.root_entries_offset();
        put_entry(&mut image, root_offset, b"a.txt", 2);

        let result = browse(&image, "a.txt", false);
        assert!(result.found.is_some());
        assert_eq!(result.found.unwrap().read(&image).start_page, 2);
    }

    #[test]
    fn finds_nested_file() {
        let layout = Layout::new_v1(4096);
        let mut image = Image::new_in_memory(layout, 4096);
        let root_offset = image.layout.page_offset(0) + image.layout.root_entries_offset();
        put_entry(&mut image, root_offset, b"sub", 2);
        let sub_offset = image.layout.page_offset(2);
        put_entry(&mut image, sub_offset, b"b.txt", 3);

        let result = browse(&image, "sub/b.txt", false);
        assert_eq!(result.found.unwrap().read(&image).start_page, 3);
    }

    #[test]
    fn free_slot_is_the_first_one_scanned() {
        let layout = Layout::new_v1(4096);
        let image = Image::new_in_memory(layout, 4096);
        let root_offset = image.layout.page_offset(0) + image.layout.root_entries_offset();

        let result = browse(&image, "new.txt", true);
        assert!(result.found.is_none());
        assert_eq!(result.free_slot.unwrap().byte_offset, root_offset);
    }

    #[test]
    fn overlong_component_is_not_found() {
        let layout = Layout::new_v1(4096);
        let image = Image::new_in_memory(layout, 4096);
        let result = browse(&image, "this-name-is-absolutely-too-long.txt", false);
        assert!(result.found.is_none());
    }
}
