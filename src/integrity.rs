//! Post-load sanity checks.
//!
//! Reference: `check_integrity()` in zealfs_v1.c/zealfs_v2.c. Three checks
//! are hard failures (bad magic, zero-length bitmap, bitmap claiming more
//! space than the file actually has); two are warnings logged and
//! otherwise ignored, since the original only `printf`s them and keeps
//! going. Warnings go through `log::warn!`, matching the teacher's use of
//! the `log` crate for non-fatal diagnostics (see `log.rs`).

use crate::error::{Result, ZealError};
use crate::header;
use crate::image::Image;

pub fn check(image: &Image) -> Result<()> {
    let bytes = image.bytes();

    if header::read_magic(bytes) != header::MAGIC {
        return Err(ZealError::Corrupt(
            "invalid magic header in the image".to_string(),
        ));
    }

    if image.layout.bitmap_size == 0 {
        return Err(ZealError::Corrupt("invalid 0 size for bitmap".to_string()));
    }

    let claimed_size = image.layout.claimed_size();
    let actual_size = image.len() as u64;

    if claimed_size > actual_size {
        return Err(ZealError::Corrupt(format!(
            "header says the image is {claimed_size} bytes ({} bytes/page) but actual size is {actual_size}",
            image.layout.page_size
        )));
    }

    if claimed_size < actual_size {
        log::warn!(
            "image size according to the bitmap ({claimed_size}) is smaller than file size \
             ({actual_size}); some part of the image will be unreachable"
        );
    }

    let counted_free = image.count_free_bitmap();
    let declared_free = image.free_pages();

    if counted_free > declared_free {
        log::warn!(
            "the number of pages marked free according to the bitmap ({counted_free}) is \
             bigger than the header's count ({declared_free})"
        );
    }

    if counted_free < declared_free {
        return Err(ZealError::Corrupt(format!(
            "the header's free page count ({declared_free}) is bigger than the actual \
             count ({counted_free}); some pages may be unreachable"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layout::Layout;

    #[test]
    fn freshly_formatted_image_passes() {
        let layout = Layout::new_v1(4096);
        let image = Image::new_in_memory(layout, 4096);
        assert!(check(&image).is_ok());
    }

    #[test]
    fn bad_magic_fails() {
        let layout = Layout::new_v1(4096);
        let mut image = Image::new_in_memory(layout, 4096);
        image.bytes_mut()[0] = b'X';
        assert!(matches!(check(&image), Err(ZealError::Corrupt(_))));
    }

    #[test]
    fn counted_greater_than_declared_only_warns() {
        let layout = Layout::new_v1(4096);
        let mut image = Image::new_in_memory(layout, 4096);
        let declared = image.free_pages();
        image.set_free_pages(declared - 1);
        assert!(check(&image).is_ok());
    }

    #[test]
    fn counted_less_than_declared_fails() {
        let layout = Layout::new_v1(4096);
        let mut image = Image::new_in_memory(layout, 4096);
        let declared = image.free_pages();
        image.set_free_pages(declared + 1);
        assert!(matches!(check(&image), Err(ZealError::Corrupt(_))));
    }
}
