use bolero::check;
use zealfs::fs::Filesystem;
use zealfs::image::Image;
use zealfs::layout::Version;

/// Random content read back through a freshly created image, exercising
/// the page allocator and chain-following across page boundaries (V2's
/// 1KB pages here, so content past ~1000 bytes forces at least one
/// chain hop).
fn main() {
    let size = 256 * 1024; // 256 KiB, picks a 1024-byte page size

    check!().with_type().for_each(|content: &Vec<u8>| {
        // Keep each case small enough to comfortably fit the image, but
        // still large enough to regularly span several pages.
        let content: Vec<u8> = content.iter().copied().take(4000).collect();

        let temp_file = tempfile::NamedTempFile::new().expect("create temp file");
        let path = temp_file.path();

        let image = Image::create(path, 0, size, Version::V2).expect("format new image");
        let mut fs = Filesystem::new(image);

        let handle = fs.create("/data.bin").expect("create file");
        let written = fs.write(&handle, 0, &content).expect("write content");
        assert_eq!(written, content.len());

        let mut read_back = vec![0u8; content.len()];
        let read = fs.read(&handle, 0, &mut read_back).expect("read content back");
        assert_eq!(read, content.len());
        assert_eq!(read_back, content);

        let stat = fs.getattr("/data.bin").expect("stat round trip");
        assert_eq!(stat.size, content.len() as u64);
    });
}
