use std::fs::OpenOptions;
use std::io::Read;

use anyhow::Context;
use clap::Parser;

use zealfs::config::Config;
use zealfs::fs::Filesystem;
use zealfs::image::Image;
use zealfs::mbr;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::parse();

    println!("Info: using disk image {}", config.image.display());

    let fs = if config.image.exists() {
        open_existing(&config)?
    } else {
        create_new(&config)?
    };

    if let Some(mountpoint) = &config.mountpoint {
        log::info!(
            "mountpoint {} recorded, no adapter is wired up to use it here",
            mountpoint.display()
        );
    }
    log::info!(
        "image mapped {}",
        if config.write { "read-write" } else { "read-only (no mutation will be flushed)" }
    );

    let stat = fs.getattr(&config.list)?;
    println!(
        "{} is a {} ({} bytes)",
        config.list,
        if stat.is_dir { "directory" } else { "file" },
        stat.size
    );

    if stat.is_dir {
        let dir = fs.opendir(&config.list)?;
        for entry in fs.readdir(&dir) {
            let kind = if entry.is_dir() { "dir " } else { "file" };
            println!(
                "  [{kind}] {:<16} {} bytes",
                String::from_utf8_lossy(entry.name_bytes()),
                entry.size
            );
        }
    }

    fs.image.flush()?;
    Ok(())
}

fn open_existing(config: &Config) -> anyhow::Result<Filesystem> {
    let mut file = OpenOptions::new()
        .read(true)
        .open(&config.image)
        .with_context(|| format!("open disk image at {}", config.image.display()))?;
    let file_size = file.metadata()?.len();

    let mut first_sector = [0u8; mbr::MBR_SIZE];
    let base_offset = if file.read_exact(&mut first_sector).is_ok() {
        mbr::find_partition(&first_sector, file_size)
            .map(|(offset, _)| offset as usize)
            .unwrap_or(0)
    } else {
        0
    };

    Filesystem::open(&config.image, base_offset)
}

fn create_new(config: &Config) -> anyhow::Result<Filesystem> {
    let version = config.version.into();
    let partition_size = config.size_bytes();

    let want_mbr = config.mbr && version == zealfs::layout::Version::V2;
    if config.mbr && !want_mbr {
        println!("WARNING: MBR creation not valid with ZealFSv1, ignoring");
    }

    let base_offset = if want_mbr { mbr::SECTOR_SIZE as usize } else { 0 };

    let image = Image::create(&config.image, base_offset, partition_size, version)?;

    if want_mbr {
        use std::io::Write as _;
        let sector = mbr::create(base_offset as u64, partition_size)
            .context("partition offset/size must be sector-aligned")?;
        let mut file = OpenOptions::new()
            .write(true)
            .open(&config.image)
            .with_context(|| format!("patch MBR into {}", config.image.display()))?;
        file.write_all(&sector)?;
    }

    Ok(Filesystem::new(image))
}
