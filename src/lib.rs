pub mod bcd;
pub mod bitmap;
pub mod chain;
pub mod config;
pub mod entry;
pub mod error;
pub mod fs;
pub mod header;
pub mod image;
pub mod integrity;
pub mod layout;
pub mod mach;
pub mod mbr;
pub mod path;
