mod mem_file_system;

pub mod fixture;

pub use mem_file_system::MemFileSystem;
