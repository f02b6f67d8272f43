mod error;
mod manager;
mod traits;

pub mod filesystem;
pub mod memory;

pub use error::StorageError;
pub use filesystem::FilesystemDisk;
pub use manager::DiskManager;
pub use memory::MemoryDisk;
pub use traits::{BoxReader, PutOptions, StorageBackend, Visibility};
