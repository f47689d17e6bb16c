//! 后备存储适配层
//!
//! store/device.rs 定义 [`BackingStore`] trait：按固定长度块读写的平坦介质。
//! store/memory.rs 和 store/file.rs 分别提供内存与磁盘文件实现。
//! store/stream.rs 提供 [`BlockStream`]：在后备存储之上按字节顺序读写的暂存层，
//! 只在跨块或显式重定位时才与介质交换数据。

mod device;
mod memory;
mod stream;

#[cfg(feature = "std")]
mod file;

#[cfg(test)]
pub(crate) mod mock;

pub use device::BackingStore;
pub use memory::MemoryStore;
pub use stream::{BlockStream, StreamMode, StreamStats};

#[cfg(feature = "std")]
pub use file::FileStore;
