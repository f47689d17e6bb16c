//! diskvid_core: 磁盘支持的虚拟帧缓冲
//!
//! 让调用者按 (列, 行) 寻址一块远大于可用内存的像素帧缓冲：
//! 定长块在后备存储（内存区域或磁盘文件）与固定大小的缓存之间
//! 透明换入换出。
//!
//! - **时钟置换**：二次机会策略近似 LRU
//! - **合并写回**：驱逐脏块时把附近脏块合成少数几段连续写
//! - **高水位**：从未引用过的块视为全零，不读后备存储
//! - **位深打包**：后备存储按 1/2/4/8 位每像素紧凑存放
//!
//! # 示例
//!
//! ```rust,ignore
//! use diskvid_core::{DiskVideo, DiskVideoConfig, MemoryStore, Result};
//!
//! fn main() -> Result<()> {
//!     let config = DiskVideoConfig::default();
//!     let store = MemoryStore::new(config.block_len);
//!
//!     // 1024x768，16 色：后备存储每字节两个像素
//!     let mut video = DiskVideo::open(store, config, 1024, 768, 16)?;
//!     video.write_pixel(100, 200, 9)?;
//!     assert_eq!(video.read_pixel(100, 200)?, 9);
//!
//!     // 越界访问是空操作
//!     assert_eq!(video.read_pixel(5000, 0)?, 0);
//!
//!     video.close()
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`consts`] - 常量定义
//! - [`types`] - 配置与几何
//! - [`transcode`] - 像素深度打包
//! - [`status`] - 状态报告
//! - [`store`] - 后备存储与暂存层
//! - [`cache`] - 缓存槽、哈希索引与写回规划
//! - [`video`] - Disk-Video 会话

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 配置与几何
pub mod types;

/// 像素深度转码
pub mod transcode;

/// 状态报告
pub mod status;

/// 后备存储
pub mod store;

/// 块缓存
pub mod cache;

/// Disk-Video 会话
pub mod video;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 配置
pub use types::{DiskVideoConfig, Geometry, OpenRequest, SessionFlags, SessionMode, StoreKind};

// 转码
pub use transcode::PixelShift;

// 状态
pub use status::{InitControl, NoStatus, Status, StatusSink};

// 后备存储
pub use store::{BackingStore, BlockStream, MemoryStore, StreamMode, StreamStats};

#[cfg(feature = "std")]
pub use store::FileStore;

// 缓存
pub use cache::CacheStats;

// 会话
pub use video::DiskVideo;
