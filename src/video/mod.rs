//! Disk-Video 会话
//!
//! [`DiskVideo`] 拥有一个后备存储、一个缓存槽池和一个状态接收者，
//! 对外提供按 (列, 行) 寻址的像素读写以及按块限定的原始字节访问。
//!
//! - video/session.rs - 打开、关闭与访问器
//! - video/engine.rs - 装载、驱逐与合并写回
//! - video/access.rs - 像素、RGB、势能与原始字节访问
//!
//! # 示例
//!
//! ```rust,ignore
//! use diskvid_core::{DiskVideo, DiskVideoConfig, MemoryStore};
//!
//! let config = DiskVideoConfig::default();
//! let store = MemoryStore::new(config.block_len);
//! let mut video = DiskVideo::open(store, config, 640, 480, 256)?;
//!
//! video.write_pixel(10, 20, 7)?;
//! assert_eq!(video.read_pixel(10, 20)?, 7);
//! video.close()?;
//! ```

mod access;
mod engine;
mod session;

use crate::cache::{CacheStats, SlotId, SlotPool};
use crate::status::{NoStatus, StatusSink};
use crate::store::{BackingStore, BlockStream};
use crate::transcode::PixelShift;
use crate::types::{DiskVideoConfig, Geometry, SessionFlags};
use alloc::vec::Vec;

/// Disk-Video 会话
///
/// 单线程使用，所有操作在调用线程上同步完成。多个会话可以共存，
/// 彼此之间没有共享状态。
pub struct DiskVideo<S: BackingStore, T: StatusSink = NoStatus> {
    store: S,
    status: T,
    stream: BlockStream,
    pool: SlotPool,
    config: DiskVideoConfig,
    geometry: Geometry,
    shift: PixelShift,
    flags: SessionFlags,
    /// 逻辑容量（块对齐的图像长度）
    capacity: u64,
    /// 打包后的块暂存
    packed: Vec<u8>,
    /// 引用过的最大块偏移；之后的块视为全零
    high_water: Option<u64>,
    /// 暂存层当前所在的打包偏移，`None` 表示下次读取前必须重定位
    seek_offset: Option<u64>,
    /// 最近访问的块及其槽
    current: Option<(u64, SlotId)>,
    /// 最近访问的行及其起始偏移
    current_row: Option<(u32, u64)>,
    /// 距下一次状态报告的访问次数
    countdown: u32,
    stats: CacheStats,
    active: bool,
}
