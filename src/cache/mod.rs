//! 块缓存模块
//!
//! 固定数量的缓存槽保存常驻块的像素（每像素一字节），通过哈希索引
//! 按块偏移查找，按时钟（二次机会）策略近似 LRU 地驱逐，驱逐脏块时
//! 合并相邻脏块成连续写序列。
//!
//! # 主要组件
//!
//! - [`Slot`] / [`SlotState`] - 槽元数据与显式状态机
//! - [`HashIndex`] - 块偏移到槽的链式哈希
//! - [`SlotPool`] - 槽数组、像素内存和时钟指针
//! - [`plan_write_back`] - 写回合并规划
//! - [`CacheStats`] - 缓存统计信息
//!
//! # 槽状态
//!
//! ```text
//! Unloaded --Load--> Clean --Modify--> Dirty
//!    ^                 |  ^              |
//!    +-----Evict-------+  +--WriteBack---+
//! ```

mod flush;
mod hash;
mod pool;
mod slot;

pub use flush::{plan_write_back, WriteRun};
pub use hash::HashIndex;
pub use pool::SlotPool;
pub use slot::{Slot, SlotEvent, SlotId, SlotState};

/// 缓存统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 命中次数
    pub hits: u64,
    /// 未命中次数
    pub misses: u64,
    /// 超过高水位、直接清零而未读后备存储的装载次数
    pub zero_loads: u64,
    /// 驱逐已装载块的次数
    pub evictions: u64,
    /// 写序列数（每段需要一次重定位）
    pub write_runs: u64,
    /// 写回的块数
    pub blocks_written: u64,
}

impl CacheStats {
    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
