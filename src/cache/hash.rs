//! 块偏移到槽的哈希索引
//!
//! 链式散列：每个桶保存链头，链接字段存放在槽自身（[`Slot::hash_link`]）。
//! 链是单向的，删除时从桶头遍历；表按最大槽数取整，链通常很短。

use super::slot::{Slot, SlotId};
use crate::error::{Error, ErrorKind, Result};
use alloc::vec::Vec;

/// 哈希索引
#[derive(Debug)]
pub struct HashIndex {
    heads: Vec<Option<SlotId>>,
    mask: u64,
    block_shift: u32,
}

impl HashIndex {
    /// 创建 `size` 个桶的索引（`size` 必须是 2 的幂）
    pub fn new(size: usize, block_shift: u32) -> Result<Self> {
        if !size.is_power_of_two() {
            return Err(Error::new(ErrorKind::InvalidInput, "hash size must be a power of two"));
        }
        let mut heads = Vec::new();
        heads
            .try_reserve_exact(size)
            .map_err(|e| Error::with_cause(ErrorKind::OutOfMemory, "insufficient memory for hash index", e))?;
        heads.resize(size, None);
        Ok(Self { heads, mask: size as u64 - 1, block_shift })
    }

    /// 桶数
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    /// 是否没有桶
    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// `(offset >> block_shift) & (size - 1)`
    pub fn bucket(&self, offset: u64) -> usize {
        ((offset >> self.block_shift) & self.mask) as usize
    }

    /// 查找偏移恰为 `offset` 的槽
    pub fn find(&self, slots: &[Slot], offset: u64) -> Option<SlotId> {
        let mut link = self.heads[self.bucket(offset)];
        while let Some(id) = link {
            if slots[id].offset == offset {
                return Some(id);
            }
            link = slots[id].hash_link;
        }
        None
    }

    /// 把槽按其当前偏移挂入链头
    pub fn insert(&mut self, slots: &mut [Slot], id: SlotId) {
        let bucket = self.bucket(slots[id].offset);
        slots[id].hash_link = self.heads[bucket];
        self.heads[bucket] = Some(id);
    }

    /// 把槽从其当前偏移所在的链中摘除
    ///
    /// 槽不在链中时返回 `false`。
    pub fn remove(&mut self, slots: &mut [Slot], id: SlotId) -> bool {
        let bucket = self.bucket(slots[id].offset);
        let next = slots[id].hash_link;

        if self.heads[bucket] == Some(id) {
            self.heads[bucket] = next;
            slots[id].hash_link = None;
            return true;
        }

        let mut link = self.heads[bucket];
        while let Some(cur) = link {
            if slots[cur].hash_link == Some(id) {
                slots[cur].hash_link = next;
                slots[id].hash_link = None;
                return true;
            }
            link = slots[cur].hash_link;
        }
        false
    }

    /// 某个桶的链长
    pub fn chain_len(&self, slots: &[Slot], bucket: usize) -> usize {
        let mut len = 0;
        let mut link = self.heads[bucket];
        while let Some(id) = link {
            len += 1;
            link = slots[id].hash_link;
        }
        len
    }
}
