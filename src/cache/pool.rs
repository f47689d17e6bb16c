//! 固定大小的缓存槽池
//!
//! 所有槽的像素数据放在一段连续内存里，第 `id` 个槽占
//! `[id * block_len, (id + 1) * block_len)`。打开时每个槽都以占位
//! 偏移挂入哈希索引，因此不需要空闲链表。

use super::hash::HashIndex;
use super::slot::{Slot, SlotEvent, SlotId};
use crate::error::{Error, ErrorKind, Result};
use crate::types::DiskVideoConfig;
use alloc::vec::Vec;

/// 缓存槽池
#[derive(Debug)]
pub struct SlotPool {
    slots: Vec<Slot>,
    pixels: Vec<u8>,
    index: HashIndex,
    /// 时钟指针：上一次选中的牺牲槽
    hand: SlotId,
    block_len: usize,
}

impl SlotPool {
    /// 创建 `count` 个槽的池
    pub fn new(count: usize, block_len: usize, hash_size: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "cache needs at least one slot"));
        }
        let bytes = count
            .checked_mul(block_len)
            .ok_or(Error::new(ErrorKind::OutOfMemory, "cache size overflow"))?;

        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(bytes)
            .map_err(|e| Error::with_cause(ErrorKind::OutOfMemory, "insufficient memory for cache buffers", e))?;
        pixels.resize(bytes, 0);

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(count)
            .map_err(|e| Error::with_cause(ErrorKind::OutOfMemory, "insufficient memory for cache slots", e))?;
        slots.extend((0..count).map(|id| Slot::placeholder(id, block_len)));

        let mut index = HashIndex::new(hash_size, block_len.trailing_zeros())?;
        for id in 0..count {
            index.insert(&mut slots, id);
        }

        Ok(Self { slots, pixels, index, hand: count - 1, block_len })
    }

    /// 按配置分配：先尝试最大预算，内存不足时逐槽递减，低于最小预算则失败
    pub fn allocate(config: &DiskVideoConfig) -> Result<Self> {
        let min = config.min_slots().max(1);
        let mut count = if config.minimal_cache { min } else { config.max_slots().max(min) };
        let hash_size = config.effective_hash_size();

        loop {
            match Self::new(count, config.block_len, hash_size) {
                Ok(pool) => {
                    if count < config.max_slots() && !config.minimal_cache {
                        log::warn!(
                            "[CACHE] reduced cache to {} slots ({} requested)",
                            count,
                            config.max_slots()
                        );
                    }
                    return Ok(pool);
                }
                Err(e) if e.kind() == ErrorKind::OutOfMemory && count > min => count -= 1,
                Err(e) => return Err(e),
            }
        }
    }

    /// 槽数
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// 是否没有槽
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 块长度
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// 哈希索引
    pub fn index(&self) -> &HashIndex {
        &self.index
    }

    /// 槽元数据
    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id]
    }

    /// 槽元数据（可变）
    pub fn slot_mut(&mut self, id: SlotId) -> &mut Slot {
        &mut self.slots[id]
    }

    /// 槽的像素
    pub fn pixels(&self, id: SlotId) -> &[u8] {
        let start = id * self.block_len;
        &self.pixels[start..start + self.block_len]
    }

    /// 槽的像素（可变）
    pub fn pixels_mut(&mut self, id: SlotId) -> &mut [u8] {
        let start = id * self.block_len;
        &mut self.pixels[start..start + self.block_len]
    }

    /// 查找已装载的块
    pub fn find(&self, offset: u64) -> Option<SlotId> {
        self.index
            .find(&self.slots, offset)
            .filter(|&id| self.slots[id].is_resident())
    }

    /// 查找已装载且需要写回的块
    pub fn find_dirty(&self, offset: u64) -> Option<SlotId> {
        self.find(offset).filter(|&id| self.slots[id].is_dirty())
    }

    /// 标记最近使用
    pub fn touch(&mut self, id: SlotId) {
        self.slots[id].recently_used = true;
    }

    /// 时钟扫描选择牺牲槽
    ///
    /// 从上一个牺牲槽之后开始循环：时钟位为假的槽被选中；
    /// 时钟位为真的槽清除该位后跳过，获得一轮宽限。最多两圈必定结束。
    pub fn select_victim(&mut self) -> SlotId {
        loop {
            self.hand += 1;
            if self.hand >= self.slots.len() {
                self.hand = 0;
            }
            let slot = &mut self.slots[self.hand];
            if !slot.recently_used {
                return self.hand;
            }
            slot.recently_used = false;
        }
    }

    /// 驱逐槽并以新偏移重新挂链
    ///
    /// 脏槽必须已经写回。
    pub fn rebind(&mut self, id: SlotId, offset: u64) {
        debug_assert!(!self.slots[id].is_dirty(), "rebinding a dirty slot");
        self.slots[id].apply(SlotEvent::Evict);
        let linked = self.index.remove(&mut self.slots, id);
        debug_assert!(linked, "slot missing from its hash chain");
        self.slots[id].offset = offset;
        self.index.insert(&mut self.slots, id);
    }

    /// 在槽内写一个字节，值不同才标脏
    ///
    /// 返回是否发生了改变。
    pub fn store_pixel(&mut self, id: SlotId, sub: usize, value: u8) -> bool {
        let px = &mut self.pixels[id * self.block_len + sub];
        if *px == value {
            return false;
        }
        *px = value;
        self.slots[id].apply(SlotEvent::Modify);
        true
    }

    /// 在槽内写一段字节并标脏，每个字节先按 `mask` 截断
    pub fn store_bytes(&mut self, id: SlotId, sub: usize, data: &[u8], mask: u8) {
        let start = id * self.block_len + sub;
        for (px, &value) in self.pixels[start..start + data.len()].iter_mut().zip(data) {
            *px = value & mask;
        }
        self.slots[id].apply(SlotEvent::Modify);
    }

    /// 所有脏槽
    pub fn dirty_slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_dirty())
            .map(|(id, _)| id)
    }

    /// 脏槽数量
    pub fn dirty_count(&self) -> usize {
        self.dirty_slots().count()
    }

    /// 释放所有内存
    pub fn release(&mut self) {
        self.slots = Vec::new();
        self.pixels = Vec::new();
        self.hand = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SlotState;
    use crate::consts::PLACEHOLDER_BASE;

    /// 装载槽：模拟一次未命中
    fn load(pool: &mut SlotPool, offset: u64) -> SlotId {
        let id = pool.select_victim();
        pool.rebind(id, offset);
        pool.slot_mut(id).apply(SlotEvent::Load);
        pool.touch(id);
        id
    }

    #[test]
    fn test_placeholders_seeded() {
        let pool = SlotPool::new(4, 16, 4).unwrap();
        assert_eq!(pool.len(), 4);
        for id in 0..4 {
            let slot = pool.slot(id);
            assert_eq!(slot.state, SlotState::Unloaded);
            assert!(slot.offset > PLACEHOLDER_BASE);
            // 每个占位槽都在链中，但不是已装载块
            assert_eq!(pool.index().find(&pool.slots, slot.offset), Some(id));
            assert_eq!(pool.find(slot.offset), None);
        }
        assert_eq!(pool.find(0), None);
    }

    #[test]
    fn test_clock_picks_slots_in_order() {
        let mut pool = SlotPool::new(3, 16, 4).unwrap();
        assert_eq!(pool.select_victim(), 0);
        assert_eq!(pool.select_victim(), 1);
        assert_eq!(pool.select_victim(), 2);
        assert_eq!(pool.select_victim(), 0);
    }

    #[test]
    fn test_clock_second_chance() {
        let mut pool = SlotPool::new(3, 16, 4).unwrap();
        let a = load(&mut pool, 0);
        let b = load(&mut pool, 16);
        let c = load(&mut pool, 32);
        assert_eq!((a, b, c), (0, 1, 2));

        // 全部刚用过：第一圈清位，第二圈选中 0
        assert_eq!(pool.select_victim(), 0);
        assert!(!pool.slot(1).recently_used);

        // 再访问 1，下一次跳过 1 选中 2
        pool.touch(1);
        assert_eq!(pool.select_victim(), 2);
        assert!(!pool.slot(1).recently_used);
    }

    #[test]
    fn test_single_slot_clock() {
        let mut pool = SlotPool::new(1, 16, 1).unwrap();
        load(&mut pool, 0);
        assert_eq!(pool.select_victim(), 0);
    }

    #[test]
    fn test_rebind_moves_chain() {
        let mut pool = SlotPool::new(2, 16, 2).unwrap();
        let id = load(&mut pool, 32);
        assert_eq!(pool.find(32), Some(id));

        pool.rebind(id, 48);
        pool.slot_mut(id).apply(SlotEvent::Load);
        assert_eq!(pool.find(32), None);
        assert_eq!(pool.find(48), Some(id));
    }

    #[test]
    fn test_store_pixel_write_if_changed() {
        let mut pool = SlotPool::new(1, 16, 1).unwrap();
        let id = load(&mut pool, 0);

        assert!(!pool.store_pixel(id, 3, 0));
        assert!(!pool.slot(id).is_dirty());

        assert!(pool.store_pixel(id, 3, 5));
        assert!(pool.slot(id).is_dirty());
        assert_eq!(pool.pixels(id)[3], 5);
        assert_eq!(pool.find_dirty(0), Some(id));
        assert_eq!(pool.dirty_count(), 1);
    }

    #[test]
    fn test_store_bytes_always_dirty() {
        let mut pool = SlotPool::new(1, 16, 1).unwrap();
        let id = load(&mut pool, 0);
        pool.store_bytes(id, 2, &[0, 0x1f], 0x0f);
        assert!(pool.slot(id).is_dirty());
        assert_eq!(&pool.pixels(id)[2..4], &[0, 0x0f]);
    }

    #[test]
    fn test_allocate_respects_budget() {
        let config = DiskVideoConfig {
            block_len: 16,
            max_cache_bytes: 128,
            min_cache_bytes: 32,
            ..Default::default()
        };
        let pool = SlotPool::allocate(&config).unwrap();
        assert_eq!(pool.len(), 8);
        assert_eq!(pool.index().len(), 8);

        let minimal = DiskVideoConfig { minimal_cache: true, ..config };
        assert_eq!(SlotPool::allocate(&minimal).unwrap().len(), 2);
    }

    #[test]
    fn test_release() {
        let mut pool = SlotPool::new(2, 16, 2).unwrap();
        pool.release();
        assert!(pool.is_empty());
    }
}
