//! 装载、驱逐与写回
//!
//! 未命中时按时钟策略选出牺牲槽；牺牲槽是脏的就连同附近的脏块一起
//! 写回。高水位以上的块从未写过，直接清零而不读后备存储。

use super::DiskVideo;
use crate::cache::{plan_write_back, SlotEvent, SlotId};
use crate::error::Result;
use crate::status::StatusSink;
use crate::store::BackingStore;
use crate::transcode::{pack, unpack};

impl<S: BackingStore, T: StatusSink> DiskVideo<S, T> {
    /// 确保 `offset`（块对齐）所在的块已装载，返回其槽
    pub(super) fn locate(&mut self, offset: u64) -> Result<SlotId> {
        if let Some((current, id)) = self.current {
            if current == offset {
                return Ok(id);
            }
        }
        self.current = None;

        let id = match self.pool.find(offset) {
            Some(id) => {
                self.pool.touch(id);
                self.stats.hits += 1;
                log::trace!("[CACHE] hit block {:#x} in slot {}", offset, id);
                id
            }
            None => self.load(offset)?,
        };
        self.current = Some((offset, id));
        Ok(id)
    }

    /// 未命中：腾出一个槽并装入 `offset` 处的块
    fn load(&mut self, offset: u64) -> Result<SlotId> {
        self.stats.misses += 1;

        let victim = self.pool.select_victim();
        if self.pool.slot(victim).is_dirty() {
            self.write_back(victim)?;
        }
        let evicting = self.pool.slot(victim).is_resident();

        let fresh = !matches!(self.high_water, Some(mark) if offset <= mark);
        if fresh {
            self.high_water = Some(offset);
            self.pool.rebind(victim, offset);
            self.pool.pixels_mut(victim).fill(0);
            self.stats.zero_loads += 1;
            log::debug!("[CACHE] zero block {:#x} into slot {}", offset, victim);
        } else {
            let at = self.shift.packed_offset(offset);
            if self.seek_offset != Some(at) {
                self.stream.seek(&mut self.store, at)?;
            }
            // 读取失败后游标位置未知
            self.seek_offset = None;
            self.stream.read(&mut self.store, &mut self.packed)?;
            self.seek_offset = Some(at + self.packed.len() as u64);

            // 读成功后才改绑，失败时槽仍保持原来的身份
            self.pool.rebind(victim, offset);
            unpack(self.shift, &self.packed, self.pool.pixels_mut(victim));
            log::debug!("[CACHE] load block {:#x} into slot {}", offset, victim);
        }
        if evicting {
            self.stats.evictions += 1;
        }

        self.pool.slot_mut(victim).apply(SlotEvent::Load);
        self.pool.touch(victim);
        Ok(victim)
    }

    /// 写回 `victim` 及其附近的脏块，返回写出的块数
    fn write_back(&mut self, victim: SlotId) -> Result<usize> {
        let runs = plan_write_back(&self.pool, victim, self.config.write_gap);
        self.seek_offset = None;

        let mut written = 0;
        for run in &runs {
            self.stream.seek(&mut self.store, self.shift.packed_offset(run.start))?;
            for &id in &run.slots {
                pack(self.shift, self.pool.pixels(id), &mut self.packed);
                self.stream.write(&mut self.store, &self.packed)?;
                self.pool.slot_mut(id).apply(SlotEvent::WriteBack);
            }
            log::debug!("[CACHE] wrote run of {} blocks at {:#x}", run.len(), run.start);
            written += run.len();
            self.stats.write_runs += 1;
        }
        self.stats.blocks_written += written as u64;
        Ok(written)
    }

    /// 写回所有脏块并刷新后备存储，返回写出的块数
    pub fn flush(&mut self) -> Result<usize> {
        self.ensure_active()?;

        let mut written = 0;
        loop {
            let next = self.pool.dirty_slots().next();
            let Some(id) = next else {
                break;
            };
            written += self.write_back(id)?;
        }
        self.stream.sync(&mut self.store)?;
        self.seek_offset = None;
        self.store.flush()?;

        if written > 0 {
            log::debug!("[CACHE] flushed {} dirty blocks", written);
        }
        Ok(written)
    }
}
