//! 脏块写回合并
//!
//! 驱逐脏槽时，把它附近的脏块一起写回，并尽量合并成少数几段
//! 连续写序列：每开始一段新序列就要重定位一次后备存储。
//!
//! 1. 从牺牲块向前（偏移递减）探测，允许最多 `gap` 个块的间隙；
//!    每找到一个脏块就把起点移到那里并重新计数。
//! 2. 从起点向后写：下一个块仍是脏块则留在同一序列；否则在接下来
//!    `gap` 个块内寻找脏块，找到就开启一段新序列，找不到就结束。

use super::pool::SlotPool;
use super::slot::SlotId;
use alloc::vec;
use alloc::vec::Vec;

/// 一段连续写序列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRun {
    /// 第一个块的逻辑偏移
    pub start: u64,
    /// 依次写出的槽，偏移连续递增
    pub slots: Vec<SlotId>,
}

impl WriteRun {
    /// 序列包含的块数
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// 规划写回 `victim`（必须是脏槽）时的写序列
pub fn plan_write_back(pool: &SlotPool, victim: SlotId, gap: u32) -> Vec<WriteRun> {
    debug_assert!(pool.slot(victim).is_dirty(), "write-back planned for a clean slot");

    let block_len = pool.block_len() as u64;
    let mut start = pool.slot(victim).offset;

    // 向前找起点
    let mut probe = start;
    let mut misses = 0;
    while misses < gap && probe >= block_len {
        probe -= block_len;
        if pool.find_dirty(probe).is_some() {
            start = probe;
            misses = 0;
        } else {
            misses += 1;
        }
    }

    // 向后收集
    let mut runs = Vec::new();
    let mut next = Some(start);
    while let Some(run_start) = next.take() {
        let mut run = WriteRun { start: run_start, slots: vec![] };
        let mut offset = run_start;
        while let Some(id) = pool.find_dirty(offset) {
            run.slots.push(id);
            match offset.checked_add(block_len) {
                Some(o) => offset = o,
                None => break,
            }
        }
        runs.push(run);

        // `offset` 是第一个非脏块，它之后 gap-1 个块之内寻找下一段
        for step in 1..gap as u64 {
            let Some(candidate) = step
                .checked_mul(block_len)
                .and_then(|d| offset.checked_add(d))
            else {
                break;
            };
            if pool.find_dirty(candidate).is_some() {
                next = Some(candidate);
                break;
            }
        }
    }

    debug_assert!(
        runs.iter().any(|run| run.slots.contains(&victim)),
        "write-back plan skipped its victim"
    );
    runs
}
