//! 顺序读写暂存层
//!
//! 调用者保证同一游标上的读序列与写序列之间总有一次 [`BlockStream::seek`]。
//! 因此暂存层可以假设同一序列内严格顺序访问，只在跨块或重定位时
//! 装载读缓冲区或提交写缓冲区。调试构建下违反该约定会触发断言。

use super::BackingStore;
use crate::error::Result;
use alloc::vec;
use alloc::vec::Vec;

/// 当前序列方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// 刚重定位，尚未读写
    Idle,
    /// 读序列
    Reading,
    /// 写序列
    Writing,
}

/// 暂存层统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// 重定位次数
    pub seeks: u64,
    /// 从介质读取的块数（不含合并读）
    pub block_reads: u64,
    /// 写入介质的块数
    pub block_writes: u64,
    /// 为部分写入块做的读-改-写次数
    pub merge_reads: u64,
}

/// 后备存储上的字节游标
#[derive(Debug)]
pub struct BlockStream {
    block_len: usize,
    /// 读缓冲区
    read_buf: Vec<u8>,
    /// 写缓冲区
    write_buf: Vec<u8>,
    /// 游标所在块号
    block: u64,
    /// 块内位置
    pos: usize,
    /// 读缓冲区是否装有 `block` 的内容
    loaded: bool,
    /// 写缓冲区中已覆盖的区间 [lo, hi)
    pending: Option<(usize, usize)>,
    mode: StreamMode,
    stats: StreamStats,
}

impl BlockStream {
    /// 创建暂存层
    pub fn new(block_len: usize) -> Self {
        Self {
            block_len,
            read_buf: vec![0u8; block_len],
            write_buf: vec![0u8; block_len],
            block: 0,
            pos: 0,
            loaded: false,
            pending: None,
            mode: StreamMode::Idle,
            stats: StreamStats::default(),
        }
    }

    /// 当前序列方向
    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// 统计信息
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// 游标的字节位置
    pub fn position(&self) -> u64 {
        self.block * self.block_len as u64 + self.pos as u64
    }

    /// 重定位到字节偏移 `offset`
    ///
    /// 先提交未写出的写缓冲区，再使两个缓冲区失效。
    pub fn seek<S: BackingStore>(&mut self, store: &mut S, offset: u64) -> Result<()> {
        self.commit(store)?;
        self.block = offset / self.block_len as u64;
        self.pos = (offset % self.block_len as u64) as usize;
        self.loaded = false;
        self.mode = StreamMode::Idle;
        self.stats.seeks += 1;
        log::trace!("[STREAM] seek to byte {:#x}", offset);
        Ok(())
    }

    /// 从游标处顺序读取 `out.len()` 字节
    pub fn read<S: BackingStore>(&mut self, store: &mut S, out: &mut [u8]) -> Result<()> {
        debug_assert!(
            self.mode != StreamMode::Writing,
            "read follows a write sequence without a seek"
        );
        self.mode = StreamMode::Reading;

        let mut done = 0;
        while done < out.len() {
            if !self.loaded {
                store.read_block(self.block, &mut self.read_buf)?;
                self.loaded = true;
                self.stats.block_reads += 1;
            }
            let n = (self.block_len - self.pos).min(out.len() - done);
            out[done..done + n].copy_from_slice(&self.read_buf[self.pos..self.pos + n]);
            done += n;
            self.pos += n;
            if self.pos == self.block_len {
                self.block += 1;
                self.pos = 0;
                self.loaded = false;
            }
        }
        Ok(())
    }

    /// 从游标处顺序写入 `data`
    ///
    /// 填满的块立即写出；不满的块留在写缓冲区，直到下一次
    /// [`seek`](Self::seek) 或 [`sync`](Self::sync)。
    pub fn write<S: BackingStore>(&mut self, store: &mut S, data: &[u8]) -> Result<()> {
        debug_assert!(
            self.mode != StreamMode::Reading,
            "write follows a read sequence without a seek"
        );
        self.mode = StreamMode::Writing;

        let mut done = 0;
        while done < data.len() {
            let n = (self.block_len - self.pos).min(data.len() - done);
            self.write_buf[self.pos..self.pos + n].copy_from_slice(&data[done..done + n]);
            self.pending = Some(match self.pending {
                Some((lo, hi)) => (lo.min(self.pos), hi.max(self.pos + n)),
                None => (self.pos, self.pos + n),
            });
            done += n;
            self.pos += n;
            if self.pos == self.block_len {
                self.commit(store)?;
                self.block += 1;
                self.pos = 0;
            }
        }
        Ok(())
    }

    /// 提交未写出的写缓冲区，游标位置不变
    pub fn sync<S: BackingStore>(&mut self, store: &mut S) -> Result<()> {
        self.commit(store)?;
        self.mode = StreamMode::Idle;
        Ok(())
    }

    /// 把写缓冲区写回当前块
    ///
    /// 只覆盖了部分块时，先读出介质上的块再合并，避免破坏相邻数据。
    fn commit<S: BackingStore>(&mut self, store: &mut S) -> Result<()> {
        let Some((lo, hi)) = self.pending.take() else {
            return Ok(());
        };

        if lo == 0 && hi == self.block_len {
            store.write_block(self.block, &self.write_buf)?;
        } else {
            store.read_block(self.block, &mut self.read_buf)?;
            self.stats.merge_reads += 1;
            self.read_buf[lo..hi].copy_from_slice(&self.write_buf[lo..hi]);
            store.write_block(self.block, &self.read_buf)?;
        }
        self.loaded = false;
        self.stats.block_writes += 1;
        Ok(())
    }
}
