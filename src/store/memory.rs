//! 内存后备存储

use super::BackingStore;
use crate::error::{Error, ErrorKind, Result};
use crate::types::StoreKind;
use alloc::vec::Vec;

/// 内存后备存储
///
/// 一段按需增长、初始为零的字节区域。可设置块数上限来模拟
/// 容量受限的扩展内存。
#[derive(Debug)]
pub struct MemoryStore {
    block_len: usize,
    data: Vec<u8>,
    limit: Option<u64>,
}

impl MemoryStore {
    /// 创建无上限的内存存储
    pub fn new(block_len: usize) -> Self {
        Self { block_len, data: Vec::new(), limit: None }
    }

    /// 创建最多容纳 `max_blocks` 个块的内存存储
    pub fn with_limit(block_len: usize, max_blocks: u64) -> Self {
        Self { block_len, data: Vec::new(), limit: Some(max_blocks) }
    }

    /// 原始字节内容
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn block_range(&self, index: u64) -> Result<core::ops::Range<usize>> {
        if index >= self.capacity() {
            return Err(Error::new(ErrorKind::InvalidInput, "block index beyond store capacity"));
        }
        let start = index as usize * self.block_len;
        Ok(start..start + self.block_len)
    }
}

impl BackingStore for MemoryStore {
    fn block_len(&self) -> usize {
        self.block_len
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn capacity(&self) -> u64 {
        (self.data.len() / self.block_len) as u64
    }

    fn reserve(&mut self, blocks: u64) -> Result<()> {
        if blocks <= self.capacity() {
            return Ok(());
        }
        if self.limit.is_some_and(|limit| blocks > limit) {
            return Err(Error::new(ErrorKind::NoSpace, "memory store limit exceeded"));
        }

        let bytes = usize::try_from(blocks)
            .ok()
            .and_then(|b| b.checked_mul(self.block_len))
            .ok_or(Error::new(ErrorKind::NoSpace, "memory store size overflow"))?;
        self.data
            .try_reserve_exact(bytes - self.data.len())
            .map_err(|e| Error::with_cause(ErrorKind::NoSpace, "insufficient memory for store", e))?;
        self.data.resize(bytes, 0);
        log::debug!("[STORE] memory store reserved {} blocks ({} bytes)", blocks, bytes);
        Ok(())
    }

    fn read_block(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
        let range = self.block_range(index)?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write_block(&mut self, index: u64, buf: &[u8]) -> Result<()> {
        let range = self.block_range(index)?;
        self.data[range].copy_from_slice(buf);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.data = Vec::new();
        Ok(())
    }
}
