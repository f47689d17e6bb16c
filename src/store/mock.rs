//! 测试用后备存储：计数每次块读写，可注入故障

use super::{BackingStore, MemoryStore};
use crate::error::{Error, ErrorKind, Result};
use crate::types::StoreKind;

/// 计数存储
#[derive(Debug)]
pub(crate) struct CountingStore {
    inner: MemoryStore,
    pub reads: u64,
    pub writes: u64,
    pub released: bool,
    /// 第 n 次写入（从 1 开始）返回 I/O 错误
    pub fail_write_at: Option<u64>,
    /// 第 n 次读取（从 1 开始）返回 I/O 错误
    pub fail_read_at: Option<u64>,
}

impl CountingStore {
    pub fn new(block_len: usize) -> Self {
        Self {
            inner: MemoryStore::new(block_len),
            reads: 0,
            writes: 0,
            released: false,
            fail_write_at: None,
            fail_read_at: None,
        }
    }

    pub fn with_limit(block_len: usize, max_blocks: u64) -> Self {
        Self { inner: MemoryStore::with_limit(block_len, max_blocks), ..Self::new(block_len) }
    }

    pub fn bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    pub fn reset_counters(&mut self) {
        self.reads = 0;
        self.writes = 0;
    }
}

impl BackingStore for CountingStore {
    fn block_len(&self) -> usize {
        self.inner.block_len()
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn capacity(&self) -> u64 {
        self.inner.capacity()
    }

    fn reserve(&mut self, blocks: u64) -> Result<()> {
        self.inner.reserve(blocks)
    }

    fn read_block(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
        self.reads += 1;
        if self.fail_read_at == Some(self.reads) {
            return Err(Error::new(ErrorKind::Io, "injected read failure"));
        }
        self.inner.read_block(index, buf)
    }

    fn write_block(&mut self, index: u64, buf: &[u8]) -> Result<()> {
        self.writes += 1;
        if self.fail_write_at == Some(self.writes) {
            return Err(Error::new(ErrorKind::Io, "injected write failure"));
        }
        self.inner.write_block(index, buf)
    }

    fn release(&mut self) -> Result<()> {
        self.released = true;
        Ok(())
    }
}
