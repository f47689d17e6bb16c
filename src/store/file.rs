//! 磁盘文件后备存储

use super::BackingStore;
use crate::error::{Error, ErrorKind, Result};
use crate::types::StoreKind;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// 磁盘文件后备存储
///
/// 块 `index` 位于文件偏移 `header_len + index * block_len`。
/// 开头的 `header_len` 字节保留给调用者（例如 Targa 文件头），
/// 不参与像素寻址。
#[derive(Debug)]
pub struct FileStore {
    file: File,
    block_len: usize,
    header_len: u64,
    blocks: u64,
    /// 文件当前位置，用于省掉多余的 seek
    pos: Option<u64>,
}

impl FileStore {
    /// 创建（或截断）一个临时磁盘文件
    pub fn create(path: impl AsRef<Path>, block_len: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())
            .map_err(|e| Error::with_cause(ErrorKind::Io, "failed to create disk video file", e))?;
        Ok(Self::with_header(file, block_len, 0))
    }

    /// 包装一个已打开的文件，保留开头的 `header_len` 字节
    ///
    /// 不截断文件，已有内容保持不变。
    pub fn with_header(file: File, block_len: usize, header_len: u64) -> Self {
        Self { file, block_len, header_len, blocks: 0, pos: None }
    }

    /// 头部长度
    pub fn header_len(&self) -> u64 {
        self.header_len
    }

    /// 底层文件
    pub fn file(&self) -> &File {
        &self.file
    }

    fn position(&mut self, index: u64) -> Result<()> {
        if index >= self.blocks {
            return Err(Error::new(ErrorKind::InvalidInput, "block index beyond store capacity"));
        }
        let target = self.header_len + index * self.block_len as u64;
        if self.pos != Some(target) {
            self.pos = None;
            self.file.seek(SeekFrom::Start(target))?;
            self.pos = Some(target);
        }
        Ok(())
    }

    fn advance(&mut self) {
        self.pos = self.pos.map(|p| p + self.block_len as u64);
    }
}

impl BackingStore for FileStore {
    fn block_len(&self) -> usize {
        self.block_len
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Disk
    }

    fn capacity(&self) -> u64 {
        self.blocks
    }

    fn reserve(&mut self, blocks: u64) -> Result<()> {
        let needed = blocks
            .checked_mul(self.block_len as u64)
            .and_then(|b| b.checked_add(self.header_len))
            .ok_or(Error::new(ErrorKind::NoSpace, "disk video file size overflow"))?;
        let current = self
            .file
            .metadata()
            .map_err(|e| Error::with_cause(ErrorKind::Io, "failed to stat disk video file", e))?
            .len();
        if current < needed {
            self.file
                .set_len(needed)
                .map_err(|e| Error::with_cause(ErrorKind::NoSpace, "insufficient disk space", e))?;
        }
        self.blocks = self.blocks.max(blocks);
        log::debug!("[STORE] disk store reserved {} blocks ({} bytes)", blocks, needed);
        Ok(())
    }

    fn read_block(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
        self.position(index)?;
        if let Err(e) = self.file.read_exact(buf) {
            self.pos = None;
            return Err(e.into());
        }
        self.advance();
        Ok(())
    }

    fn write_block(&mut self, index: u64, buf: &[u8]) -> Result<()> {
        self.position(index)?;
        if let Err(e) = self.file.write_all(buf) {
            self.pos = None;
            return Err(e.into());
        }
        self.advance();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file
            .sync_data()
            .map_err(|e| Error::with_cause(ErrorKind::Io, "failed to sync disk video file", e))
    }
}
