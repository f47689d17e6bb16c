//! 后备存储核心接口

use crate::error::Result;
use crate::types::StoreKind;

/// 后备存储接口
///
/// 把介质抽象为一组定长块。块长度由实现固定，必须与会话配置的
/// `block_len` 一致。
///
/// # 示例
///
/// ```rust,ignore
/// use diskvid_core::{BackingStore, StoreKind, Result};
///
/// struct MyStore {
///     // ...
/// }
///
/// impl BackingStore for MyStore {
///     fn block_len(&self) -> usize {
///         2048
///     }
///
///     fn kind(&self) -> StoreKind {
///         StoreKind::Memory
///     }
///
///     fn capacity(&self) -> u64 {
///         // 已预留的块数
///         0
///     }
///
///     fn reserve(&mut self, blocks: u64) -> Result<()> {
///         // 扩展介质
///         Ok(())
///     }
///
///     fn read_block(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
///         // 读取一个块
///         Ok(())
///     }
///
///     fn write_block(&mut self, index: u64, buf: &[u8]) -> Result<()> {
///         // 写入一个块
///         Ok(())
///     }
/// }
/// ```
pub trait BackingStore {
    /// 块长度（字节）
    fn block_len(&self) -> usize;

    /// 介质类型
    fn kind(&self) -> StoreKind;

    /// 已预留的块数
    fn capacity(&self) -> u64;

    /// 预留至少 `blocks` 个块
    ///
    /// 空间不足时返回 `NoSpace`。新预留的块内容为零。
    fn reserve(&mut self, blocks: u64) -> Result<()>;

    /// 读取一个块
    ///
    /// # 参数
    ///
    /// * `index` - 块号
    /// * `buf` - 目标缓冲区（长度等于 block_len）
    fn read_block(&mut self, index: u64, buf: &mut [u8]) -> Result<()>;

    /// 写入一个块
    ///
    /// # 参数
    ///
    /// * `index` - 块号
    /// * `buf` - 源缓冲区（长度等于 block_len）
    fn write_block(&mut self, index: u64, buf: &[u8]) -> Result<()>;

    /// 把介质自身的缓冲刷到持久层
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// 释放介质资源
    ///
    /// 会话关闭（或打开失败）时调用，之后不再访问该存储。
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: BackingStore + ?Sized> BackingStore for &mut S {
    fn block_len(&self) -> usize {
        (**self).block_len()
    }

    fn kind(&self) -> StoreKind {
        (**self).kind()
    }

    fn capacity(&self) -> u64 {
        (**self).capacity()
    }

    fn reserve(&mut self, blocks: u64) -> Result<()> {
        (**self).reserve(blocks)
    }

    fn read_block(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_block(index, buf)
    }

    fn write_block(&mut self, index: u64, buf: &[u8]) -> Result<()> {
        (**self).write_block(index, buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}
