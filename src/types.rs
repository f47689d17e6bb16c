//! 会话配置与几何描述

use crate::consts::{
    CACHE_MAX_BYTES, CACHE_MIN_BYTES, DEFAULT_BLOCK_LEN, STATUS_INTERVAL, TARGA_BYTES_PER_PIXEL,
    WRITE_GAP,
};
use crate::error::{Error, ErrorKind, Result};
use crate::transcode::PixelShift;
use bitflags::bitflags;

bitflags! {
    /// 会话模式标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SessionFlags: u8 {
        /// 24 位 Targa 文件模式：不清零、关闭时写回
        const TARGA     = 0x01;
        /// 16 位连续势能模式：行数翻倍存放低字节平面
        const POTENTIAL = 0x02;
    }
}

/// 后备存储介质类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// 内存区域
    Memory,
    /// 磁盘文件
    Disk,
}

/// 逻辑图像几何
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    /// 每行字节数
    pub row_size: u32,
    /// 行数
    pub row_count: u32,
}

impl Geometry {
    /// 逻辑图像总字节数
    pub fn image_len(&self) -> u64 {
        self.row_size as u64 * self.row_count as u64
    }
}

/// 会话模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// 调色板索引像素
    Indexed {
        /// 颜色数，决定 pixelshift
        colors: u32,
    },
    /// 16 位连续势能值
    Potential,
    /// 24 位 RGB
    Targa,
}

/// 打开会话的请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRequest {
    /// 图像宽度（像素）
    pub width: u32,
    /// 图像高度（像素）
    pub height: u32,
    /// 会话模式
    pub mode: SessionMode,
}

impl OpenRequest {
    /// 调色板索引图像
    pub fn indexed(width: u32, height: u32, colors: u32) -> Self {
        Self { width, height, mode: SessionMode::Indexed { colors } }
    }

    /// 16 位势能图像
    pub fn potential(width: u32, height: u32) -> Self {
        Self { width, height, mode: SessionMode::Potential }
    }

    /// 24 位 Targa 图像
    pub fn targa(width: u32, height: u32) -> Self {
        Self { width, height, mode: SessionMode::Targa }
    }

    /// 逻辑几何；溢出时返回错误
    pub fn geometry(&self) -> Result<Geometry> {
        let overflow = || Error::new(ErrorKind::InvalidInput, "image dimensions overflow");
        let (row_size, row_count) = match self.mode {
            SessionMode::Indexed { .. } => (self.width, self.height),
            SessionMode::Potential => (self.width, self.height.checked_mul(2).ok_or_else(overflow)?),
            SessionMode::Targa => (
                self.width.checked_mul(TARGA_BYTES_PER_PIXEL).ok_or_else(overflow)?,
                self.height,
            ),
        };
        if row_size == 0 || row_count == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "image must not be empty"));
        }
        Ok(Geometry { row_size, row_count })
    }

    /// 后备存储的打包宽度
    pub fn pixel_shift(&self) -> PixelShift {
        match self.mode {
            SessionMode::Indexed { colors } => PixelShift::for_colors(colors),
            SessionMode::Potential | SessionMode::Targa => PixelShift::BYTE,
        }
    }

    /// 模式标志
    pub fn flags(&self) -> SessionFlags {
        match self.mode {
            SessionMode::Indexed { .. } => SessionFlags::empty(),
            SessionMode::Potential => SessionFlags::POTENTIAL,
            SessionMode::Targa => SessionFlags::TARGA,
        }
    }
}

/// Disk-Video 配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskVideoConfig {
    /// 块长度（字节，2 的幂）
    pub block_len: usize,
    /// 缓存池最大预算（字节）
    pub max_cache_bytes: usize,
    /// 缓存池最小预算（字节），低于此值打开失败
    pub min_cache_bytes: usize,
    /// 哈希表桶数（2 的幂）；`None` 时按最大槽数取整
    pub hash_size: Option<usize>,
    /// 写回合并的块间隙容忍度
    pub write_gap: u32,
    /// 状态报告间隔（像素访问次数）
    pub status_interval: u32,
    /// 打开时是否清零后备存储
    ///
    /// 磁盘文件也会清零：高水位只覆盖本次会话从未引用过的块，
    /// 低于高水位但未写过的块仍要从介质读出，复用的旧文件里可能残留
    /// 上一次的内容。确知介质为零时可以关闭。
    pub zero_fill: bool,
    /// 强制使用最小缓存
    pub minimal_cache: bool,
}

impl Default for DiskVideoConfig {
    fn default() -> Self {
        Self {
            block_len: DEFAULT_BLOCK_LEN,
            max_cache_bytes: CACHE_MAX_BYTES,
            min_cache_bytes: CACHE_MIN_BYTES,
            hash_size: None,
            write_gap: WRITE_GAP,
            status_interval: STATUS_INTERVAL,
            zero_fill: true,
            minimal_cache: false,
        }
    }
}

impl DiskVideoConfig {
    /// 检查配置一致性
    pub fn validate(&self) -> Result<()> {
        if !self.block_len.is_power_of_two() {
            return Err(Error::new(ErrorKind::InvalidInput, "block length must be a power of two"));
        }
        if self.min_cache_bytes < self.block_len {
            return Err(Error::new(ErrorKind::InvalidInput, "cache must hold at least one block"));
        }
        if self.min_cache_bytes > self.max_cache_bytes {
            return Err(Error::new(ErrorKind::InvalidInput, "minimum cache exceeds maximum cache"));
        }
        if let Some(size) = self.hash_size {
            if !size.is_power_of_two() {
                return Err(Error::new(ErrorKind::InvalidInput, "hash size must be a power of two"));
            }
        }
        if self.write_gap == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "write gap must be at least 1"));
        }
        if self.status_interval == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "status interval must be at least 1"));
        }
        Ok(())
    }

    /// log2(block_len)
    pub fn block_shift(&self) -> u32 {
        self.block_len.trailing_zeros()
    }

    /// 最大槽数
    pub fn max_slots(&self) -> usize {
        self.max_cache_bytes / self.block_len
    }

    /// 最小槽数
    pub fn min_slots(&self) -> usize {
        self.min_cache_bytes / self.block_len
    }

    /// 实际使用的哈希表桶数
    pub fn effective_hash_size(&self) -> usize {
        self.hash_size
            .unwrap_or_else(|| self.max_slots().max(1).next_power_of_two())
    }
}
