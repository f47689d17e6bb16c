//! Disk-Video 常量定义

//=============================================================================
// 块与缓存
//=============================================================================

/// 默认块长度（字节，必须是 2 的幂）
pub const DEFAULT_BLOCK_LEN: usize = 2048;

/// 缓存池最小预算（字节）
pub const CACHE_MIN_BYTES: usize = 4 * 1024;

/// 缓存池最大预算（字节）
pub const CACHE_MAX_BYTES: usize = 64 * 1024;

/// 写回合并时容忍的最大块间隙
pub const WRITE_GAP: u32 = 4;

/// 占位槽的起始偏移
///
/// 远超任何合法图像尺寸，查找时自然不命中
pub const PLACEHOLDER_BASE: u64 = 1 << 48;

//=============================================================================
// 状态报告
//=============================================================================

/// 每隔多少次像素访问报告一次状态
pub const STATUS_INTERVAL: u32 = 1000;

//=============================================================================
// 像素格式
//=============================================================================

/// pixelshift 的最大值（每字节 8 个 1 位像素）
pub const MAX_PIXEL_SHIFT: u8 = 3;

/// Targa 模式每像素字节数（蓝、绿、红）
pub const TARGA_BYTES_PER_PIXEL: u32 = 3;
