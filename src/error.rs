//! 错误类型定义
//!
//! 提供 Disk-Video 会话各操作的错误类型。

use core::fmt;

/// Disk-Video 操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 后备存储 I/O 错误（对会话是致命的）
    Io,
    /// 无效参数
    InvalidInput,
    /// 后备存储空间不足
    NoSpace,
    /// 缓存池或哈希索引内存不足
    OutOfMemory,
    /// 初始化被用户取消
    Cancelled,
    /// 无效状态（会话已关闭或模式不匹配）
    InvalidState,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// 创建带原因的错误
    ///
    /// 原因只写入日志，不随错误保存
    pub fn with_cause(kind: ErrorKind, message: &'static str, cause: impl fmt::Debug) -> Self {
        log::debug!("[DISKVID] {}: {:?}", message, cause);
        Self { kind, message }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// 是否是用户取消
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::OutOfMemory => {
                Error::with_cause(ErrorKind::NoSpace, "Backing store out of space", err)
            }
            _ => Error::with_cause(ErrorKind::Io, "Backing store I/O error", err),
        }
    }
}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;
