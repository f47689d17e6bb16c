//! 状态报告
//!
//! 会话在初始化和每隔若干次像素访问时调用 [`StatusSink`]。报告只供显示，
//! 唯一能影响控制流的是清零阶段的 [`StatusSink::init_progress`]，它可以取消打开。

use core::fmt;

/// 状态消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 正在清零后备存储
    Clearing,
    /// 正在读取某行
    Reading {
        /// 图像行号
        line: u32,
    },
    /// 正在写入某行
    Writing {
        /// 图像行号
        line: u32,
    },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Clearing => f.write_str("clearing the 'screen'"),
            Status::Reading { line } => write!(f, "reading line {:4}", line),
            Status::Writing { line } => write!(f, "writing line {:4}", line),
        }
    }
}

/// 清零阶段的控制指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitControl {
    /// 继续
    Continue,
    /// 取消打开
    Cancel,
}

/// 状态接收者
pub trait StatusSink {
    /// 状态更新
    fn status(&mut self, _status: &Status) {}

    /// 清零进度，每清零一个块调用一次
    ///
    /// 返回 [`InitControl::Cancel`] 时打开失败并返回 `Cancelled`。
    fn init_progress(&mut self, _done: u64, _total: u64) -> InitControl {
        InitControl::Continue
    }
}

/// 忽略所有状态
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatus;

impl StatusSink for NoStatus {}

impl<T: StatusSink + ?Sized> StatusSink for &mut T {
    fn status(&mut self, status: &Status) {
        (**self).status(status)
    }

    fn init_progress(&mut self, done: u64, total: u64) -> InitControl {
        (**self).init_progress(done, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_messages() {
        assert_eq!(Status::Clearing.to_string(), "clearing the 'screen'");
        assert_eq!(Status::Reading { line: 7 }.to_string(), "reading line    7");
        assert_eq!(Status::Writing { line: 1234 }.to_string(), "writing line 1234");
    }

    #[test]
    fn test_no_status_never_cancels() {
        let mut sink = NoStatus;
        sink.status(&Status::Clearing);
        assert_eq!(sink.init_progress(1, 10), InitControl::Continue);
    }
}
