//! 缓存槽元数据与状态机
//!
//! 槽的像素数据存放在 [`SlotPool`](super::SlotPool) 的连续内存中，
//! 这里只保存身份、状态和哈希链。

use crate::consts::PLACEHOLDER_BASE;

/// 槽下标，替代指针
pub type SlotId = usize;

/// 槽状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// 未装载（占位或已驱逐）
    Unloaded,
    /// 已装载，与后备存储一致
    Clean,
    /// 已装载，需要写回
    Dirty,
}

/// 触发状态变化的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEvent {
    /// 从后备存储装载或清零
    Load,
    /// 内容被改变
    Modify,
    /// 已写回后备存储
    WriteBack,
    /// 腾出槽位
    Evict,
}

impl SlotState {
    /// 纯状态转移
    ///
    /// 返回 `None` 表示该事件在当前状态下非法：
    /// - 脏槽必须先写回才能驱逐
    /// - 已装载的槽必须先驱逐才能重新装载
    /// - 未装载的槽不能被修改
    pub fn transition(self, event: SlotEvent) -> Option<SlotState> {
        use SlotEvent::*;
        use SlotState::*;

        match (self, event) {
            (Unloaded, Load) => Some(Clean),
            (Unloaded, Evict) => Some(Unloaded),
            (Clean | Dirty, Modify) => Some(Dirty),
            (Clean | Dirty, WriteBack) => Some(Clean),
            (Clean, Evict) => Some(Unloaded),
            (Unloaded, Modify | WriteBack) | (Clean | Dirty, Load) | (Dirty, Evict) => None,
        }
    }

    /// 是否已装载
    pub fn is_resident(self) -> bool {
        self != SlotState::Unloaded
    }
}

/// 缓存槽
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// 块在逻辑图像中的字节偏移（块对齐）
    pub offset: u64,
    /// 当前状态
    pub state: SlotState,
    /// 时钟位：最近被访问过
    pub recently_used: bool,
    /// 同一哈希桶中的下一个槽
    pub hash_link: Option<SlotId>,
}

impl Slot {
    /// 第 `id` 个占位槽，偏移远在合法图像之外
    pub fn placeholder(id: SlotId, block_len: usize) -> Self {
        Self {
            offset: PLACEHOLDER_BASE + (id as u64 + 1) * block_len as u64,
            state: SlotState::Unloaded,
            recently_used: false,
            hash_link: None,
        }
    }

    /// 应用事件
    ///
    /// 非法转移说明调用顺序有误，调试构建下断言失败，发布构建下状态不变。
    pub fn apply(&mut self, event: SlotEvent) {
        match self.state.transition(event) {
            Some(next) => self.state = next,
            None => debug_assert!(
                false,
                "illegal slot transition {:?} on {:?} at {:#x}",
                event,
                self.state,
                self.offset
            ),
        }
    }

    /// 是否需要写回
    pub fn is_dirty(&self) -> bool {
        self.state == SlotState::Dirty
    }

    /// 是否已装载
    pub fn is_resident(&self) -> bool {
        self.state.is_resident()
    }
}
