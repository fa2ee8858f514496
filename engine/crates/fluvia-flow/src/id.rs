//! 固定资源表的索引类型
//!
//! 资源表在任何录制开始之前建好，索引在整个会话中稳定；
//! section 只持有索引，句柄与状态都留在 [`crate::context::FlowResourceContext`] 里。

use std::fmt;

/// 图像在固定表中的索引
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowImageId(u32);

impl FlowImageId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for FlowImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Img({})", self.0)
    }
}

/// 缓冲区在固定表中的索引
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowBufferId(u32);

impl FlowBufferId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for FlowBufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buf({})", self.0)
    }
}
