//! 资源使用声明
//!
//! section 对每个触碰到的资源声明一条使用：资源索引、
//! 期望状态、stage 窗口。使用列表在 section 构造时固定，
//! recorder 据此做状态 diff 并插入 barrier。

use crate::id::{FlowBufferId, FlowImageId};
use crate::state::{
    FlowBufferState, FlowImageState, FlowStageWindow, TrackedBufferState, TrackedImageState,
};

/// 使用的资源种类与期望状态
#[derive(Clone, Copy, Debug)]
pub enum FlowUsageKind {
    Image {
        id: FlowImageId,
        state: FlowImageState,
    },
    Buffer {
        id: FlowBufferId,
        state: FlowBufferState,
    },
}

/// section 对单个资源的一次使用
#[derive(Clone, Copy, Debug)]
pub struct FlowResourceUsage {
    pub stages: FlowStageWindow,
    pub kind: FlowUsageKind,
}

impl FlowResourceUsage {
    /// 图像使用
    #[inline]
    pub const fn image(id: FlowImageId, stages: FlowStageWindow, state: FlowImageState) -> Self {
        Self {
            stages,
            kind: FlowUsageKind::Image { id, state },
        }
    }

    /// 缓冲区使用
    #[inline]
    pub const fn buffer(id: FlowBufferId, stages: FlowStageWindow, state: FlowBufferState) -> Self {
        Self {
            stages,
            kind: FlowUsageKind::Buffer { id, state },
        }
    }

    /// 使用开始时的跟踪状态（入口 stage），仅图像使用返回 Some
    pub fn entry_image_state(&self) -> Option<(FlowImageId, TrackedImageState)> {
        match self.kind {
            FlowUsageKind::Image { id, state } => {
                Some((id, TrackedImageState::new(state, self.stages.from)))
            }
            FlowUsageKind::Buffer { .. } => None,
        }
    }

    /// 使用结束后的跟踪状态（出口 stage），仅图像使用返回 Some
    pub fn exit_image_state(&self) -> Option<(FlowImageId, TrackedImageState)> {
        match self.kind {
            FlowUsageKind::Image { id, state } => {
                Some((id, TrackedImageState::new(state, self.stages.to)))
            }
            FlowUsageKind::Buffer { .. } => None,
        }
    }

    /// 使用开始时的跟踪状态（入口 stage），仅缓冲区使用返回 Some
    pub fn entry_buffer_state(&self) -> Option<(FlowBufferId, TrackedBufferState)> {
        match self.kind {
            FlowUsageKind::Buffer { id, state } => {
                Some((id, TrackedBufferState::new(state, self.stages.from)))
            }
            FlowUsageKind::Image { .. } => None,
        }
    }

    /// 使用结束后的跟踪状态（出口 stage），仅缓冲区使用返回 Some
    pub fn exit_buffer_state(&self) -> Option<(FlowBufferId, TrackedBufferState)> {
        match self.kind {
            FlowUsageKind::Buffer { id, state } => {
                Some((id, TrackedBufferState::new(state, self.stages.to)))
            }
            FlowUsageKind::Image { .. } => None,
        }
    }
}
