//! 录制会话的资源上下文
//!
//! 持有固定的 image/buffer 表以及与之平行的跟踪状态数组，
//! 是"资源 R 当前处于什么状态"的唯一事实来源。
//! 录制过程中，这里存的状态始终等于已发出的 GPU 命令执行完之后
//! 资源将处于的状态：上下文是对异步 GPU 进度的同步 CPU 模拟。
//!
//! 纯 CPU 侧的簿记结构，不做任何加锁，只支持单线程顺序使用；
//! 每个录制会话显式持有并传递一个实例，没有全局状态。

use ash::vk;
use fluvia_gfx::handles::GfxImageRef;

use crate::id::{FlowBufferId, FlowImageId};
use crate::state::{TrackedBufferState, TrackedImageState};

pub struct FlowResourceContext {
    images: Vec<GfxImageRef>,
    image_states: Vec<TrackedImageState>,
    buffers: Vec<vk::Buffer>,
    buffer_states: Vec<TrackedBufferState>,
}

// new & init
impl FlowResourceContext {
    /// 用资源工厂建好的固定表创建上下文
    ///
    /// 所有图像初始为哨兵状态 [`crate::state::FlowImageState::NOT_YET_USED`]，
    /// 缓冲区初始为 UNDEFINED；资源在会话中不增不减。
    pub fn new(images: Vec<GfxImageRef>, buffers: Vec<vk::Buffer>) -> Self {
        let image_states = vec![TrackedImageState::default(); images.len()];
        let buffer_states = vec![TrackedBufferState::default(); buffers.len()];
        Self {
            images,
            image_states,
            buffers,
            buffer_states,
        }
    }

    /// 把所有跟踪状态放回初始值（哨兵/UNDEFINED）
    ///
    /// 只重置簿记，不发出任何 GPU 命令；调用方要保证 GPU 侧
    /// 的实际状态与之对应（例如资源刚重建）。
    pub fn reset(&mut self) {
        self.image_states.fill(TrackedImageState::default());
        self.buffer_states.fill(TrackedBufferState::default());
    }
}

// getters
impl FlowResourceContext {
    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// 图像句柄
    ///
    /// # Panics
    /// 索引超出固定表时 panic。
    #[inline]
    pub fn image(&self, id: FlowImageId) -> GfxImageRef {
        self.images[id.index()]
    }

    /// 缓冲区句柄
    ///
    /// # Panics
    /// 索引超出固定表时 panic。
    #[inline]
    pub fn buffer(&self, id: FlowBufferId) -> vk::Buffer {
        self.buffers[id.index()]
    }

    /// 图像当前的跟踪状态
    #[inline]
    pub fn image_state(&self, id: FlowImageId) -> TrackedImageState {
        self.image_states[id.index()]
    }

    /// 缓冲区当前的跟踪状态
    #[inline]
    pub fn buffer_state(&self, id: FlowBufferId) -> TrackedBufferState {
        self.buffer_states[id.index()]
    }
}

// setters
impl FlowResourceContext {
    #[inline]
    pub fn set_image_state(&mut self, id: FlowImageId, state: TrackedImageState) {
        self.image_states[id.index()] = state;
    }

    #[inline]
    pub fn set_buffer_state(&mut self, id: FlowBufferId, state: TrackedBufferState) {
        self.buffer_states[id.index()] = state;
    }
}
