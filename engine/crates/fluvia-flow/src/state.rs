//! 资源状态定义
//!
//! 封装 layout、access mask 与 stage 窗口，提供本工作负载
//! 常用的预定义状态组合。相等性只看 layout 与 access 的精确相等，
//! 不做子集判断：barrier 省略与循环入口校验都建立在这条规则上。

use ash::vk;

/// 尚未被任何 section 使用过的图像所携带的哨兵 layout
///
/// 取值在真实 layout 枚举之外，任何 section 声明的目标状态都不可能与之相等。
pub const LAYOUT_NOT_YET_USED: vk::ImageLayout = vk::ImageLayout::from_raw(i32::MAX);

/// 图像状态：layout + access
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlowImageState {
    pub layout: vk::ImageLayout,
    pub access: vk::AccessFlags2,
}

// new & 常量定义
impl FlowImageState {
    /// 创建自定义状态
    #[inline]
    pub const fn new(layout: vk::ImageLayout, access: vk::AccessFlags2) -> Self {
        Self { layout, access }
    }

    /// 哨兵状态：进表之后从未被使用
    pub const NOT_YET_USED: Self = Self::new(LAYOUT_NOT_YET_USED, vk::AccessFlags2::NONE);

    /// 未定义状态（不关心现有内容）
    pub const UNDEFINED: Self = Self::new(vk::ImageLayout::UNDEFINED, vk::AccessFlags2::NONE);

    /// 传输目标（clear、copy-to）
    pub const TRANSFER_DST: Self = Self::new(
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        vk::AccessFlags2::TRANSFER_WRITE,
    );

    /// 传输源
    pub const TRANSFER_SRC: Self = Self::new(
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        vk::AccessFlags2::TRANSFER_READ,
    );

    /// 存储图像读取
    pub const STORAGE_READ: Self = Self::new(
        vk::ImageLayout::GENERAL,
        vk::AccessFlags2::SHADER_STORAGE_READ,
    );

    /// 存储图像写入
    pub const STORAGE_WRITE: Self = Self::new(
        vk::ImageLayout::GENERAL,
        vk::AccessFlags2::SHADER_STORAGE_WRITE,
    );

    /// 存储图像读写
    pub const STORAGE_READ_WRITE: Self = Self::new(
        vk::ImageLayout::GENERAL,
        vk::AccessFlags2::from_raw(
            vk::AccessFlags2::SHADER_STORAGE_READ.as_raw()
                | vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw(),
        ),
    );

    /// 着色器采样
    pub const SAMPLED: Self = Self::new(
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        vk::AccessFlags2::SHADER_SAMPLED_READ,
    );

    /// 颜色附件写入
    pub const COLOR_ATTACHMENT: Self = Self::new(
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
    );

    /// 深度附件读写
    pub const DEPTH_ATTACHMENT: Self = Self::new(
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        vk::AccessFlags2::from_raw(
            vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ.as_raw()
                | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw(),
        ),
    );
}

// 辅助方法
impl FlowImageState {
    /// 写操作的 access flags
    const WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
        vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
            | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw()
            | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw()
            | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
            | vk::AccessFlags2::MEMORY_WRITE.as_raw(),
    );

    /// 检查是否为写操作
    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(Self::WRITE_ACCESS)
    }
}

/// 缓冲区状态：只有 access，没有 layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlowBufferState {
    pub access: vk::AccessFlags2,
}

// new & 常量定义
impl FlowBufferState {
    #[inline]
    pub const fn new(access: vk::AccessFlags2) -> Self {
        Self { access }
    }

    /// 未定义状态
    pub const UNDEFINED: Self = Self::new(vk::AccessFlags2::NONE);

    /// uniform 读取
    pub const UNIFORM_READ: Self = Self::new(vk::AccessFlags2::UNIFORM_READ);

    /// 存储缓冲区读取
    pub const STORAGE_READ: Self = Self::new(vk::AccessFlags2::SHADER_STORAGE_READ);

    /// 存储缓冲区写入
    pub const STORAGE_WRITE: Self = Self::new(vk::AccessFlags2::SHADER_STORAGE_WRITE);

    /// 存储缓冲区读写
    pub const STORAGE_READ_WRITE: Self = Self::new(vk::AccessFlags2::from_raw(
        vk::AccessFlags2::SHADER_STORAGE_READ.as_raw()
            | vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw(),
    ));

    /// 顶点属性读取
    pub const VERTEX_READ: Self = Self::new(vk::AccessFlags2::VERTEX_ATTRIBUTE_READ);

    /// 传输目标
    pub const TRANSFER_DST: Self = Self::new(vk::AccessFlags2::TRANSFER_WRITE);

    /// 传输源
    pub const TRANSFER_SRC: Self = Self::new(vk::AccessFlags2::TRANSFER_READ);

    /// 写操作的 access flags
    const WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
        vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
            | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
            | vk::AccessFlags2::MEMORY_WRITE.as_raw(),
    );

    /// 检查是否为写操作
    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(Self::WRITE_ACCESS)
    }
}

/// 一次使用所处的 stage 窗口
///
/// `from` 是本次使用前插入的 barrier 的目标 stage；
/// `to` 在使用之后记录为资源新的生产 stage。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlowStageWindow {
    pub from: vk::PipelineStageFlags2,
    pub to: vk::PipelineStageFlags2,
}

impl FlowStageWindow {
    #[inline]
    pub const fn new(from: vk::PipelineStageFlags2, to: vk::PipelineStageFlags2) -> Self {
        Self { from, to }
    }

    /// 进出同一个 stage 的窗口
    #[inline]
    pub const fn single(stage: vk::PipelineStageFlags2) -> Self {
        Self::new(stage, stage)
    }

    /// compute shader 窗口
    pub const COMPUTE: Self = Self::single(vk::PipelineStageFlags2::COMPUTE_SHADER);

    /// transfer 窗口
    pub const TRANSFER: Self = Self::single(vk::PipelineStageFlags2::TRANSFER);

    /// vertex shader 窗口
    pub const VERTEX: Self = Self::single(vk::PipelineStageFlags2::VERTEX_SHADER);

    /// fragment shader 窗口
    pub const FRAGMENT: Self = Self::single(vk::PipelineStageFlags2::FRAGMENT_SHADER);
}

/// 带生产 stage 的图像跟踪状态
///
/// `last_stage` 是最后一次触碰该图像的操作所声明的出口 stage，
/// 只作为后续 barrier 的 src stage 使用；barrier 省略与循环入口
/// 校验都只比较 `state`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedImageState {
    pub state: FlowImageState,
    pub last_stage: vk::PipelineStageFlags2,
}

impl TrackedImageState {
    #[inline]
    pub const fn new(state: FlowImageState, last_stage: vk::PipelineStageFlags2) -> Self {
        Self { state, last_stage }
    }
}

impl Default for TrackedImageState {
    fn default() -> Self {
        Self::new(
            FlowImageState::NOT_YET_USED,
            vk::PipelineStageFlags2::TOP_OF_PIPE,
        )
    }
}

/// 带生产 stage 的缓冲区跟踪状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedBufferState {
    pub state: FlowBufferState,
    pub last_stage: vk::PipelineStageFlags2,
}

impl TrackedBufferState {
    #[inline]
    pub const fn new(state: FlowBufferState, last_stage: vk::PipelineStageFlags2) -> Self {
        Self { state, last_stage }
    }
}

impl Default for TrackedBufferState {
    fn default() -> Self {
        Self::new(
            FlowBufferState::UNDEFINED,
            vk::PipelineStageFlags2::TOP_OF_PIPE,
        )
    }
}
