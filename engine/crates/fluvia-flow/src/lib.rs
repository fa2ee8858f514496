//! Flow 调度核心
//!
//! 在一张声明式的 GPU 操作列表和显式图形 API 之间，跟踪固定资源表
//! 里每个 image/buffer 的状态，自动插入恰好足够的同步 barrier：
//! 每个操作都能以它声明的 layout/access 看到自己的资源，
//! 既不欠同步也不多同步。
//!
//! # 核心概念
//!
//! - [`FlowImageId`] / [`FlowBufferId`]：固定资源表的稳定索引
//! - [`FlowImageState`] / [`FlowBufferState`]：layout + access 的精确状态
//! - [`FlowResourceContext`]：资源句柄与跟踪状态的唯一事实来源
//! - [`FlowSection`]：一个 GPU 操作单元，声明使用 + 发出命令
//! - [`FlowSectionList`]：按顺序录制，做状态 diff 并插 barrier
//! - [`FlowLoop`]：迭代录制循环体，入口状态显式校验
//!
//! # 使用示例
//!
//! ```ignore
//! use fluvia_flow::*;
//!
//! let mut ctx = FlowResourceContext::new(images, buffers);
//! let mut simulation = FlowSectionList::new(vec![
//!     FlowSection::clear_color("clear-densities", DENSITIES, clear_zero),
//!     FlowSection::compute(
//!         "advect",
//!         "advect_velocities",
//!         vec![
//!             FlowShaderBinding::uniform_buffer("params", PARAMS, FlowStageWindow::COMPUTE),
//!             FlowShaderBinding::sampled_image("src", VELOCITIES_1, FlowStageWindow::COMPUTE, sampler),
//!             FlowShaderBinding::storage_image("dst", VELOCITIES_2, FlowStageWindow::COMPUTE,
//!                 FlowImageState::STORAGE_WRITE),
//!         ],
//!         dispatch_size,
//!     ),
//! ]);
//!
//! // 一次性：创建 pipeline/descriptor 对象
//! simulation.complete(&mut factory, &ctx)?;
//!
//! // 每帧：状态 diff + 命令发射
//! cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
//! simulation.record(&mut ctx, &mut cmd)?;
//! cmd.end();
//! ```
//!
//! # 模块结构
//!
//! - `id`：固定表索引
//! - `state`：资源状态、stage 窗口与跟踪状态
//! - `usage`：使用声明
//! - `binding`：shader 绑定（usage + descriptor 信息）
//! - `context`：资源上下文
//! - `section`：section 种类与生命周期
//! - `list`：录制与 barrier 插入
//! - `loops`：出口状态聚合与循环包装
//! - `error`：致命的配置/用法错误

pub mod binding;
pub mod context;
pub mod error;
pub mod id;
pub mod list;
pub mod loops;
pub mod section;
pub mod state;
pub mod usage;

// Re-exports
pub use binding::{FlowBindingKind, FlowShaderBinding};
pub use context::FlowResourceContext;
pub use error::FlowError;
pub use id::{FlowBufferId, FlowImageId};
pub use list::FlowSectionList;
pub use loops::{FlowLoop, FlowStateTable, aggregate_exit_states};
pub use section::{
    FlowAttachment, FlowPushConstant, FlowSection, FlowSectionKind,
};
pub use state::{
    FlowBufferState, FlowImageState, FlowStageWindow, LAYOUT_NOT_YET_USED, TrackedBufferState,
    TrackedImageState,
};
pub use usage::{FlowResourceUsage, FlowUsageKind};
