//! Fluvia 的 GFX 边界层
//!
//! 调度核心（`fluvia-flow`）与显式图形 API 之间的薄层：
//!
//! - [`handles::GfxImageRef`]：资源工厂交付的原生句柄组合
//! - [`barrier::GfxImageBarrier`] / [`barrier::GfxBufferBarrier`]：
//!   纯数据的 barrier 描述，可转换为 sync2 结构体
//! - [`sink::GfxCommandSink`]：命令落点抽象，
//!   实现有 ash 后端的 [`command_buffer::GfxCommandBuffer`]
//!   与纯 CPU 的 [`sink::GfxCommandLog`]
//! - [`pipeline::GfxPipelineFactory`]：pipeline/descriptor 工厂契约，
//!   由外部的着色器管理层实现
//!
//! 设备创建、swapchain、资源分配都不在本层：这里只定义调度核心
//! 发出命令所需要的最小接口。

pub mod barrier;
pub mod command_buffer;
pub mod handles;
pub mod pipeline;
pub mod rendering;
pub mod sink;
