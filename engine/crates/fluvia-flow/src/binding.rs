//! shader 绑定声明
//!
//! pipeline section 的每个 descriptor 用一条绑定描述：
//! shader 里的变量名 + 一条资源使用 + descriptor 种类。
//! 构造时只持有资源索引，complete 阶段再从上下文解析出句柄
//! 交给 pipeline 工厂。

use ash::vk;
use fluvia_gfx::pipeline::{GfxShaderBinding, GfxShaderBindingKind};

use crate::context::FlowResourceContext;
use crate::id::{FlowBufferId, FlowImageId};
use crate::state::{FlowBufferState, FlowImageState, FlowStageWindow};
use crate::usage::{FlowResourceUsage, FlowUsageKind};

/// descriptor 绑定的种类
#[derive(Clone, Copy, Debug)]
pub enum FlowBindingKind {
    StorageImage,
    CombinedImageSampler { sampler: vk::Sampler },
    UniformBuffer,
    StorageBuffer,
}

/// pipeline section 的一条 shader 绑定
#[derive(Clone, Debug)]
pub struct FlowShaderBinding {
    pub name: String,
    pub usage: FlowResourceUsage,
    pub kind: FlowBindingKind,
}

// 构造器
impl FlowShaderBinding {
    /// storage image 绑定，状态由调用方声明（读、写或读写）
    pub fn storage_image(
        name: impl Into<String>,
        id: FlowImageId,
        stages: FlowStageWindow,
        state: FlowImageState,
    ) -> Self {
        Self {
            name: name.into(),
            usage: FlowResourceUsage::image(id, stages, state),
            kind: FlowBindingKind::StorageImage,
        }
    }

    /// combined image sampler 绑定，采样状态隐含
    pub fn sampled_image(
        name: impl Into<String>,
        id: FlowImageId,
        stages: FlowStageWindow,
        sampler: vk::Sampler,
    ) -> Self {
        Self {
            name: name.into(),
            usage: FlowResourceUsage::image(id, stages, FlowImageState::SAMPLED),
            kind: FlowBindingKind::CombinedImageSampler { sampler },
        }
    }

    /// uniform buffer 绑定，只读状态隐含
    pub fn uniform_buffer(
        name: impl Into<String>,
        id: FlowBufferId,
        stages: FlowStageWindow,
    ) -> Self {
        Self {
            name: name.into(),
            usage: FlowResourceUsage::buffer(id, stages, FlowBufferState::UNIFORM_READ),
            kind: FlowBindingKind::UniformBuffer,
        }
    }

    /// storage buffer 绑定，状态由调用方声明
    pub fn storage_buffer(
        name: impl Into<String>,
        id: FlowBufferId,
        stages: FlowStageWindow,
        state: FlowBufferState,
    ) -> Self {
        Self {
            name: name.into(),
            usage: FlowResourceUsage::buffer(id, stages, state),
            kind: FlowBindingKind::StorageBuffer,
        }
    }
}

impl FlowShaderBinding {
    /// 从上下文解析句柄，得到交给工厂的绑定
    ///
    /// # Panics
    /// 绑定种类与使用的资源种类不一致时 panic（只有绕过构造器
    /// 手工拼装字段才可能出现）。
    pub(crate) fn resolve(&self, ctx: &FlowResourceContext) -> GfxShaderBinding {
        let kind = match (&self.kind, &self.usage.kind) {
            (FlowBindingKind::StorageImage, FlowUsageKind::Image { id, state }) => {
                GfxShaderBindingKind::StorageImage {
                    view: ctx.image(*id).view,
                    layout: state.layout,
                }
            }
            (
                FlowBindingKind::CombinedImageSampler { sampler },
                FlowUsageKind::Image { id, state },
            ) => GfxShaderBindingKind::CombinedImageSampler {
                view: ctx.image(*id).view,
                sampler: *sampler,
                layout: state.layout,
            },
            (FlowBindingKind::UniformBuffer, FlowUsageKind::Buffer { id, .. }) => {
                GfxShaderBindingKind::UniformBuffer {
                    buffer: ctx.buffer(*id),
                }
            }
            (FlowBindingKind::StorageBuffer, FlowUsageKind::Buffer { id, .. }) => {
                GfxShaderBindingKind::StorageBuffer {
                    buffer: ctx.buffer(*id),
                }
            }
            (kind, usage) => panic!(
                "binding `{}` pairs {:?} with {:?}",
                self.name, kind, usage
            ),
        };
        GfxShaderBinding {
            name: self.name.clone(),
            kind,
        }
    }
}
