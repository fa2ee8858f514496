//! Command sink 抽象
//!
//! 调度核心只通过 [`GfxCommandSink`] 发出命令，不直接触碰图形 API。
//! ash 后端的实现见 [`crate::command_buffer::GfxCommandBuffer`]；
//! [`GfxCommandLog`] 则把命令记录成可比较的轨迹，用于测试与排查。

use ash::vk;

use crate::barrier::{GfxBufferBarrier, GfxImageBarrier};
use crate::handles::GfxImageRef;
use crate::pipeline::GfxPipelineBinding;
use crate::rendering::GfxRenderingDesc;

/// 命令落点
///
/// 录制是严格单线程顺序的，方法按调用顺序生效。
pub trait GfxCommandSink {
    fn image_barrier(&mut self, barrier: &GfxImageBarrier);
    fn buffer_barrier(&mut self, barrier: &GfxBufferBarrier);
    /// 绑定 pipeline，descriptor_set 非 null 时一并绑定
    fn bind_pipeline(&mut self, binding: &GfxPipelineBinding);
    fn push_constants(&mut self, binding: &GfxPipelineBinding, data: &[u8]);
    fn dispatch(&mut self, group_count: glam::UVec3);
    fn draw(&mut self, vertex_count: u32, instance_count: u32);
    fn clear_color_image(
        &mut self,
        image: &GfxImageRef,
        layout: vk::ImageLayout,
        value: vk::ClearColorValue,
    );
    fn begin_rendering(&mut self, desc: &GfxRenderingDesc);
    fn end_rendering(&mut self);
    /// 回放预先录制好的 secondary command buffer
    fn execute_secondary(&mut self, commands: vk::CommandBuffer);
}

/// 记录下来的单条命令
///
/// 只保留可比较的字段（clear 值、附件细节这类联合体内容不参与比较）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GfxRecordedCommand {
    ImageBarrier(GfxImageBarrier),
    BufferBarrier(GfxBufferBarrier),
    BindPipeline {
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    },
    PushConstants {
        stages: vk::ShaderStageFlags,
        data: Vec<u8>,
    },
    Dispatch {
        group_count: [u32; 3],
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    ClearColorImage {
        image: vk::Image,
        layout: vk::ImageLayout,
    },
    BeginRendering {
        color_attachments: usize,
        has_depth: bool,
    },
    EndRendering,
    ExecuteSecondary {
        commands: vk::CommandBuffer,
    },
}

/// 把命令记录成轨迹的 sink
#[derive(Default)]
pub struct GfxCommandLog {
    commands: Vec<GfxRecordedCommand>,
}

// new & init
impl GfxCommandLog {
    pub fn new() -> Self {
        Self::default()
    }
}

// getter & iter
impl GfxCommandLog {
    /// 已记录的命令轨迹
    #[inline]
    pub fn commands(&self) -> &[GfxRecordedCommand] {
        &self.commands
    }

    /// 取走轨迹并清空
    pub fn take(&mut self) -> Vec<GfxRecordedCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// 迭代所有图像 barrier
    pub fn image_barriers(&self) -> impl Iterator<Item = &GfxImageBarrier> {
        self.commands.iter().filter_map(|c| match c {
            GfxRecordedCommand::ImageBarrier(b) => Some(b),
            _ => None,
        })
    }

    /// 迭代所有缓冲区 barrier
    pub fn buffer_barriers(&self) -> impl Iterator<Item = &GfxBufferBarrier> {
        self.commands.iter().filter_map(|c| match c {
            GfxRecordedCommand::BufferBarrier(b) => Some(b),
            _ => None,
        })
    }

    /// 某张图像收到的 barrier（按记录顺序）
    pub fn image_barriers_for(&self, image: vk::Image) -> Vec<&GfxImageBarrier> {
        self.image_barriers().filter(|b| b.image == image).collect()
    }

    /// 某个缓冲区收到的 barrier（按记录顺序）
    pub fn buffer_barriers_for(&self, buffer: vk::Buffer) -> Vec<&GfxBufferBarrier> {
        self.buffer_barriers().filter(|b| b.buffer == buffer).collect()
    }
}

impl GfxCommandSink for GfxCommandLog {
    fn image_barrier(&mut self, barrier: &GfxImageBarrier) {
        self.commands.push(GfxRecordedCommand::ImageBarrier(*barrier));
    }

    fn buffer_barrier(&mut self, barrier: &GfxBufferBarrier) {
        self.commands.push(GfxRecordedCommand::BufferBarrier(*barrier));
    }

    fn bind_pipeline(&mut self, binding: &GfxPipelineBinding) {
        self.commands.push(GfxRecordedCommand::BindPipeline {
            bind_point: binding.bind_point,
            pipeline: binding.pipeline,
        });
    }

    fn push_constants(&mut self, binding: &GfxPipelineBinding, data: &[u8]) {
        self.commands.push(GfxRecordedCommand::PushConstants {
            stages: binding.push_constant_stages,
            data: data.to_vec(),
        });
    }

    fn dispatch(&mut self, group_count: glam::UVec3) {
        self.commands.push(GfxRecordedCommand::Dispatch {
            group_count: group_count.to_array(),
        });
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.commands.push(GfxRecordedCommand::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn clear_color_image(
        &mut self,
        image: &GfxImageRef,
        layout: vk::ImageLayout,
        _value: vk::ClearColorValue,
    ) {
        self.commands.push(GfxRecordedCommand::ClearColorImage {
            image: image.image,
            layout,
        });
    }

    fn begin_rendering(&mut self, desc: &GfxRenderingDesc) {
        self.commands.push(GfxRecordedCommand::BeginRendering {
            color_attachments: desc.color_attachments.len(),
            has_depth: desc.depth_attachment.is_some(),
        });
    }

    fn end_rendering(&mut self) {
        self.commands.push(GfxRecordedCommand::EndRendering);
    }

    fn execute_secondary(&mut self, commands: vk::CommandBuffer) {
        self.commands
            .push(GfxRecordedCommand::ExecuteSecondary { commands });
    }
}
