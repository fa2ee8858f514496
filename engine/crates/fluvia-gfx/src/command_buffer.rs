//! 命令缓冲封装
//!
//! [`GfxCommandSink`] 的 ash 后端：把每条命令直接录进 `vk::CommandBuffer`。
//! 命令缓冲的分配与回收由外部的 command pool 管理，这里只持有句柄。

use ash::vk;
use itertools::Itertools;

use crate::barrier::{GfxBufferBarrier, GfxImageBarrier};
use crate::handles::GfxImageRef;
use crate::pipeline::GfxPipelineBinding;
use crate::rendering::GfxRenderingDesc;
use crate::sink::GfxCommandSink;

/// ash 后端的命令落点
pub struct GfxCommandBuffer {
    device: ash::Device,
    vk_handle: vk::CommandBuffer,
}

// new & init
impl GfxCommandBuffer {
    pub fn new(device: &ash::Device, vk_handle: vk::CommandBuffer) -> Self {
        Self {
            device: device.clone(),
            vk_handle,
        }
    }
}

// getters
impl GfxCommandBuffer {
    /// getter
    #[inline]
    pub fn vk_handle(&self) -> vk::CommandBuffer {
        self.vk_handle
    }
}

// 录制控制
impl GfxCommandBuffer {
    /// 开始录制
    #[inline]
    pub fn begin(&self, usage_flag: vk::CommandBufferUsageFlags) {
        log::trace!("begin command buffer {:?}", self.vk_handle);
        let info = vk::CommandBufferBeginInfo::default().flags(usage_flag);
        unsafe {
            self.device
                .begin_command_buffer(self.vk_handle, &info)
                .unwrap();
        }
    }

    /// 结束录制
    #[inline]
    pub fn end(&self) {
        unsafe { self.device.end_command_buffer(self.vk_handle).unwrap() }
    }
}

impl GfxCommandSink for GfxCommandBuffer {
    fn image_barrier(&mut self, barrier: &GfxImageBarrier) {
        let barriers = [barrier.to_vk()];
        let dependency_info = vk::DependencyInfo::default().image_memory_barriers(&barriers);
        unsafe {
            self.device
                .cmd_pipeline_barrier2(self.vk_handle, &dependency_info);
        }
    }

    fn buffer_barrier(&mut self, barrier: &GfxBufferBarrier) {
        let barriers = [barrier.to_vk()];
        let dependency_info = vk::DependencyInfo::default().buffer_memory_barriers(&barriers);
        unsafe {
            self.device
                .cmd_pipeline_barrier2(self.vk_handle, &dependency_info);
        }
    }

    fn bind_pipeline(&mut self, binding: &GfxPipelineBinding) {
        unsafe {
            self.device
                .cmd_bind_pipeline(self.vk_handle, binding.bind_point, binding.pipeline);
            if binding.descriptor_set != vk::DescriptorSet::null() {
                self.device.cmd_bind_descriptor_sets(
                    self.vk_handle,
                    binding.bind_point,
                    binding.layout,
                    0,
                    &[binding.descriptor_set],
                    &[],
                );
            }
        }
    }

    fn push_constants(&mut self, binding: &GfxPipelineBinding, data: &[u8]) {
        unsafe {
            self.device.cmd_push_constants(
                self.vk_handle,
                binding.layout,
                binding.push_constant_stages,
                0,
                data,
            );
        }
    }

    fn dispatch(&mut self, group_count: glam::UVec3) {
        unsafe {
            self.device
                .cmd_dispatch(self.vk_handle, group_count.x, group_count.y, group_count.z);
        }
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        unsafe {
            self.device
                .cmd_draw(self.vk_handle, vertex_count, instance_count, 0, 0);
        }
    }

    fn clear_color_image(
        &mut self,
        image: &GfxImageRef,
        layout: vk::ImageLayout,
        value: vk::ClearColorValue,
    ) {
        let range = vk::ImageSubresourceRange {
            aspect_mask: image.aspect,
            base_mip_level: 0,
            level_count: vk::REMAINING_MIP_LEVELS,
            base_array_layer: 0,
            layer_count: vk::REMAINING_ARRAY_LAYERS,
        };
        unsafe {
            self.device
                .cmd_clear_color_image(self.vk_handle, image.image, layout, &value, &[range]);
        }
    }

    fn begin_rendering(&mut self, desc: &GfxRenderingDesc) {
        let color_infos = desc.color_attachments.iter().map(|a| a.to_vk()).collect_vec();
        let depth_info = desc.depth_attachment.as_ref().map(|a| a.to_vk());

        let mut info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: desc.extent,
            })
            .layer_count(1)
            .color_attachments(&color_infos);
        if let Some(depth) = &depth_info {
            info = info.depth_attachment(depth);
        }

        unsafe { self.device.cmd_begin_rendering(self.vk_handle, &info) }
    }

    fn end_rendering(&mut self) {
        unsafe { self.device.cmd_end_rendering(self.vk_handle) }
    }

    fn execute_secondary(&mut self, commands: vk::CommandBuffer) {
        unsafe {
            self.device
                .cmd_execute_commands(self.vk_handle, &[commands]);
        }
    }
}
