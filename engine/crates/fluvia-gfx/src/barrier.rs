//! Barrier 描述
//!
//! 纯数据结构，由调度核心填充；交给 command sink 时
//! 通过 `to_vk` 转换为 sync2 的 `vk::*MemoryBarrier2`。

use ash::vk;

/// 图像 barrier 描述
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxImageBarrier {
    pub image: vk::Image,
    pub aspect: vk::ImageAspectFlags,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,
}

impl GfxImageBarrier {
    /// 转换为 sync2 的 barrier 结构体
    ///
    /// queue family 所有权转移不在本层处理，保持 IGNORED；
    /// subresource range 覆盖全部 mip 与 layer。
    pub fn to_vk(&self) -> vk::ImageMemoryBarrier2<'static> {
        vk::ImageMemoryBarrier2 {
            src_stage_mask: self.src_stage,
            src_access_mask: self.src_access,
            dst_stage_mask: self.dst_stage,
            dst_access_mask: self.dst_access,
            old_layout: self.old_layout,
            new_layout: self.new_layout,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            image: self.image,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: self.aspect,
                base_mip_level: 0,
                level_count: vk::REMAINING_MIP_LEVELS,
                base_array_layer: 0,
                layer_count: vk::REMAINING_ARRAY_LAYERS,
            },
            ..Default::default()
        }
    }
}

/// 缓冲区 barrier 描述
///
/// offset/size 默认覆盖整个缓冲区。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxBufferBarrier {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
    pub src_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,
}

impl GfxBufferBarrier {
    /// 转换为 sync2 的 barrier 结构体
    pub fn to_vk(&self) -> vk::BufferMemoryBarrier2<'static> {
        vk::BufferMemoryBarrier2 {
            src_stage_mask: self.src_stage,
            src_access_mask: self.src_access,
            dst_stage_mask: self.dst_stage,
            dst_access_mask: self.dst_access,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            buffer: self.buffer,
            offset: self.offset,
            size: self.size,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_image_barrier_to_vk() {
        let barrier = GfxImageBarrier {
            image: vk::Image::from_raw(7),
            aspect: vk::ImageAspectFlags::COLOR,
            old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            new_layout: vk::ImageLayout::GENERAL,
            src_stage: vk::PipelineStageFlags2::TRANSFER,
            src_access: vk::AccessFlags2::TRANSFER_WRITE,
            dst_stage: vk::PipelineStageFlags2::COMPUTE_SHADER,
            dst_access: vk::AccessFlags2::SHADER_STORAGE_READ,
        };

        let raw = barrier.to_vk();
        assert_eq!(raw.image, vk::Image::from_raw(7));
        assert_eq!(raw.old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(raw.new_layout, vk::ImageLayout::GENERAL);
        assert_eq!(raw.src_stage_mask, vk::PipelineStageFlags2::TRANSFER);
        assert_eq!(raw.dst_access_mask, vk::AccessFlags2::SHADER_STORAGE_READ);
        assert_eq!(raw.subresource_range.level_count, vk::REMAINING_MIP_LEVELS);
        assert_eq!(raw.src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
    }

    #[test]
    fn test_buffer_barrier_to_vk() {
        let barrier = GfxBufferBarrier {
            buffer: vk::Buffer::from_raw(3),
            offset: 0,
            size: vk::WHOLE_SIZE,
            src_stage: vk::PipelineStageFlags2::COMPUTE_SHADER,
            src_access: vk::AccessFlags2::SHADER_STORAGE_WRITE,
            dst_stage: vk::PipelineStageFlags2::VERTEX_SHADER,
            dst_access: vk::AccessFlags2::SHADER_STORAGE_READ,
        };

        let raw = barrier.to_vk();
        assert_eq!(raw.buffer, vk::Buffer::from_raw(3));
        assert_eq!(raw.size, vk::WHOLE_SIZE);
        assert_eq!(raw.src_access_mask, vk::AccessFlags2::SHADER_STORAGE_WRITE);
        assert_eq!(raw.dst_stage_mask, vk::PipelineStageFlags2::VERTEX_SHADER);
    }
}
