//! Dynamic rendering 的描述结构

use ash::vk;

/// 单个附件的渲染参数
#[derive(Clone, Copy)]
pub struct GfxAttachmentDesc {
    pub view: vk::ImageView,
    pub layout: vk::ImageLayout,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub clear: vk::ClearValue,
}

impl GfxAttachmentDesc {
    /// 保留原内容的附件
    pub fn load(view: vk::ImageView, layout: vk::ImageLayout) -> Self {
        Self {
            view,
            layout,
            load_op: vk::AttachmentLoadOp::LOAD,
            store_op: vk::AttachmentStoreOp::STORE,
            clear: vk::ClearValue::default(),
        }
    }

    /// 渲染前清空的附件
    pub fn clear(view: vk::ImageView, layout: vk::ImageLayout, clear: vk::ClearValue) -> Self {
        Self {
            view,
            layout,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            clear,
        }
    }

    pub fn to_vk(&self) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo {
            image_view: self.view,
            image_layout: self.layout,
            load_op: self.load_op,
            store_op: self.store_op,
            clear_value: self.clear,
            ..Default::default()
        }
    }
}

/// 一次 `begin_rendering` 的完整描述
#[derive(Clone)]
pub struct GfxRenderingDesc {
    pub extent: vk::Extent2D,
    pub color_attachments: Vec<GfxAttachmentDesc>,
    pub depth_attachment: Option<GfxAttachmentDesc>,
}

impl GfxRenderingDesc {
    pub fn new(extent: vk::Extent2D) -> Self {
        Self {
            extent,
            color_attachments: Vec::new(),
            depth_attachment: None,
        }
    }
}
