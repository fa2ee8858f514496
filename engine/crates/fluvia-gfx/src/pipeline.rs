//! Pipeline/descriptor 工厂契约
//!
//! 工厂由外部的着色器/descriptor 管理层实现，以 shader 名称 +
//! 解析好的绑定列表为键，产出可绑定的 pipeline 与 descriptor set。
//! 对象创建失败在进程内基本不可恢复，错误原样上抛。

use ash::vk;

/// descriptor 绑定的具体种类（句柄已从资源上下文解析出来）
#[derive(Clone, Copy, Debug)]
pub enum GfxShaderBindingKind {
    StorageImage {
        view: vk::ImageView,
        layout: vk::ImageLayout,
    },
    CombinedImageSampler {
        view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    },
    UniformBuffer {
        buffer: vk::Buffer,
    },
    StorageBuffer {
        buffer: vk::Buffer,
    },
}

/// 交给工厂的单条绑定：shader 里的变量名 + 解析后的资源
#[derive(Clone, Debug)]
pub struct GfxShaderBinding {
    pub name: String,
    pub kind: GfxShaderBindingKind,
}

/// 工厂产出的可绑定组合
///
/// descriptor_set 允许为 null（无绑定的管线，例如纯顶点缓冲绘制）。
#[derive(Clone, Copy, Debug)]
pub struct GfxPipelineBinding {
    pub bind_point: vk::PipelineBindPoint,
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
    pub descriptor_set: vk::DescriptorSet,
    /// push constant 可见的 shader stage，为空表示管线没有 push constant
    pub push_constant_stages: vk::ShaderStageFlags,
}

/// graphics pipeline 的创建参数
///
/// 对调度核心不透明，原样传给工厂。
#[derive(Clone, Debug)]
pub struct GfxGraphicsPipelineDesc {
    pub extent: vk::Extent2D,
    pub topology: vk::PrimitiveTopology,
    pub color_formats: Vec<vk::Format>,
    pub depth_format: Option<vk::Format>,
    pub blend_enable: bool,
    pub depth_test: bool,
}

impl GfxGraphicsPipelineDesc {
    pub fn new(extent: vk::Extent2D) -> Self {
        Self {
            extent,
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            color_formats: Vec::new(),
            depth_format: None,
            blend_enable: false,
            depth_test: false,
        }
    }

    /// builder
    #[inline]
    pub fn with_topology(mut self, topology: vk::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// builder
    #[inline]
    pub fn with_color_formats(mut self, formats: &[vk::Format]) -> Self {
        self.color_formats = formats.to_vec();
        self
    }

    /// builder
    #[inline]
    pub fn with_depth_format(mut self, format: vk::Format) -> Self {
        self.depth_format = Some(format);
        self.depth_test = true;
        self
    }

    /// builder
    #[inline]
    pub fn with_blending(mut self) -> Self {
        self.blend_enable = true;
        self
    }
}

/// pipeline/descriptor 工厂
///
/// 一个 section 完成（complete）时调用；每个 section 实例恰好调用一次。
pub trait GfxPipelineFactory {
    /// 创建 compute pipeline 并分配/写入 descriptor set
    fn create_compute(
        &mut self,
        shader: &str,
        bindings: &[GfxShaderBinding],
    ) -> anyhow::Result<GfxPipelineBinding>;

    /// 创建 graphics pipeline 并分配/写入 descriptor set
    fn create_graphics(
        &mut self,
        shader: &str,
        bindings: &[GfxShaderBinding],
        desc: &GfxGraphicsPipelineDesc,
    ) -> anyhow::Result<GfxPipelineBinding>;
}
