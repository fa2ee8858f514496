//! Section 定义
//!
//! 一个 section 是 GPU 上的一个操作单元：它声明自己触碰哪些资源、
//! 每个资源要处于什么状态，以及实际发出的命令。
//! 种类是封闭的 sum type，新的操作种类通过扩展枚举加入。
//!
//! 生命周期：`Constructed → Completed → Recorded（可重复）`。
//! complete 每个实例恰好一次，创建 pipeline/descriptor 对象；
//! execute 每次录制调用，只发命令，不再分配任何 GPU 对象。

use ash::vk;
use fluvia_gfx::pipeline::{GfxGraphicsPipelineDesc, GfxPipelineBinding, GfxPipelineFactory};
use fluvia_gfx::rendering::{GfxAttachmentDesc, GfxRenderingDesc};
use fluvia_gfx::sink::GfxCommandSink;
use itertools::Itertools;

use crate::binding::FlowShaderBinding;
use crate::context::FlowResourceContext;
use crate::error::FlowError;
use crate::id::FlowImageId;
use crate::state::{FlowImageState, FlowStageWindow};
use crate::usage::FlowResourceUsage;

/// 颜色附件的 stage 窗口
const COLOR_ATTACHMENT_STAGES: FlowStageWindow =
    FlowStageWindow::single(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT);

/// 深度附件的 stage 窗口（early + late fragment tests）
const DEPTH_ATTACHMENT_STAGES: FlowStageWindow =
    FlowStageWindow::single(vk::PipelineStageFlags2::from_raw(
        vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS.as_raw()
            | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS.as_raw(),
    ));

/// push constant 的来源
#[derive(Clone, Debug)]
pub enum FlowPushConstant {
    None,
    /// 调用方在录制之间写入的字节（MVP 矩阵、相机位置等）
    Bytes(Vec<u8>),
    /// 录制时把迭代序号作为 32 位值推送（ping-pong 的奇偶判别，
    /// 由调用方经 record_iteration 提供，调度器自己不推导）
    IterationIndex,
}

/// compute-dispatch section 的数据
pub struct FlowComputeSection {
    shader: String,
    bindings: Vec<FlowShaderBinding>,
    group_count: glam::UVec3,
    push: FlowPushConstant,
    pipeline: Option<GfxPipelineBinding>,
}

/// graphics-draw section 的数据
pub struct FlowGraphicsSection {
    shader: String,
    bindings: Vec<FlowShaderBinding>,
    vertex_count: u32,
    pipeline_desc: GfxGraphicsPipelineDesc,
    push: FlowPushConstant,
    pipeline: Option<GfxPipelineBinding>,
}

/// 渲染附件：图像索引 + load 行为
#[derive(Clone, Copy)]
pub struct FlowAttachment {
    pub image: FlowImageId,
    pub load_op: vk::AttachmentLoadOp,
    pub clear: vk::ClearValue,
}

impl FlowAttachment {
    /// 渲染前清空
    pub fn cleared(image: FlowImageId, clear: vk::ClearValue) -> Self {
        Self {
            image,
            load_op: vk::AttachmentLoadOp::CLEAR,
            clear,
        }
    }

    /// 保留原内容
    pub fn loaded(image: FlowImageId) -> Self {
        Self {
            image,
            load_op: vk::AttachmentLoadOp::LOAD,
            clear: vk::ClearValue::default(),
        }
    }
}

/// 复合 render pass section 的数据
///
/// 用 dynamic rendering 把若干子 section 包进一个渲染作用域；
/// rendering 作用域内不允许插 barrier，所以整个复合 section 的
/// 使用列表在构造时就聚合了附件使用和全部子 section 的使用，
/// 状态转换统一发生在 begin_rendering 之前。
pub struct FlowRenderPassSection {
    extent: vk::Extent2D,
    color_attachments: Vec<FlowAttachment>,
    depth_attachment: Option<FlowAttachment>,
    sections: Vec<FlowSection>,
}

impl FlowRenderPassSection {
    /// 解析附件句柄，得到 begin_rendering 的描述
    fn rendering_desc(&self, ctx: &FlowResourceContext) -> GfxRenderingDesc {
        let color_attachments = self
            .color_attachments
            .iter()
            .map(|a| GfxAttachmentDesc {
                view: ctx.image(a.image).view,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                load_op: a.load_op,
                store_op: vk::AttachmentStoreOp::STORE,
                clear: a.clear,
            })
            .collect_vec();
        let depth_attachment = self.depth_attachment.as_ref().map(|a| GfxAttachmentDesc {
            view: ctx.image(a.image).view,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            load_op: a.load_op,
            store_op: vk::AttachmentStoreOp::STORE,
            clear: a.clear,
        });
        GfxRenderingDesc {
            extent: self.extent,
            color_attachments,
            depth_attachment,
        }
    }
}

/// section 的封闭种类集合
pub enum FlowSectionKind {
    /// 只做状态转换，不发出任何命令
    Transition,
    /// 用固定值填充整张图像
    ClearColor {
        image: FlowImageId,
        value: vk::ClearColorValue,
    },
    Compute(FlowComputeSection),
    Graphics(FlowGraphicsSection),
    /// 回放预先录好的 secondary command buffer（循环体录一次、放 N 次）
    Replay { commands: vk::CommandBuffer },
    RenderPass(FlowRenderPassSection),
}

/// 单个 GPU 操作单元
pub struct FlowSection {
    name: String,
    usages: Vec<FlowResourceUsage>,
    kind: FlowSectionKind,
    completed: bool,
}

// 构造器
impl FlowSection {
    fn new(name: impl Into<String>, usages: Vec<FlowResourceUsage>, kind: FlowSectionKind) -> Self {
        Self {
            name: name.into(),
            usages,
            kind,
            completed: false,
        }
    }

    /// 纯转换 section：把资源转到声明的状态，execute 为空
    pub fn transition(name: impl Into<String>, usages: Vec<FlowResourceUsage>) -> Self {
        Self::new(name, usages, FlowSectionKind::Transition)
    }

    /// clear section，自带 transfer-dst 使用声明
    pub fn clear_color(
        name: impl Into<String>,
        image: FlowImageId,
        value: vk::ClearColorValue,
    ) -> Self {
        let usages = vec![FlowResourceUsage::image(
            image,
            FlowStageWindow::TRANSFER,
            FlowImageState::TRANSFER_DST,
        )];
        Self::new(name, usages, FlowSectionKind::ClearColor { image, value })
    }

    /// compute section，使用列表取自绑定声明
    pub fn compute(
        name: impl Into<String>,
        shader: impl Into<String>,
        bindings: Vec<FlowShaderBinding>,
        group_count: glam::UVec3,
    ) -> Self {
        let usages = bindings.iter().map(|b| b.usage).collect_vec();
        Self::new(
            name,
            usages,
            FlowSectionKind::Compute(FlowComputeSection {
                shader: shader.into(),
                bindings,
                group_count,
                push: FlowPushConstant::None,
                pipeline: None,
            }),
        )
    }

    /// graphics section，使用列表取自绑定声明
    pub fn graphics(
        name: impl Into<String>,
        shader: impl Into<String>,
        bindings: Vec<FlowShaderBinding>,
        vertex_count: u32,
        pipeline_desc: GfxGraphicsPipelineDesc,
    ) -> Self {
        let usages = bindings.iter().map(|b| b.usage).collect_vec();
        Self::new(
            name,
            usages,
            FlowSectionKind::Graphics(FlowGraphicsSection {
                shader: shader.into(),
                bindings,
                vertex_count,
                pipeline_desc,
                push: FlowPushConstant::None,
                pipeline: None,
            }),
        )
    }

    /// 回放 section：usages 声明 secondary buffer 内部触碰的资源
    pub fn replay(
        name: impl Into<String>,
        usages: Vec<FlowResourceUsage>,
        commands: vk::CommandBuffer,
    ) -> Self {
        Self::new(name, usages, FlowSectionKind::Replay { commands })
    }

    /// 复合 render pass section
    ///
    /// 使用列表 = 附件使用 + 全部子 section 的使用；
    /// 子 section 在渲染作用域内按顺序执行，自己不再做状态转换。
    pub fn render_pass(
        name: impl Into<String>,
        extent: vk::Extent2D,
        color_attachments: Vec<FlowAttachment>,
        depth_attachment: Option<FlowAttachment>,
        sections: Vec<FlowSection>,
    ) -> Self {
        let mut usages = Vec::new();
        for attachment in &color_attachments {
            usages.push(FlowResourceUsage::image(
                attachment.image,
                COLOR_ATTACHMENT_STAGES,
                FlowImageState::COLOR_ATTACHMENT,
            ));
        }
        if let Some(attachment) = &depth_attachment {
            usages.push(FlowResourceUsage::image(
                attachment.image,
                DEPTH_ATTACHMENT_STAGES,
                FlowImageState::DEPTH_ATTACHMENT,
            ));
        }
        for section in &sections {
            usages.extend_from_slice(section.usages());
        }
        Self::new(
            name,
            usages,
            FlowSectionKind::RenderPass(FlowRenderPassSection {
                extent,
                color_attachments,
                depth_attachment,
                sections,
            }),
        )
    }

    /// builder：设置调用方写入的 push constant 字节
    ///
    /// # Panics
    /// 在非 compute/graphics section 上调用时 panic。
    pub fn with_push_bytes(mut self, data: Vec<u8>) -> Self {
        match &mut self.kind {
            FlowSectionKind::Compute(c) => c.push = FlowPushConstant::Bytes(data),
            FlowSectionKind::Graphics(g) => g.push = FlowPushConstant::Bytes(data),
            _ => panic!("section `{}` has no pipeline to push constants to", self.name),
        }
        self
    }

    /// builder：录制时把迭代序号作为 push constant 推送
    ///
    /// # Panics
    /// 在非 compute/graphics section 上调用时 panic。
    pub fn with_iteration_push(mut self) -> Self {
        match &mut self.kind {
            FlowSectionKind::Compute(c) => c.push = FlowPushConstant::IterationIndex,
            FlowSectionKind::Graphics(g) => g.push = FlowPushConstant::IterationIndex,
            _ => panic!("section `{}` has no pipeline to push constants to", self.name),
        }
        self
    }
}

// getters
impl FlowSection {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 使用声明，构造后不再变化
    #[inline]
    pub fn usages(&self) -> &[FlowResourceUsage] {
        &self.usages
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// 调用方写入 push constant 字节的入口（录制之间更新 MVP 等）
    pub fn push_data_mut(&mut self) -> Option<&mut Vec<u8>> {
        let push = match &mut self.kind {
            FlowSectionKind::Compute(c) => &mut c.push,
            FlowSectionKind::Graphics(g) => &mut g.push,
            _ => return None,
        };
        match push {
            FlowPushConstant::Bytes(data) => Some(data),
            _ => None,
        }
    }
}

// 生命周期
impl FlowSection {
    /// `Constructed → Completed`，每个实例恰好一次
    ///
    /// 解析绑定、向工厂索要 pipeline/descriptor 对象；
    /// 工厂失败是致命的，原样上抛。
    pub fn complete(
        &mut self,
        factory: &mut dyn GfxPipelineFactory,
        ctx: &FlowResourceContext,
    ) -> Result<(), FlowError> {
        if self.completed {
            return Err(FlowError::SectionAlreadyCompleted {
                section: self.name.clone(),
            });
        }
        match &mut self.kind {
            FlowSectionKind::Compute(c) => {
                let resolved = c.bindings.iter().map(|b| b.resolve(ctx)).collect_vec();
                let binding = factory.create_compute(&c.shader, &resolved).map_err(|source| {
                    FlowError::PipelineSetup {
                        section: self.name.clone(),
                        source,
                    }
                })?;
                c.pipeline = Some(binding);
            }
            FlowSectionKind::Graphics(g) => {
                let resolved = g.bindings.iter().map(|b| b.resolve(ctx)).collect_vec();
                let binding = factory
                    .create_graphics(&g.shader, &resolved, &g.pipeline_desc)
                    .map_err(|source| FlowError::PipelineSetup {
                        section: self.name.clone(),
                        source,
                    })?;
                g.pipeline = Some(binding);
            }
            FlowSectionKind::RenderPass(rp) => {
                for section in &mut rp.sections {
                    section.complete(factory, ctx)?;
                }
            }
            FlowSectionKind::Transition
            | FlowSectionKind::ClearColor { .. }
            | FlowSectionKind::Replay { .. } => {}
        }
        self.completed = true;
        log::debug!("section `{}` completed", self.name);
        Ok(())
    }

    /// `Completed → Recorded`，可重复调用
    ///
    /// 只发命令；状态转换已由 recorder 在此之前完成。
    pub(crate) fn execute(
        &self,
        ctx: &FlowResourceContext,
        sink: &mut dyn GfxCommandSink,
        iteration: u32,
    ) {
        match &self.kind {
            FlowSectionKind::Transition => {}
            FlowSectionKind::ClearColor { image, value } => {
                sink.clear_color_image(
                    &ctx.image(*image),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    *value,
                );
            }
            FlowSectionKind::Compute(c) => {
                let binding = c.pipeline.as_ref().expect("complete() not called");
                push_constants(sink, binding, &c.push, iteration);
                sink.bind_pipeline(binding);
                sink.dispatch(c.group_count);
            }
            FlowSectionKind::Graphics(g) => {
                let binding = g.pipeline.as_ref().expect("complete() not called");
                push_constants(sink, binding, &g.push, iteration);
                sink.bind_pipeline(binding);
                sink.draw(g.vertex_count, 1);
            }
            FlowSectionKind::Replay { commands } => {
                sink.execute_secondary(*commands);
            }
            FlowSectionKind::RenderPass(rp) => {
                let desc = rp.rendering_desc(ctx);
                sink.begin_rendering(&desc);
                for section in &rp.sections {
                    section.execute(ctx, sink, iteration);
                }
                sink.end_rendering();
            }
        }
    }
}

fn push_constants(
    sink: &mut dyn GfxCommandSink,
    binding: &GfxPipelineBinding,
    push: &FlowPushConstant,
    iteration: u32,
) {
    match push {
        FlowPushConstant::None => {}
        FlowPushConstant::Bytes(data) => sink.push_constants(binding, data),
        FlowPushConstant::IterationIndex => {
            sink.push_constants(binding, bytemuck::bytes_of(&iteration));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FlowBufferState;
    use crate::usage::FlowUsageKind;
    use ash::vk::Handle;
    use fluvia_gfx::handles::GfxImageRef;
    use fluvia_gfx::pipeline::GfxShaderBinding;
    use fluvia_gfx::sink::{GfxCommandLog, GfxRecordedCommand};

    struct StubFactory;

    impl GfxPipelineFactory for StubFactory {
        fn create_compute(
            &mut self,
            _shader: &str,
            _bindings: &[GfxShaderBinding],
        ) -> anyhow::Result<GfxPipelineBinding> {
            Ok(GfxPipelineBinding {
                bind_point: vk::PipelineBindPoint::COMPUTE,
                pipeline: vk::Pipeline::null(),
                layout: vk::PipelineLayout::null(),
                descriptor_set: vk::DescriptorSet::null(),
                push_constant_stages: vk::ShaderStageFlags::COMPUTE,
            })
        }

        fn create_graphics(
            &mut self,
            _shader: &str,
            _bindings: &[GfxShaderBinding],
            _desc: &GfxGraphicsPipelineDesc,
        ) -> anyhow::Result<GfxPipelineBinding> {
            Ok(GfxPipelineBinding {
                bind_point: vk::PipelineBindPoint::GRAPHICS,
                pipeline: vk::Pipeline::null(),
                layout: vk::PipelineLayout::null(),
                descriptor_set: vk::DescriptorSet::null(),
                push_constant_stages: vk::ShaderStageFlags::VERTEX,
            })
        }
    }

    fn ctx(image_count: u64, buffer_count: u64) -> FlowResourceContext {
        let images = (0..image_count)
            .map(|i| {
                GfxImageRef::color(
                    vk::Image::from_raw(i + 1),
                    vk::ImageView::from_raw(i + 101),
                )
            })
            .collect();
        let buffers = (0..buffer_count)
            .map(|i| vk::Buffer::from_raw(i + 201))
            .collect();
        FlowResourceContext::new(images, buffers)
    }

    #[test]
    fn test_clear_section_declares_transfer_dst() {
        let section = FlowSection::clear_color(
            "clear",
            FlowImageId::new(0),
            vk::ClearColorValue { float32: [0.0; 4] },
        );

        assert_eq!(section.usages().len(), 1);
        match section.usages()[0].kind {
            FlowUsageKind::Image { id, state } => {
                assert_eq!(id, FlowImageId::new(0));
                assert_eq!(state, FlowImageState::TRANSFER_DST);
            }
            FlowUsageKind::Buffer { .. } => panic!("expected image usage"),
        }
        assert_eq!(section.usages()[0].stages, FlowStageWindow::TRANSFER);
    }

    #[test]
    fn test_complete_twice_fails() {
        let mut section = FlowSection::compute(
            "advect",
            "advect",
            vec![FlowShaderBinding::storage_image(
                "velocities",
                FlowImageId::new(0),
                FlowStageWindow::COMPUTE,
                FlowImageState::STORAGE_READ,
            )],
            glam::UVec3::new(8, 8, 8),
        );
        let ctx = ctx(1, 0);
        let mut factory = StubFactory;

        section.complete(&mut factory, &ctx).unwrap();
        assert!(section.is_completed());
        assert!(matches!(
            section.complete(&mut factory, &ctx),
            Err(FlowError::SectionAlreadyCompleted { .. })
        ));
    }

    #[test]
    fn test_push_data_mut_only_for_byte_push() {
        let mut section = FlowSection::compute(
            "forces",
            "forces",
            vec![FlowShaderBinding::storage_buffer(
                "particles",
                crate::id::FlowBufferId::new(0),
                FlowStageWindow::COMPUTE,
                FlowBufferState::STORAGE_READ_WRITE,
            )],
            glam::UVec3::new(64, 1, 1),
        )
        .with_push_bytes(vec![0; 16]);

        section.push_data_mut().unwrap().copy_from_slice(&[7; 16]);

        let mut transition = FlowSection::transition("noop", Vec::new());
        assert!(transition.push_data_mut().is_none());
    }

    #[test]
    fn test_render_pass_aggregates_usages() {
        let color = FlowImageId::new(0);
        let sampled = FlowImageId::new(1);
        let inner = FlowSection::graphics(
            "particles",
            "render_particles",
            vec![FlowShaderBinding::sampled_image(
                "densities",
                sampled,
                FlowStageWindow::FRAGMENT,
                vk::Sampler::null(),
            )],
            128,
            GfxGraphicsPipelineDesc::new(vk::Extent2D {
                width: 640,
                height: 480,
            }),
        );

        let section = FlowSection::render_pass(
            "particle-pass",
            vk::Extent2D {
                width: 640,
                height: 480,
            },
            vec![FlowAttachment::cleared(color, vk::ClearValue::default())],
            None,
            vec![inner],
        );

        // 附件使用在前，子 section 的使用跟在后面
        assert_eq!(section.usages().len(), 2);
        match section.usages()[0].kind {
            FlowUsageKind::Image { id, state } => {
                assert_eq!(id, color);
                assert_eq!(state, FlowImageState::COLOR_ATTACHMENT);
            }
            FlowUsageKind::Buffer { .. } => panic!("expected image usage"),
        }
    }

    #[test]
    fn test_render_pass_execute_wraps_sub_sections() {
        let color = FlowImageId::new(0);
        let inner = FlowSection::graphics(
            "surface",
            "render_surface",
            Vec::new(),
            36,
            GfxGraphicsPipelineDesc::new(vk::Extent2D {
                width: 320,
                height: 240,
            }),
        );
        let mut section = FlowSection::render_pass(
            "surface-pass",
            vk::Extent2D {
                width: 320,
                height: 240,
            },
            vec![FlowAttachment::cleared(color, vk::ClearValue::default())],
            None,
            vec![inner],
        );

        let ctx = ctx(1, 0);
        let mut factory = StubFactory;
        section.complete(&mut factory, &ctx).unwrap();

        let mut log = GfxCommandLog::new();
        section.execute(&ctx, &mut log, 0);

        let commands = log.commands();
        assert!(matches!(
            commands.first(),
            Some(GfxRecordedCommand::BeginRendering {
                color_attachments: 1,
                has_depth: false,
            })
        ));
        assert!(matches!(
            commands.last(),
            Some(GfxRecordedCommand::EndRendering)
        ));
        assert!(commands
            .iter()
            .any(|c| matches!(c, GfxRecordedCommand::Draw { vertex_count: 36, .. })));
    }

    #[test]
    fn test_iteration_push_forwards_aux_value() {
        let mut section = FlowSection::compute(
            "solve-pressure",
            "solve_pressure",
            Vec::new(),
            glam::UVec3::new(8, 8, 8),
        )
        .with_iteration_push();

        let ctx = ctx(0, 0);
        let mut factory = StubFactory;
        section.complete(&mut factory, &ctx).unwrap();

        let mut log = GfxCommandLog::new();
        section.execute(&ctx, &mut log, 3);

        assert!(log.commands().iter().any(|c| matches!(
            c,
            GfxRecordedCommand::PushConstants { data, .. } if data == &3u32.to_ne_bytes()
        )));
    }
}
