//! Section list 与录制
//!
//! 按给定顺序走一遍 section：对每条使用声明做状态 diff，
//! 必要时插入 barrier，更新上下文，然后调用 section 的 execute。
//! 不做任何重排序：section 严格按列表顺序执行，相邻 section
//! 共享资源时由保守的精确相等比较保证 barrier 足够。

use ash::vk;
use fluvia_gfx::barrier::{GfxBufferBarrier, GfxImageBarrier};
use fluvia_gfx::pipeline::GfxPipelineFactory;
use fluvia_gfx::sink::GfxCommandSink;

use crate::context::FlowResourceContext;
use crate::error::FlowError;
use crate::id::{FlowBufferId, FlowImageId};
use crate::loops::FlowStateTable;
use crate::section::FlowSection;
use crate::state::{LAYOUT_NOT_YET_USED, TrackedBufferState, TrackedImageState};
use crate::usage::{FlowResourceUsage, FlowUsageKind};

/// 有序的 section 序列
#[derive(Default)]
pub struct FlowSectionList {
    sections: Vec<FlowSection>,
}

// new & init
impl FlowSectionList {
    pub fn new(sections: Vec<FlowSection>) -> Self {
        Self { sections }
    }

    pub fn push(&mut self, section: FlowSection) {
        self.sections.push(section);
    }
}

// getters
impl FlowSectionList {
    #[inline]
    pub fn sections(&self) -> &[FlowSection] {
        &self.sections
    }

    /// 录制之间更新 push constant 等需要可变访问时使用
    #[inline]
    pub fn section_mut(&mut self, index: usize) -> &mut FlowSection {
        &mut self.sections[index]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// 生命周期
impl FlowSectionList {
    /// complete 列表里的每个 section，每个实例恰好一次
    pub fn complete(
        &mut self,
        factory: &mut dyn GfxPipelineFactory,
        ctx: &FlowResourceContext,
    ) -> Result<(), FlowError> {
        for section in &mut self.sections {
            section.complete(factory, ctx)?;
        }
        Ok(())
    }

    /// 录制一遍列表（迭代序号为 0）
    pub fn record(
        &self,
        ctx: &mut FlowResourceContext,
        sink: &mut dyn GfxCommandSink,
    ) -> Result<(), FlowError> {
        self.record_iteration(ctx, sink, 0)
    }

    /// 录制一遍列表，带调用方提供的迭代序号
    ///
    /// 对每个 section：先把它声明的所有资源转换到位，再 execute。
    /// 迭代序号只透传给 section（push constant），调度器不解释它。
    pub fn record_iteration(
        &self,
        ctx: &mut FlowResourceContext,
        sink: &mut dyn GfxCommandSink,
        iteration: u32,
    ) -> Result<(), FlowError> {
        for section in &self.sections {
            if !section.is_completed() {
                return Err(FlowError::SectionNotCompleted {
                    section: section.name().to_string(),
                });
            }
            transition_usages(section.name(), section.usages(), ctx, sink);
            section.execute(ctx, sink, iteration);
        }
        Ok(())
    }

    /// 把固定表中的所有资源一次性转换到各自的首次使用状态
    ///
    /// 非循环录制的开场（通常录进单独提交一次的 init buffer）：
    /// 之后正式 record 时首次使用就不再产生 barrier。
    /// 表中从未被任何 section 引用的资源是配置错误，立即上报。
    pub fn prologue(
        &self,
        ctx: &mut FlowResourceContext,
        sink: &mut dyn GfxCommandSink,
    ) -> Result<(), FlowError> {
        let first = self.first_uses(ctx.image_count(), ctx.buffer_count());

        for index in 0..ctx.image_count() {
            let id = FlowImageId::new(index as u32);
            let Some(target) = first.images[index] else {
                return Err(FlowError::ImageNeverUsed(id));
            };
            let current = ctx.image_state(id);
            if current.state != target.state {
                emit_image_barrier("prologue", id, current, target, ctx, sink);
            }
            ctx.set_image_state(id, target);
        }

        for index in 0..ctx.buffer_count() {
            let id = FlowBufferId::new(index as u32);
            let Some(target) = first.buffers[index] else {
                return Err(FlowError::BufferNeverUsed(id));
            };
            let current = ctx.buffer_state(id);
            if current.state != target.state {
                emit_buffer_barrier("prologue", id, current, target, ctx, sink);
            }
            ctx.set_buffer_state(id, target);
        }

        Ok(())
    }
}

// 状态聚合
impl FlowSectionList {
    /// 每个资源在列表中第一次被使用时要求的状态（入口 stage）
    ///
    /// # Panics
    /// 使用声明引用了固定表之外的索引时 panic。
    pub fn first_uses(&self, image_count: usize, buffer_count: usize) -> FlowStateTable {
        let mut table = FlowStateTable::empty(image_count, buffer_count);
        for section in &self.sections {
            for usage in section.usages() {
                if let Some((id, tracked)) = usage.entry_image_state() {
                    let slot = &mut table.images[id.index()];
                    if slot.is_none() {
                        *slot = Some(tracked);
                    }
                }
                if let Some((id, tracked)) = usage.entry_buffer_state() {
                    let slot = &mut table.buffers[id.index()];
                    if slot.is_none() {
                        *slot = Some(tracked);
                    }
                }
            }
        }
        table
    }

    /// 每个资源在列表中最后一次使用之后留下的状态（出口 stage）
    ///
    /// # Panics
    /// 使用声明引用了固定表之外的索引时 panic。
    pub fn last_uses(&self, image_count: usize, buffer_count: usize) -> FlowStateTable {
        let mut table = FlowStateTable::empty(image_count, buffer_count);
        for section in &self.sections {
            for usage in section.usages() {
                if let Some((id, tracked)) = usage.exit_image_state() {
                    table.images[id.index()] = Some(tracked);
                }
                if let Some((id, tracked)) = usage.exit_buffer_state() {
                    table.buffers[id.index()] = Some(tracked);
                }
            }
        }
        table
    }

    /// 把 section 顺序与使用声明打进日志（排查用）
    pub fn log_plan(&self) {
        log::info!("flow plan: {} sections", self.sections.len());
        for (index, section) in self.sections.iter().enumerate() {
            log::info!(
                "  [{}] `{}` ({} usages)",
                index,
                section.name(),
                section.usages().len()
            );
            for usage in section.usages() {
                log::info!("      {:?}", usage);
            }
        }
    }
}

/// 把一个 section 声明的所有资源转换到位
///
/// 与当前跟踪状态精确相等（layout + access）时省略 barrier；
/// 不论是否发出 barrier，跟踪状态都更新为声明状态 + 出口 stage。
fn transition_usages(
    section: &str,
    usages: &[FlowResourceUsage],
    ctx: &mut FlowResourceContext,
    sink: &mut dyn GfxCommandSink,
) {
    for usage in usages {
        match usage.kind {
            FlowUsageKind::Image { id, state } => {
                let current = ctx.image_state(id);
                let target = TrackedImageState::new(state, usage.stages.from);
                if current.state != state {
                    emit_image_barrier(section, id, current, target, ctx, sink);
                }
                ctx.set_image_state(id, TrackedImageState::new(state, usage.stages.to));
            }
            FlowUsageKind::Buffer { id, state } => {
                let current = ctx.buffer_state(id);
                let target = TrackedBufferState::new(state, usage.stages.from);
                if current.state != state {
                    emit_buffer_barrier(section, id, current, target, ctx, sink);
                }
                ctx.set_buffer_state(id, TrackedBufferState::new(state, usage.stages.to));
            }
        }
    }
}

fn emit_image_barrier(
    section: &str,
    id: FlowImageId,
    current: TrackedImageState,
    target: TrackedImageState,
    ctx: &FlowResourceContext,
    sink: &mut dyn GfxCommandSink,
) {
    let image = ctx.image(id);
    // 首次接触时哨兵 layout 映射为 UNDEFINED：内容不保留
    let old_layout = if current.state.layout == LAYOUT_NOT_YET_USED {
        vk::ImageLayout::UNDEFINED
    } else {
        current.state.layout
    };
    log::trace!(
        "[{}] image barrier {:?}: {:?} -> {:?}",
        section,
        id,
        old_layout,
        target.state.layout
    );
    sink.image_barrier(&GfxImageBarrier {
        image: image.image,
        aspect: image.aspect,
        old_layout,
        new_layout: target.state.layout,
        src_stage: current.last_stage,
        src_access: current.state.access,
        dst_stage: target.last_stage,
        dst_access: target.state.access,
    });
}

fn emit_buffer_barrier(
    section: &str,
    id: FlowBufferId,
    current: TrackedBufferState,
    target: TrackedBufferState,
    ctx: &FlowResourceContext,
    sink: &mut dyn GfxCommandSink,
) {
    log::trace!(
        "[{}] buffer barrier {:?}: {:?} -> {:?}",
        section,
        id,
        current.state.access,
        target.state.access
    );
    sink.buffer_barrier(&GfxBufferBarrier {
        buffer: ctx.buffer(id),
        offset: 0,
        size: vk::WHOLE_SIZE,
        src_stage: current.last_stage,
        src_access: current.state.access,
        dst_stage: target.last_stage,
        dst_access: target.state.access,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::FlowShaderBinding;
    use crate::state::{FlowBufferState, FlowImageState, FlowStageWindow};
    use ash::vk::Handle;
    use fluvia_gfx::handles::GfxImageRef;
    use fluvia_gfx::pipeline::{
        GfxGraphicsPipelineDesc, GfxPipelineBinding, GfxShaderBinding,
    };
    use fluvia_gfx::sink::GfxCommandLog;

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

    const X: FlowImageId = FlowImageId::new(0);
    const Y: FlowImageId = FlowImageId::new(1);

    /// clear X → compute 读 X 写 Y → compute 采样 X
    fn scenario_list() -> FlowSectionList {
        FlowSectionList::new(vec![
            FlowSection::clear_color("clear-x", X, vk::ClearColorValue { float32: [0.0; 4] }),
            FlowSection::compute(
                "densities",
                "update_densities",
                vec![
                    FlowShaderBinding::storage_image(
                        "src",
                        X,
                        FlowStageWindow::COMPUTE,
                        FlowImageState::STORAGE_READ,
                    ),
                    FlowShaderBinding::storage_image(
                        "dst",
                        Y,
                        FlowStageWindow::COMPUTE,
                        FlowImageState::STORAGE_WRITE,
                    ),
                ],
                glam::UVec3::new(8, 8, 8),
            ),
            FlowSection::compute(
                "shade",
                "shade_volume",
                vec![FlowShaderBinding::sampled_image(
                    "src",
                    X,
                    FlowStageWindow::COMPUTE,
                    vk::Sampler::null(),
                )],
                glam::UVec3::new(8, 8, 8),
            ),
        ])
    }

    /// 把 X 预置为 transfer-dst，模拟上一帧留下的状态
    fn preset_x(ctx: &mut FlowResourceContext) {
        ctx.set_image_state(
            X,
            TrackedImageState::new(
                FlowImageState::TRANSFER_DST,
                vk::PipelineStageFlags2::TRANSFER,
            ),
        );
    }

    #[test]
    fn test_scenario_barrier_counts() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut list = scenario_list();
        let mut ctx = ctx(3, 0);
        preset_x(&mut ctx);
        list.complete(&mut StubFactory, &ctx).unwrap();

        let mut log = GfxCommandLog::new();
        list.record(&mut ctx, &mut log).unwrap();

        // X：transfer-dst → storage-read → sampled，恰好两条
        let x_barriers = log.image_barriers_for(ctx.image(X).image);
        assert_eq!(x_barriers.len(), 2);
        assert_eq!(x_barriers[0].old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(x_barriers[0].new_layout, vk::ImageLayout::GENERAL);
        assert_eq!(x_barriers[0].src_stage, vk::PipelineStageFlags2::TRANSFER);
        assert_eq!(
            x_barriers[0].dst_stage,
            vk::PipelineStageFlags2::COMPUTE_SHADER
        );
        assert_eq!(x_barriers[1].old_layout, vk::ImageLayout::GENERAL);
        assert_eq!(
            x_barriers[1].new_layout,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        );
        assert_eq!(
            x_barriers[1].src_access,
            vk::AccessFlags2::SHADER_STORAGE_READ
        );

        // Y：首次写入一条
        let y_barriers = log.image_barriers_for(ctx.image(Y).image);
        assert_eq!(y_barriers.len(), 1);
        assert_eq!(y_barriers[0].old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(y_barriers[0].new_layout, vk::ImageLayout::GENERAL);

        // 未引用的第三张图：零条
        let unused = ctx.image(FlowImageId::new(2)).image;
        assert!(log.image_barriers_for(unused).is_empty());
    }

    #[test]
    fn test_final_states_match_last_usage() {
        let mut list = scenario_list();
        let mut ctx = ctx(3, 0);
        preset_x(&mut ctx);
        list.complete(&mut StubFactory, &ctx).unwrap();

        let mut log = GfxCommandLog::new();
        list.record(&mut ctx, &mut log).unwrap();

        assert_eq!(
            ctx.image_state(X),
            TrackedImageState::new(
                FlowImageState::SAMPLED,
                vk::PipelineStageFlags2::COMPUTE_SHADER
            )
        );
        assert_eq!(
            ctx.image_state(Y),
            TrackedImageState::new(
                FlowImageState::STORAGE_WRITE,
                vk::PipelineStageFlags2::COMPUTE_SHADER
            )
        );
        // 未引用的图像仍是哨兵状态
        assert_eq!(
            ctx.image_state(FlowImageId::new(2)).state,
            FlowImageState::NOT_YET_USED
        );
    }

    #[test]
    fn test_recording_is_deterministic() {
        let mut list = scenario_list();
        let mut ctx = ctx(3, 0);
        preset_x(&mut ctx);
        list.complete(&mut StubFactory, &ctx).unwrap();

        let mut first = GfxCommandLog::new();
        list.record(&mut ctx, &mut first).unwrap();

        ctx.reset();
        preset_x(&mut ctx);
        let mut second = GfxCommandLog::new();
        list.record(&mut ctx, &mut second).unwrap();

        assert_eq!(first.commands(), second.commands());
    }

    #[test]
    fn test_record_before_complete_fails() {
        let list = scenario_list();
        let mut ctx = ctx(3, 0);
        let mut log = GfxCommandLog::new();

        assert!(matches!(
            list.record(&mut ctx, &mut log),
            Err(FlowError::SectionNotCompleted { .. })
        ));
        // 第一个 section 就被拒绝，没有任何命令发出
        assert!(log.commands().is_empty());
    }

    #[test]
    fn test_prologue_rejects_unused_image() {
        // 表里有 3 张图，列表只用到 X 和 Y
        let mut list = scenario_list();
        let mut ctx = ctx(3, 0);
        list.complete(&mut StubFactory, &ctx).unwrap();

        let mut log = GfxCommandLog::new();
        assert!(matches!(
            list.prologue(&mut ctx, &mut log),
            Err(FlowError::ImageNeverUsed(id)) if id == FlowImageId::new(2)
        ));
    }

    #[test]
    fn test_prologue_then_record_skips_first_use_barriers() {
        let mut list = scenario_list();
        let mut ctx = ctx(2, 0);
        list.complete(&mut StubFactory, &ctx).unwrap();

        let mut init = GfxCommandLog::new();
        list.prologue(&mut ctx, &mut init).unwrap();
        // 两张图都从哨兵转换到首次使用状态
        assert_eq!(init.image_barriers().count(), 2);
        assert_eq!(
            ctx.image_state(X).state,
            FlowImageState::TRANSFER_DST
        );

        let mut log = GfxCommandLog::new();
        list.record(&mut ctx, &mut log).unwrap();
        // clear-x 与 Y 的首次写入都不再需要 barrier，只剩 X 的两次后续转换
        assert_eq!(log.image_barriers().count(), 2);
        assert!(log.image_barriers_for(ctx.image(Y).image).is_empty());
    }

    #[test]
    fn test_buffer_transitions_and_unused_buffer() {
        let params = FlowBufferId::new(0);
        let particles = FlowBufferId::new(1);
        let mut list = FlowSectionList::new(vec![FlowSection::compute(
            "integrate",
            "integrate_particles",
            vec![
                FlowShaderBinding::uniform_buffer("params", params, FlowStageWindow::COMPUTE),
                FlowShaderBinding::storage_buffer(
                    "particles",
                    particles,
                    FlowStageWindow::COMPUTE,
                    FlowBufferState::STORAGE_READ_WRITE,
                ),
            ],
            glam::UVec3::new(64, 1, 1),
        )]);

        let mut ctx = ctx(0, 3);
        list.complete(&mut StubFactory, &ctx).unwrap();

        let mut log = GfxCommandLog::new();
        list.record(&mut ctx, &mut log).unwrap();
        assert_eq!(log.buffer_barriers().count(), 2);
        assert_eq!(
            ctx.buffer_state(particles).state,
            FlowBufferState::STORAGE_READ_WRITE
        );

        // prologue 发现第三个缓冲区从未被引用
        ctx.reset();
        let mut init = GfxCommandLog::new();
        assert!(matches!(
            list.prologue(&mut ctx, &mut init),
            Err(FlowError::BufferNeverUsed(id)) if id == FlowBufferId::new(2)
        ));
    }

    #[test]
    fn test_redundant_usage_emits_no_barrier() {
        // 两个相邻 section 以完全相同的状态使用同一张图
        let mut list = FlowSectionList::new(vec![
            FlowSection::compute(
                "first",
                "pass_one",
                vec![FlowShaderBinding::storage_image(
                    "img",
                    X,
                    FlowStageWindow::COMPUTE,
                    FlowImageState::STORAGE_READ,
                )],
                glam::UVec3::new(1, 1, 1),
            ),
            FlowSection::compute(
                "second",
                "pass_two",
                vec![FlowShaderBinding::storage_image(
                    "img",
                    X,
                    FlowStageWindow::COMPUTE,
                    FlowImageState::STORAGE_READ,
                )],
                glam::UVec3::new(1, 1, 1),
            ),
        ]);

        let mut ctx = ctx(1, 0);
        list.complete(&mut StubFactory, &ctx).unwrap();

        let mut log = GfxCommandLog::new();
        list.record(&mut ctx, &mut log).unwrap();
        // 第一次使用一条（哨兵 → storage-read），第二个 section 状态相等，零条
        assert_eq!(log.image_barriers().count(), 1);
    }
}
