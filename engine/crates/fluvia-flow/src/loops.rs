//! 循环与迭代支持
//!
//! 迭代算法（定点线性求解这类）把一小段 section list 重复录制很多次，
//! 两个资源 ping-pong 交换角色而使用声明不变。循环体的命令缓冲
//! 往往只录一次、之后反复提交，这要求进入循环时资源恰好处于
//! 录制时假设的状态——这里把"假设"显式化：
//! [`aggregate_exit_states`] 在组合期把若干下游 list 的出口状态
//! 折叠成一张表，回放前与上下文比对，不一致立即报错，绝不悄悄纠正。

use fluvia_gfx::pipeline::GfxPipelineFactory;
use fluvia_gfx::sink::GfxCommandSink;

use crate::context::FlowResourceContext;
use crate::error::FlowError;
use crate::id::{FlowBufferId, FlowImageId};
use crate::list::FlowSectionList;
use crate::section::FlowSection;
use crate::state::{FlowStageWindow, TrackedBufferState, TrackedImageState};
use crate::usage::FlowResourceUsage;

/// 按资源索引展开的一组期望状态
///
/// `None` 表示该资源未被涉及。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowStateTable {
    pub images: Vec<Option<TrackedImageState>>,
    pub buffers: Vec<Option<TrackedBufferState>>,
}

impl FlowStateTable {
    /// 全空表
    pub fn empty(image_count: usize, buffer_count: usize) -> Self {
        Self {
            images: vec![None; image_count],
            buffers: vec![None; buffer_count],
        }
    }

    /// 构造"进入循环"的转换 section
    ///
    /// 把表中记录的每个资源重新声明一遍：状态照抄，stage 窗口取
    /// 记录下的生产 stage。录制它就把上下文推进到循环期望的入口状态。
    pub fn entry_section(&self, name: impl Into<String>) -> FlowSection {
        let mut usages = Vec::new();
        for (index, tracked) in self.images.iter().enumerate() {
            if let Some(tracked) = tracked {
                usages.push(FlowResourceUsage::image(
                    FlowImageId::new(index as u32),
                    FlowStageWindow::single(tracked.last_stage),
                    tracked.state,
                ));
            }
        }
        for (index, tracked) in self.buffers.iter().enumerate() {
            if let Some(tracked) = tracked {
                usages.push(FlowResourceUsage::buffer(
                    FlowBufferId::new(index as u32),
                    FlowStageWindow::single(tracked.last_stage),
                    tracked.state,
                ));
            }
        }
        FlowSection::transition(name, usages)
    }
}

/// 把若干下游 section list 的出口状态折叠成一张表
///
/// 列表按给出的顺序生效：后面的 list 覆盖前面留下的条目，
/// 与这些 list 实际被录制的顺序一致。
pub fn aggregate_exit_states(
    lists: &[&FlowSectionList],
    image_count: usize,
    buffer_count: usize,
) -> FlowStateTable {
    let mut table = FlowStateTable::empty(image_count, buffer_count);
    for list in lists {
        let last = list.last_uses(image_count, buffer_count);
        for (slot, value) in table.images.iter_mut().zip(&last.images) {
            if value.is_some() {
                *slot = *value;
            }
        }
        for (slot, value) in table.buffers.iter_mut().zip(&last.buffers) {
            if value.is_some() {
                *slot = *value;
            }
        }
    }
    table
}

/// 循环包装
///
/// 每次 `record` 调用把循环体重新录制 `iterations` 遍；
/// 第二遍起的 barrier 自然按上一遍留下的状态计算。
/// 迭代序号透传给循环体（push constant），奇偶判别由调用方决定。
pub struct FlowLoop {
    name: String,
    body: FlowSectionList,
    entry_states: FlowStateTable,
}

// new & init
impl FlowLoop {
    /// `entry_states` 通常来自 [`aggregate_exit_states`]：
    /// 循环录制时假设资源处于这些状态
    pub fn new(
        name: impl Into<String>,
        body: FlowSectionList,
        entry_states: FlowStateTable,
    ) -> Self {
        Self {
            name: name.into(),
            body,
            entry_states,
        }
    }
}

// getters
impl FlowLoop {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn body(&self) -> &FlowSectionList {
        &self.body
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut FlowSectionList {
        &mut self.body
    }
}

// 生命周期
impl FlowLoop {
    /// complete 循环体，每个 section 恰好一次
    pub fn complete(
        &mut self,
        factory: &mut dyn GfxPipelineFactory,
        ctx: &FlowResourceContext,
    ) -> Result<(), FlowError> {
        self.body.complete(factory, ctx)
    }

    /// 校验上下文满足循环的入口假设
    ///
    /// 只比较 layout + access；生产 stage 不参与比较。
    /// 不一致是致命的用法错误，立即上报，不做任何纠正。
    pub fn validate_entry(&self, ctx: &FlowResourceContext) -> Result<(), FlowError> {
        for (index, expected) in self.entry_states.images.iter().enumerate() {
            let Some(expected) = expected else { continue };
            let id = FlowImageId::new(index as u32);
            let found = ctx.image_state(id);
            if found.state != expected.state {
                return Err(FlowError::LoopEntryImageMismatch {
                    name: self.name.clone(),
                    image: id,
                    expected: expected.state,
                    found: found.state,
                });
            }
        }
        for (index, expected) in self.entry_states.buffers.iter().enumerate() {
            let Some(expected) = expected else { continue };
            let id = FlowBufferId::new(index as u32);
            let found = ctx.buffer_state(id);
            if found.state != expected.state {
                return Err(FlowError::LoopEntryBufferMismatch {
                    name: self.name.clone(),
                    buffer: id,
                    expected: expected.state,
                    found: found.state,
                });
            }
        }
        Ok(())
    }

    /// 校验入口假设后把循环体录制 `iterations` 遍
    pub fn record(
        &self,
        iterations: u32,
        ctx: &mut FlowResourceContext,
        sink: &mut dyn GfxCommandSink,
    ) -> Result<(), FlowError> {
        self.validate_entry(ctx)?;
        for iteration in 0..iterations {
            self.body.record_iteration(ctx, sink, iteration)?;
        }
        Ok(())
    }
}
