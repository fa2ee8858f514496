//! 错误定义
//!
//! 这里没有可重试的瞬态失败：同步状态一旦不一致，系统就没有
//! 良定义的行为，所有错误都是致命的配置/用法错误，
//! 携带出错的资源索引与 section 名称后立即上抛。

use crate::id::{FlowBufferId, FlowImageId};
use crate::state::{FlowBufferState, FlowImageState};

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// 固定表里的图像从未被任何 section 引用，
    /// 它的哨兵状态永远无法被真实 barrier 满足
    #[error("image {0:?} is never referenced by any section in the list")]
    ImageNeverUsed(FlowImageId),

    /// 固定表里的缓冲区从未被任何 section 引用
    #[error("buffer {0:?} is never referenced by any section in the list")]
    BufferNeverUsed(FlowBufferId),

    /// section 在 complete 之前就被录制
    #[error("section `{section}` was recorded before complete()")]
    SectionNotCompleted { section: String },

    /// section 被 complete 了两次
    #[error("section `{section}` was completed twice")]
    SectionAlreadyCompleted { section: String },

    /// 循环入口处图像状态与录制时的假设不一致
    #[error(
        "loop `{name}`: image {image:?} entered in state {found:?}, expected {expected:?}"
    )]
    LoopEntryImageMismatch {
        name: String,
        image: FlowImageId,
        expected: FlowImageState,
        found: FlowImageState,
    },

    /// 循环入口处缓冲区状态与录制时的假设不一致
    #[error(
        "loop `{name}`: buffer {buffer:?} entered in state {found:?}, expected {expected:?}"
    )]
    LoopEntryBufferMismatch {
        name: String,
        buffer: FlowBufferId,
        expected: FlowBufferState,
        found: FlowBufferState,
    },

    /// pipeline 工厂创建失败（缺 shader、绑定不匹配等），不可恢复
    #[error("section `{section}`: pipeline setup failed")]
    PipelineSetup {
        section: String,
        #[source]
        source: anyhow::Error,
    },
}
