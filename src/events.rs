//! 通知事件模块 - 镜像过程对外的唯一观测通道

use serde::Serialize;
use std::path::PathBuf;

/// 镜像过程中发布的事件，每个种类携带自己的负载
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum MirrorEvent {
    /// 错误，可能关联具体路径
    Error {
        path: Option<PathBuf>,
        message: String,
    },
    /// 复制：源路径 -> 目标路径
    Copy { source: PathBuf, target: PathBuf },
    /// 删除目标侧路径
    Remove { path: PathBuf },
    /// 监视会话已就绪
    WatchReady { root: PathBuf },
    /// 目录到达深度上限，children 未检查
    MaxDepthReached { path: PathBuf },
    /// 未启用删除，目标侧多余路径被保留
    SkippedNoDelete { path: PathBuf },
    /// 过程性消息
    Verbose { message: String },
}

impl MirrorEvent {
    /// 事件种类名，与序列化标签一致
    pub fn kind(&self) -> &'static str {
        match self {
            MirrorEvent::Error { .. } => "error",
            MirrorEvent::Copy { .. } => "copy",
            MirrorEvent::Remove { .. } => "remove",
            MirrorEvent::WatchReady { .. } => "watch-ready",
            MirrorEvent::MaxDepthReached { .. } => "max-depth-reached",
            MirrorEvent::SkippedNoDelete { .. } => "skipped-no-delete",
            MirrorEvent::Verbose { .. } => "verbose",
        }
    }
}

/// 通知接收端
///
/// 实现必须不阻塞调用方，也不向调用方抛出；同步调和路径和异步监视路径
/// 都会调用它，串行化由实现自己负责。
pub trait Notifier: Send + Sync {
    fn notify(&self, event: MirrorEvent);
}

/// 闭包可以直接作为通知接收端；需要跨任务投递时，
/// 用一个向无界通道发送的闭包即可保持不阻塞
impl<F> Notifier for F
where
    F: Fn(MirrorEvent) + Send + Sync,
{
    fn notify(&self, event: MirrorEvent) {
        self(event);
    }
}
