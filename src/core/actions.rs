//! 单条目动作 - 调和器与增量应用器共用的复制/删除执行层
//!
//! 每个动作先发出对应通知，再尝试执行；失败时补发错误通知并
//! 返回类型化的失败记录，绝不静默吞掉错误。

use crate::events::{MirrorEvent, Notifier};
use crate::fs_ops;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// 单个路径上的失败种类
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum FailureKind {
    #[error("源路径与目标路径均不存在")]
    SourceMissing,
    #[error("复制失败: {0}")]
    CopyFailed(String),
    #[error("删除失败: {0}")]
    RemoveFailed(String),
    #[error("目录列举失败: {0}")]
    ListFailed(String),
    #[error("元数据读取失败: {0}")]
    StatFailed(String),
    #[error("源与目标的条目类型不兼容")]
    KindConflict,
    #[error("选项无效: {0}")]
    InvalidOptions(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 单个路径上的失败记录
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
}

impl PathFailure {
    pub fn new(path: impl Into<PathBuf>, kind: FailureKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// 删除策略的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeleteOutcome {
    Removed,
    Skipped,
}

/// 复制单个条目，目录为整体递归复制
pub(crate) fn copy_entry(
    source: &Path,
    target: &Path,
    notifier: &dyn Notifier,
) -> Result<(), PathFailure> {
    notifier.notify(MirrorEvent::Copy {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
    });
    match fs_ops::copy_recursively(source, target) {
        Ok(()) => {
            debug!("复制完成: {} -> {}", source.display(), target.display());
            Ok(())
        }
        Err(e) => {
            notifier.notify(MirrorEvent::Error {
                path: Some(source.to_path_buf()),
                message: format!(
                    "复制 {} 到 {} 失败: {}",
                    source.display(),
                    target.display(),
                    e
                ),
            });
            Err(PathFailure::new(source, FailureKind::CopyFailed(e.to_string())))
        }
    }
}

/// 删除单个条目
pub(crate) fn destroy_entry(path: &Path, notifier: &dyn Notifier) -> Result<(), PathFailure> {
    notifier.notify(MirrorEvent::Remove {
        path: path.to_path_buf(),
    });
    match fs_ops::remove_entry(path) {
        Ok(()) => {
            debug!("删除完成: {}", path.display());
            Ok(())
        }
        Err(e) => {
            notifier.notify(MirrorEvent::Error {
                path: Some(path.to_path_buf()),
                message: format!("删除 {} 失败: {}", path.display(), e),
            });
            Err(PathFailure::new(path, FailureKind::RemoveFailed(e.to_string())))
        }
    }
}

/// 按删除策略处理多余的目标路径
///
/// 未启用删除时保留路径并通知，这不算失败。
pub(crate) fn delete_if_allowed(
    path: &Path,
    delete_enabled: bool,
    notifier: &dyn Notifier,
) -> Result<DeleteOutcome, PathFailure> {
    if delete_enabled {
        destroy_entry(path, notifier).map(|_| DeleteOutcome::Removed)
    } else {
        notifier.notify(MirrorEvent::SkippedNoDelete {
            path: path.to_path_buf(),
        });
        Ok(DeleteOutcome::Skipped)
    }
}
