//! 增量应用 - 把单个监视事件映射为目标路径上的动作

use crate::config::MirrorOptions;
use crate::core::actions;
use crate::core::filter::PathFilter;
use crate::events::{MirrorEvent, Notifier};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// 监视子系统产生的单个变更事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "camelCase")]
pub enum WatchEvent {
    /// 新增文件
    Add(PathBuf),
    /// 新增目录
    AddDir(PathBuf),
    /// 文件内容变更
    Change(PathBuf),
    /// 文件被删除
    Unlink(PathBuf),
    /// 目录被删除
    UnlinkDir(PathBuf),
    /// 监视器错误，原样转发
    Error(String),
}

/// 增量应用器
///
/// 不重扫任何其它路径：新增/变更直接整体复制（监视器保证事件发生时
/// 源路径存在，因此跳过时间戳比较），删除走删除策略。结果只通过
/// Notifier 上报，没有调用方消费返回值。
#[derive(Clone)]
pub struct WatchApplier {
    source_root: PathBuf,
    target_root: PathBuf,
    delete_enabled: bool,
    filter: PathFilter,
    notifier: Arc<dyn Notifier>,
}

impl WatchApplier {
    /// 创建应用器。源根被规范化，以便与监视器上报的绝对路径对齐
    pub fn new(
        source_root: &Path,
        target_root: &Path,
        opts: &MirrorOptions,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let source_root = source_root
            .canonicalize()
            .with_context(|| format!("无法规范化源目录 {}", source_root.display()))?;
        let filter = PathFilter::new(&opts.exclude)?;
        Ok(Self {
            source_root,
            target_root: target_root.to_path_buf(),
            delete_enabled: opts.delete,
            filter,
            notifier,
        })
    }

    /// 规范化后的源根
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// 处理单个事件
    pub fn apply(&self, event: WatchEvent) {
        match event {
            WatchEvent::Add(path) | WatchEvent::AddDir(path) | WatchEvent::Change(path) => {
                let Some(target) = self.target_for(&path) else {
                    return;
                };
                if actions::copy_entry(&path, &target, self.notifier.as_ref()).is_err() {
                    debug!("监视复制失败: {}", path.display());
                }
            }
            WatchEvent::Unlink(path) | WatchEvent::UnlinkDir(path) => {
                let Some(target) = self.target_for(&path) else {
                    return;
                };
                if actions::delete_if_allowed(&target, self.delete_enabled, self.notifier.as_ref())
                    .is_err()
                {
                    debug!("监视删除失败: {}", target.display());
                }
            }
            WatchEvent::Error(message) => {
                self.notifier.notify(MirrorEvent::Error {
                    path: None,
                    message,
                });
            }
        }
    }

    /// 计算事件路径对应的目标路径；被排除或不在源根下的路径返回 None
    fn target_for(&self, path: &Path) -> Option<PathBuf> {
        let rel = match path.strip_prefix(&self.source_root) {
            Ok(rel) => rel,
            Err(_) => {
                warn!("事件路径不在源目录下: {}", path.display());
                self.notifier.notify(MirrorEvent::Error {
                    path: Some(path.to_path_buf()),
                    message: format!("事件路径不在源目录下: {}", path.display()),
                });
                return None;
            }
        };
        if self.filter.is_excluded(&rel.to_string_lossy()) {
            debug!("事件路径被排除: {}", path.display());
            return None;
        }
        Some(self.target_root.join(rel))
    }
}
