use crate::core::actions::{self, DeleteOutcome, FailureKind, PathFailure};
use crate::core::filter::PathFilter;
use crate::events::{MirrorEvent, Notifier};
use crate::fs_ops::{self, EntryKind};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// 镜像计数
#[derive(Debug, Default, Clone, Copy)]
pub struct MirrorStats {
    /// 复制的条目数
    pub copied: u32,
    /// 删除的条目数
    pub removed: u32,
    /// 已是最新而跳过的文件数
    pub skipped: u32,
    /// 因未启用删除而保留的条目数
    pub preserved: u32,
}

/// 递归调和器
///
/// 单次调用内同步、单线程地完成整棵子树；失败通过返回值与失败列表
/// 传播而不是 panic，单个分支失败不阻止兄弟分支继续收敛。
pub struct Reconciler {
    source_root: PathBuf,
    target_root: PathBuf,
    depth_limit: Option<u64>,
    delete_enabled: bool,
    filter: PathFilter,
    notifier: Arc<dyn Notifier>,
    stats: MirrorStats,
    failures: Vec<PathFailure>,
}

impl Reconciler {
    pub fn new(
        source_root: PathBuf,
        target_root: PathBuf,
        depth_limit: Option<u64>,
        delete_enabled: bool,
        filter: PathFilter,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source_root,
            target_root,
            depth_limit,
            delete_enabled,
            filter,
            notifier,
            stats: MirrorStats::default(),
            failures: Vec::new(),
        }
    }

    /// 执行一次全树调和，返回整体是否成功
    pub fn run(&mut self) -> bool {
        let source = self.source_root.clone();
        let target = self.target_root.clone();
        self.reconcile(&source, &target, 0)
    }

    pub fn stats(&self) -> MirrorStats {
        self.stats
    }

    pub fn failures(&self) -> &[PathFailure] {
        &self.failures
    }

    pub fn into_results(self) -> (MirrorStats, Vec<PathFailure>) {
        (self.stats, self.failures)
    }

    /// 调和单个路径对
    ///
    /// 两侧类型在每次进入时重新探测，过期的探测结果不跨越递归边界；
    /// 文件系统本身才是唯一权威，探测与后续操作之间的竞争按普通
    /// 操作失败上报。
    fn reconcile(&mut self, source: &Path, target: &Path, depth: u64) -> bool {
        if self.is_excluded(source) {
            debug!("路径被排除: {}", source.display());
            return true;
        }

        let source_kind = fs_ops::probe(source);
        let target_kind = fs_ops::probe(target);

        match (source_kind, target_kind) {
            // 双侧均不存在：按失败处理并上报
            (EntryKind::Missing, EntryKind::Missing) => {
                self.notifier.notify(MirrorEvent::Error {
                    path: Some(source.to_path_buf()),
                    message: format!("源路径不存在: {}", source.display()),
                });
                self.failures
                    .push(PathFailure::new(source, FailureKind::SourceMissing));
                false
            }
            // 源消失：目标交给删除策略
            (EntryKind::Missing, _) => self.delete_if_allowed(target),
            // 目标缺失：整体直接复制
            (_, EntryKind::Missing) => self.copy(source, target),
            (EntryKind::Directory, EntryKind::Directory) => {
                self.reconcile_dirs(source, target, depth)
            }
            (EntryKind::File, EntryKind::File) => self.reconcile_files(source, target),
            // 剩余组合只有文件/目录错配
            _ => self.reconcile_conflict(source, target, source_kind),
        }
    }

    /// 双侧均为目录：先按源收敛，再清理目标侧多余条目
    fn reconcile_dirs(&mut self, source: &Path, target: &Path, depth: u64) -> bool {
        if self.depth_limit == Some(depth) {
            self.notifier.notify(MirrorEvent::MaxDepthReached {
                path: source.to_path_buf(),
            });
            return true;
        }

        let source_names = match fs_ops::list_names(source) {
            Ok(names) => names,
            Err(e) => return self.record_list_failure(source, e),
        };

        let mut ok = true;
        for name in &source_names {
            ok &= self.reconcile(&source.join(name), &target.join(name), depth + 1);
        }

        let target_names = match fs_ops::list_names(target) {
            Ok(names) => names,
            Err(e) => {
                self.record_list_failure(target, e);
                return false;
            }
        };

        let known: HashSet<&OsString> = source_names.iter().collect();
        for name in &target_names {
            if known.contains(name) {
                continue;
            }
            if self.is_excluded(&source.join(name)) {
                debug!("多余路径被排除，保留: {}", target.join(name).display());
                continue;
            }
            ok &= self.delete_if_allowed(&target.join(name));
        }

        ok
    }

    /// 双侧均为文件：仅当源严格更新时覆盖
    fn reconcile_files(&mut self, source: &Path, target: &Path) -> bool {
        let source_time = match fs_ops::modified(source) {
            Ok(t) => t,
            Err(e) => return self.record_stat_failure(source, e),
        };
        let target_time = match fs_ops::modified(target) {
            Ok(t) => t,
            Err(e) => return self.record_stat_failure(target, e),
        };

        if source_time > target_time {
            self.copy(source, target)
        } else {
            self.stats.skipped += 1;
            true
        }
    }

    /// 类型错配：启用删除时先删后拷，否则是不可恢复的结构冲突
    fn reconcile_conflict(&mut self, source: &Path, target: &Path, source_kind: EntryKind) -> bool {
        if self.delete_enabled {
            // 删除失败则不再尝试复制
            return self.destroy(target) && self.copy(source, target);
        }

        let message = match source_kind {
            EntryKind::File => format!(
                "无法将文件 {} 复制到已存在的目录 {}",
                source.display(),
                target.display()
            ),
            _ => format!(
                "无法将目录 {} 复制到已存在的文件 {}",
                source.display(),
                target.display()
            ),
        };
        self.notifier.notify(MirrorEvent::Error {
            path: Some(target.to_path_buf()),
            message,
        });
        self.failures
            .push(PathFailure::new(target, FailureKind::KindConflict));
        false
    }

    fn copy(&mut self, source: &Path, target: &Path) -> bool {
        match actions::copy_entry(source, target, self.notifier.as_ref()) {
            Ok(()) => {
                self.stats.copied += 1;
                true
            }
            Err(failure) => {
                self.failures.push(failure);
                false
            }
        }
    }

    fn destroy(&mut self, path: &Path) -> bool {
        match actions::destroy_entry(path, self.notifier.as_ref()) {
            Ok(()) => {
                self.stats.removed += 1;
                true
            }
            Err(failure) => {
                self.failures.push(failure);
                false
            }
        }
    }

    fn delete_if_allowed(&mut self, path: &Path) -> bool {
        match actions::delete_if_allowed(path, self.delete_enabled, self.notifier.as_ref()) {
            Ok(DeleteOutcome::Removed) => {
                self.stats.removed += 1;
                true
            }
            Ok(DeleteOutcome::Skipped) => {
                self.stats.preserved += 1;
                true
            }
            Err(failure) => {
                self.failures.push(failure);
                false
            }
        }
    }

    fn record_list_failure(&mut self, path: &Path, err: anyhow::Error) -> bool {
        self.notifier.notify(MirrorEvent::Error {
            path: Some(path.to_path_buf()),
            message: format!("列举目录 {} 失败: {}", path.display(), err),
        });
        self.failures
            .push(PathFailure::new(path, FailureKind::ListFailed(err.to_string())));
        false
    }

    fn record_stat_failure(&mut self, path: &Path, err: anyhow::Error) -> bool {
        self.notifier.notify(MirrorEvent::Error {
            path: Some(path.to_path_buf()),
            message: format!("读取 {} 的元数据失败: {}", path.display(), err),
        });
        self.failures
            .push(PathFailure::new(path, FailureKind::StatFailed(err.to_string())));
        false
    }

    /// 以源根的相对路径做排除判断；根本身不参与排除
    fn is_excluded(&self, source_path: &Path) -> bool {
        if self.filter.is_empty() {
            return false;
        }
        match source_path.strip_prefix(&self.source_root) {
            Ok(rel) if !rel.as_os_str().is_empty() => {
                self.filter.is_excluded(&rel.to_string_lossy())
            }
            _ => false,
        }
    }
}
