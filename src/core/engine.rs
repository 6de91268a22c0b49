use crate::config::MirrorOptions;
use crate::core::actions::{FailureKind, PathFailure};
use crate::core::applier::WatchApplier;
use crate::core::filter::PathFilter;
use crate::core::reconciler::Reconciler;
use crate::events::{MirrorEvent, Notifier};
use crate::watch::{NotifyWatchSource, WatchSource};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 镜像报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorReport {
    pub session_id: String,
    pub started_at: i64,
    pub finished_at: i64,
    /// 初始调和是否整体成功；监视阶段的结果只经由 Notifier 上报
    pub success: bool,
    pub entries_copied: u32,
    pub entries_removed: u32,
    pub entries_skipped: u32,
    pub entries_preserved: u32,
    /// 逐路径的失败明细
    pub failures: Vec<PathFailure>,
}

/// 镜像引擎
pub struct MirrorEngine {
    opts: MirrorOptions,
    notifier: Arc<dyn Notifier>,
}

impl MirrorEngine {
    pub fn new(opts: MirrorOptions, notifier: Arc<dyn Notifier>) -> Self {
        Self { opts, notifier }
    }

    pub fn options(&self) -> &MirrorOptions {
        &self.opts
    }

    /// 执行一次完整镜像
    ///
    /// 选项校验发生在任何文件系统变更之前；调和本体在阻塞线程上运行。
    pub async fn mirror_once(&self, source: &Path, target: &Path) -> MirrorReport {
        let session_id = uuid::Uuid::new_v4().to_string();
        let started_at = chrono::Utc::now().timestamp();

        info!(
            "开始镜像任务: {} ({} => {})",
            session_id,
            source.display(),
            target.display()
        );
        self.notifier.notify(MirrorEvent::Verbose {
            message: format!("开始镜像 ({} => {})", source.display(), target.display()),
        });

        let (depth_limit, filter) = match self.validate_options() {
            Ok(v) => v,
            Err(e) => {
                warn!("镜像选项无效: {}", e);
                self.notifier.notify(MirrorEvent::Error {
                    path: None,
                    message: e.to_string(),
                });
                return Self::failed_report(
                    session_id,
                    started_at,
                    vec![PathFailure::new(
                        source,
                        FailureKind::InvalidOptions(e.to_string()),
                    )],
                );
            }
        };

        let mut reconciler = Reconciler::new(
            source.to_path_buf(),
            target.to_path_buf(),
            depth_limit,
            self.opts.delete,
            filter,
            self.notifier.clone(),
        );
        let outcome = tokio::task::spawn_blocking(move || {
            let success = reconciler.run();
            let (stats, failures) = reconciler.into_results();
            (success, stats, failures)
        })
        .await;

        let (success, stats, failures) = match outcome {
            Ok(r) => r,
            Err(e) => {
                warn!("调和任务异常退出: {}", e);
                self.notifier.notify(MirrorEvent::Error {
                    path: None,
                    message: format!("调和任务异常退出: {}", e),
                });
                return Self::failed_report(
                    session_id,
                    started_at,
                    vec![PathFailure::new(source, FailureKind::Internal(e.to_string()))],
                );
            }
        };

        let finished_at = chrono::Utc::now().timestamp();
        info!(
            "镜像任务完成: {} - 复制 {}, 删除 {}, 跳过 {}, 保留 {}, 失败 {}",
            session_id,
            stats.copied,
            stats.removed,
            stats.skipped,
            stats.preserved,
            failures.len()
        );

        MirrorReport {
            session_id,
            started_at,
            finished_at,
            success,
            entries_copied: stats.copied,
            entries_removed: stats.removed,
            entries_skipped: stats.skipped,
            entries_preserved: stats.preserved,
            failures,
        }
    }

    /// 启动监视会话，返回会话句柄
    ///
    /// 事件循环一次只处理一个事件（包括它触发的文件系统操作），
    /// 处理完毕才接收下一个。
    pub async fn start_watch(&self, source: &Path, target: &Path) -> Result<WatchHandle> {
        let (depth_limit, _) = self.validate_options()?;
        let applier = WatchApplier::new(source, target, &self.opts, self.notifier.clone())?;
        let events = NotifyWatchSource::new(applier.source_root(), depth_limit)?;

        self.notifier.notify(MirrorEvent::WatchReady {
            root: source.to_path_buf(),
        });
        info!("监视会话就绪: {}", source.display());

        let task = tokio::spawn(run_watch_loop(events, applier));
        Ok(WatchHandle { task })
    }

    fn validate_options(&self) -> Result<(Option<u64>, PathFilter)> {
        let depth_limit = self.opts.depth_limit()?;
        let filter = PathFilter::new(&self.opts.exclude)?;
        Ok((depth_limit, filter))
    }

    fn failed_report(session_id: String, started_at: i64, failures: Vec<PathFailure>) -> MirrorReport {
        MirrorReport {
            session_id,
            started_at,
            finished_at: chrono::Utc::now().timestamp(),
            success: false,
            entries_copied: 0,
            entries_removed: 0,
            entries_skipped: 0,
            entries_preserved: 0,
            failures,
        }
    }
}

/// 监视会话句柄
///
/// stop 之后不再投递事件，进行中的事件不回滚；直接丢弃句柄则
/// 会话保持运行。
pub struct WatchHandle {
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// 终止监视会话
    pub fn stop(&self) {
        self.task.abort();
    }

    /// 会话是否仍在运行
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

/// 监视事件循环：事件严格串行，应用器在阻塞线程上执行
///
/// 公开给自带监视子系统的调用方，配合任意 WatchSource 实现使用。
pub async fn run_watch_loop<S>(mut events: S, applier: WatchApplier)
where
    S: WatchSource + 'static,
{
    let _teardown = scopeguard::guard((), |_| debug!("监视循环退出"));
    while let Some(event) = events.next_event().await {
        let worker = applier.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || worker.apply(event)).await {
            warn!("监视事件处理异常: {}", e);
        }
    }
}
