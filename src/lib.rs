use std::path::Path;
use std::sync::Arc;

pub mod config;
pub mod core;
pub mod events;
pub mod fs_ops;
pub mod logging;
pub mod watch;

pub use config::MirrorOptions;
pub use crate::core::{
    FailureKind, MirrorEngine, MirrorReport, MirrorStats, PathFailure, Reconciler, WatchApplier,
    WatchEvent, WatchHandle,
};
pub use events::{MirrorEvent, Notifier};
pub use watch::{NotifyWatchSource, WatchSource};

/// 执行一次镜像，并按选项在初始镜像成功后启动监视会话
///
/// 返回值只反映初始调和的结果；监视阶段的结果经由 notifier 上报。
/// 需要控制监视会话生命周期的调用方应直接使用 [`MirrorEngine`]。
pub async fn sync(
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
    opts: MirrorOptions,
    notifier: Arc<dyn Notifier>,
) -> MirrorReport {
    let source = source.as_ref();
    let target = target.as_ref();
    let watch_requested = opts.watch;

    let engine = MirrorEngine::new(opts, notifier.clone());
    let report = engine.mirror_once(source, target).await;

    // 初始镜像失败则不进入监视阶段
    if report.success && watch_requested {
        match engine.start_watch(source, target).await {
            // 丢弃句柄即让会话保持运行
            Ok(_handle) => {}
            Err(e) => {
                notifier.notify(MirrorEvent::Error {
                    path: None,
                    message: format!("启动监视会话失败: {}", e),
                });
            }
        }
    }

    report
}
