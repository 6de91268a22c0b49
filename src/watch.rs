//! 监视子系统适配 - 把 notify 的原始事件规范化为类型化的变更事件流

use crate::core::applier::WatchEvent;
use crate::fs_ops::{self, EntryKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::debug;

/// 类型化的监视事件源
///
/// 调和核心只依赖这个接口；自带监视机制的调用方可以提供自己的实现。
#[async_trait]
pub trait WatchSource: Send {
    /// 取出下一个事件，None 表示事件流结束
    async fn next_event(&mut self) -> Option<WatchEvent>;
}

/// 基于 notify 的默认监视事件源
pub struct NotifyWatchSource {
    // watcher 必须存活到会话结束，否则事件停止投递
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<WatchEvent>,
}

impl NotifyWatchSource {
    /// 在 root 上建立递归监视。root 应当是规范化后的绝对路径
    pub fn new(root: &Path, depth_limit: Option<u64>) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let watch_root = root.to_path_buf();

        let mut watcher = notify::recommended_watcher(move |outcome: notify::Result<Event>| {
            match outcome {
                Ok(event) => {
                    for translated in translate_event(&event) {
                        if exceeds_depth(&translated, &watch_root, depth_limit) {
                            continue;
                        }
                        if tx.send(translated).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(WatchEvent::Error(e.to_string()));
                }
            }
        })
        .context("创建文件系统监视器失败")?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("监视 {} 失败", root.display()))?;
        debug!("已建立监视: {}", root.display());

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }
}

#[async_trait]
impl WatchSource for NotifyWatchSource {
    async fn next_event(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }
}

/// 把一个原始事件翻译为零个或多个类型化事件
fn translate_event(event: &Event) -> Vec<WatchEvent> {
    let mut out = Vec::new();
    match &event.kind {
        EventKind::Create(kind) => {
            for path in &event.paths {
                out.push(match kind {
                    CreateKind::Folder => WatchEvent::AddDir(path.clone()),
                    CreateKind::File => WatchEvent::Add(path.clone()),
                    // 类型不明时以实际探测为准
                    _ => match fs_ops::probe(path) {
                        EntryKind::Directory => WatchEvent::AddDir(path.clone()),
                        _ => WatchEvent::Add(path.clone()),
                    },
                });
            }
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            // 重命名的新旧两端都会出现在这里，按当前存在性归类
            for path in &event.paths {
                out.push(match fs_ops::probe(path) {
                    EntryKind::Missing => WatchEvent::Unlink(path.clone()),
                    EntryKind::File => WatchEvent::Add(path.clone()),
                    EntryKind::Directory => WatchEvent::AddDir(path.clone()),
                });
            }
        }
        EventKind::Modify(_) => {
            for path in &event.paths {
                // 目录自身的变更不整体复制，其子项有各自的事件
                if fs_ops::probe(path) == EntryKind::File {
                    out.push(WatchEvent::Change(path.clone()));
                }
            }
        }
        EventKind::Remove(kind) => {
            for path in &event.paths {
                out.push(match kind {
                    RemoveKind::Folder => WatchEvent::UnlinkDir(path.clone()),
                    _ => WatchEvent::Unlink(path.clone()),
                });
            }
        }
        _ => {}
    }
    out
}

/// 依据根相对路径的层级数实施深度过滤，对应初始镜像的深度上限
fn exceeds_depth(event: &WatchEvent, root: &Path, depth_limit: Option<u64>) -> bool {
    let Some(limit) = depth_limit else {
        return false;
    };
    let path = match event {
        WatchEvent::Add(p)
        | WatchEvent::AddDir(p)
        | WatchEvent::Change(p)
        | WatchEvent::Unlink(p)
        | WatchEvent::UnlinkDir(p) => p,
        WatchEvent::Error(_) => return false,
    };
    match path.strip_prefix(root) {
        Ok(rel) => (rel.components().count() as u64) > limit,
        Err(_) => false,
    }
}
