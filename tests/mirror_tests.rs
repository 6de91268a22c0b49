mod common;

use common::{opts, set_mtime, write_file, Recorder};
use mirrortools::{sync, FailureKind, MirrorOptions};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

#[tokio::test]
async fn full_mirror_into_empty_target() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("a.txt"), "alpha");
    write_file(&source.path().join("sub/b.txt"), "beta");

    let recorder = Arc::new(Recorder::default());
    let report = sync(
        source.path(),
        target.path(),
        MirrorOptions {
            delete: true,
            ..opts()
        },
        recorder.clone(),
    )
    .await;

    assert!(report.success);
    assert_eq!(
        fs::read_to_string(target.path().join("a.txt")).unwrap(),
        "alpha"
    );
    assert_eq!(
        fs::read_to_string(target.path().join("sub/b.txt")).unwrap(),
        "beta"
    );
    // a.txt 一次，sub 整体一次
    assert_eq!(recorder.count("copy"), 2);
    assert_eq!(recorder.count("remove"), 0);
    assert_eq!(report.entries_copied, 2);
    assert_eq!(report.entries_removed, 0);
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("a.txt"), "alpha");
    write_file(&source.path().join("sub/b.txt"), "beta");

    let first = Arc::new(Recorder::default());
    let report = sync(
        source.path(),
        target.path(),
        MirrorOptions {
            delete: true,
            ..opts()
        },
        first.clone(),
    )
    .await;
    assert!(report.success);

    let second = Arc::new(Recorder::default());
    let report = sync(
        source.path(),
        target.path(),
        MirrorOptions {
            delete: true,
            ..opts()
        },
        second.clone(),
    )
    .await;

    assert!(report.success);
    assert_eq!(report.entries_copied, 0);
    assert_eq!(report.entries_removed, 0);
    assert_eq!(second.count("copy"), 0);
    assert_eq!(second.count("remove"), 0);
}

#[tokio::test]
async fn depth_limit_treats_directories_as_leaves() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("top.txt"), "t");
    write_file(&source.path().join("d1/d2/deep.txt"), "deep");
    write_file(&source.path().join("e1/file.txt"), "e");
    // 预置同名目录，使两侧在深度 1 处都是目录
    fs::create_dir_all(target.path().join("d1")).unwrap();
    fs::create_dir_all(target.path().join("e1")).unwrap();

    let recorder = Arc::new(Recorder::default());
    let report = sync(
        source.path(),
        target.path(),
        MirrorOptions {
            depth: Some(1),
            ..opts()
        },
        recorder.clone(),
    )
    .await;

    assert!(report.success);
    assert_eq!(
        fs::read_to_string(target.path().join("top.txt")).unwrap(),
        "t"
    );
    // 深度 1 的目录按叶子处理，children 未检查
    assert!(!target.path().join("d1/d2").exists());
    assert!(!target.path().join("e1/file.txt").exists());
    // 每个到达上限的目录恰好一条通知
    assert_eq!(recorder.count("max-depth-reached"), 2);
}

#[tokio::test]
async fn no_delete_preserves_extraneous_paths() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("keep.txt"), "k");
    write_file(&target.path().join("extra.txt"), "x");
    write_file(&target.path().join("extra_dir/inner.txt"), "y");

    let recorder = Arc::new(Recorder::default());
    let report = sync(source.path(), target.path(), opts(), recorder.clone()).await;

    assert!(report.success);
    assert!(target.path().join("extra.txt").exists());
    assert!(target.path().join("extra_dir/inner.txt").exists());
    // 每个顶层多余路径恰好一条跳过通知，子项不单独通知
    assert_eq!(recorder.count("skipped-no-delete"), 2);
    assert_eq!(recorder.count("remove"), 0);
    assert_eq!(report.entries_preserved, 2);
}

#[tokio::test]
async fn newer_source_overwrites_older_target() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("a.txt"), "new");
    write_file(&target.path().join("a.txt"), "old");

    let now = SystemTime::now();
    set_mtime(&target.path().join("a.txt"), now - Duration::from_secs(60));
    set_mtime(&source.path().join("a.txt"), now);

    let recorder = Arc::new(Recorder::default());
    let report = sync(source.path(), target.path(), opts(), recorder.clone()).await;

    assert!(report.success);
    assert_eq!(
        fs::read_to_string(target.path().join("a.txt")).unwrap(),
        "new"
    );
    assert_eq!(recorder.count("copy"), 1);
}

#[tokio::test]
async fn older_source_is_left_alone() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("a.txt"), "stale");
    write_file(&target.path().join("a.txt"), "current");

    let now = SystemTime::now();
    set_mtime(&source.path().join("a.txt"), now - Duration::from_secs(60));
    set_mtime(&target.path().join("a.txt"), now);

    let recorder = Arc::new(Recorder::default());
    let report = sync(source.path(), target.path(), opts(), recorder.clone()).await;

    assert!(report.success);
    assert_eq!(
        fs::read_to_string(target.path().join("a.txt")).unwrap(),
        "current"
    );
    assert_eq!(recorder.count("copy"), 0);
    assert_eq!(report.entries_skipped, 1);
}

#[tokio::test]
async fn equal_mtime_counts_as_in_sync() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("a.txt"), "left");
    write_file(&target.path().join("a.txt"), "right");

    let stamp = SystemTime::now() - Duration::from_secs(10);
    set_mtime(&source.path().join("a.txt"), stamp);
    set_mtime(&target.path().join("a.txt"), stamp);

    let recorder = Arc::new(Recorder::default());
    let report = sync(source.path(), target.path(), opts(), recorder.clone()).await;

    assert!(report.success);
    assert_eq!(
        fs::read_to_string(target.path().join("a.txt")).unwrap(),
        "right"
    );
    assert_eq!(recorder.count("copy"), 0);
}

#[tokio::test]
async fn kind_conflict_without_delete_fails_but_siblings_proceed() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("conflict"), "i am a file");
    write_file(&target.path().join("conflict/nested.txt"), "i am a dir");
    write_file(&source.path().join("ok.txt"), "fine");

    let recorder = Arc::new(Recorder::default());
    let report = sync(source.path(), target.path(), opts(), recorder.clone()).await;

    assert!(!report.success);
    assert_eq!(recorder.count("error"), 1);
    // 冲突路径保持原样
    assert!(target.path().join("conflict/nested.txt").exists());
    // 兄弟条目照常收敛
    assert_eq!(
        fs::read_to_string(target.path().join("ok.txt")).unwrap(),
        "fine"
    );
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].kind, FailureKind::KindConflict));
    assert_eq!(report.failures[0].path, target.path().join("conflict"));
}

#[tokio::test]
async fn kind_conflict_with_delete_replaces_target() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("conflict"), "i am a file");
    write_file(&target.path().join("conflict/nested.txt"), "i am a dir");

    let recorder = Arc::new(Recorder::default());
    let report = sync(
        source.path(),
        target.path(),
        MirrorOptions {
            delete: true,
            ..opts()
        },
        recorder.clone(),
    )
    .await;

    assert!(report.success);
    assert_eq!(
        fs::read_to_string(target.path().join("conflict")).unwrap(),
        "i am a file"
    );
    assert_eq!(recorder.count("remove"), 1);
    assert_eq!(recorder.count("copy"), 1);
}

#[tokio::test]
async fn directory_vs_file_conflict_without_delete() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("conflict/nested.txt"), "i am a dir");
    write_file(&target.path().join("conflict"), "i am a file");

    let recorder = Arc::new(Recorder::default());
    let report = sync(source.path(), target.path(), opts(), recorder.clone()).await;

    assert!(!report.success);
    assert_eq!(recorder.count("error"), 1);
    assert_eq!(
        fs::read_to_string(target.path().join("conflict")).unwrap(),
        "i am a file"
    );
}

#[tokio::test]
async fn negative_depth_fails_before_touching_the_target() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("a.txt"), "alpha");

    let recorder = Arc::new(Recorder::default());
    let report = sync(
        source.path(),
        target.path(),
        MirrorOptions {
            depth: Some(-1),
            ..opts()
        },
        recorder.clone(),
    )
    .await;

    assert!(!report.success);
    assert_eq!(recorder.count("error"), 1);
    assert_eq!(recorder.count("copy"), 0);
    assert!(matches!(
        report.failures[0].kind,
        FailureKind::InvalidOptions(_)
    ));
    // 目标目录未被触碰
    assert_eq!(fs::read_dir(target.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn missing_source_and_target_is_reported() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("nonexistent_source");
    let target = dir.path().join("nonexistent_target");

    let recorder = Arc::new(Recorder::default());
    let report = sync(&source, &target, opts(), recorder.clone()).await;

    assert!(!report.success);
    assert_eq!(recorder.count("error"), 1);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].kind, FailureKind::SourceMissing));
}

#[tokio::test]
async fn missing_source_applies_deletion_policy_to_target() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("gone");
    let target = dir.path().join("target");
    write_file(&target.join("leftover.txt"), "x");

    // 未启用删除：目标保留，计为跳过
    let recorder = Arc::new(Recorder::default());
    let report = sync(&source, &target, opts(), recorder.clone()).await;
    assert!(report.success);
    assert!(target.join("leftover.txt").exists());
    assert_eq!(recorder.count("skipped-no-delete"), 1);

    // 启用删除：整个目标被移除
    let recorder = Arc::new(Recorder::default());
    let report = sync(
        &source,
        &target,
        MirrorOptions {
            delete: true,
            ..opts()
        },
        recorder.clone(),
    )
    .await;
    assert!(report.success);
    assert!(!target.exists());
    assert_eq!(recorder.count("remove"), 1);
}

#[tokio::test]
async fn mirror_removes_extraneous_entries_with_delete() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("keep.txt"), "k");
    write_file(&target.path().join("keep.txt"), "k-old");
    write_file(&target.path().join("stale.txt"), "s");
    write_file(&target.path().join("stale_dir/inner.txt"), "i");

    set_mtime(
        &target.path().join("keep.txt"),
        SystemTime::now() - Duration::from_secs(60),
    );
    set_mtime(&source.path().join("keep.txt"), SystemTime::now());

    let recorder = Arc::new(Recorder::default());
    let report = sync(
        source.path(),
        target.path(),
        MirrorOptions {
            delete: true,
            ..opts()
        },
        recorder.clone(),
    )
    .await;

    assert!(report.success);
    assert_eq!(
        fs::read_to_string(target.path().join("keep.txt")).unwrap(),
        "k"
    );
    assert!(!target.path().join("stale.txt").exists());
    assert!(!target.path().join("stale_dir").exists());
    assert_eq!(report.entries_removed, 2);
}

#[tokio::test]
async fn excluded_paths_are_neither_copied_nor_deleted() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    write_file(&source.path().join("keep.txt"), "k");
    write_file(&source.path().join("node_modules/pkg/index.js"), "js");
    write_file(&target.path().join("build.tmp"), "tmp");

    let recorder = Arc::new(Recorder::default());
    let report = sync(
        source.path(),
        target.path(),
        MirrorOptions {
            delete: true,
            exclude: vec!["node_modules/**".to_string(), "*.tmp".to_string()],
            ..opts()
        },
        recorder.clone(),
    )
    .await;

    assert!(report.success);
    assert_eq!(
        fs::read_to_string(target.path().join("keep.txt")).unwrap(),
        "k"
    );
    // 被排除的源路径不复制
    assert!(!target.path().join("node_modules").exists());
    // 被排除的多余目标路径既不删除也不通知
    assert!(target.path().join("build.tmp").exists());
    assert_eq!(recorder.count("remove"), 0);
    assert_eq!(recorder.count("skipped-no-delete"), 0);
}

#[tokio::test]
async fn report_carries_verbose_start_event() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();

    let recorder = Arc::new(Recorder::default());
    let report = sync(source.path(), target.path(), opts(), recorder.clone()).await;

    assert!(report.success);
    assert_eq!(recorder.count("verbose"), 1);
    assert!(!report.session_id.is_empty());
    assert!(report.finished_at >= report.started_at);
}
