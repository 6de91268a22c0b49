//! 本地文件系统原语
//!
//! 调和器消费的全部文件系统表面：探测、修改时间、单层列举、
//! 递归复制、递归删除。每个操作独立成败，失败不回滚。

use anyhow::Result;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use walkdir::WalkDir;

/// 路径探测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Missing,
    File,
    Directory,
}

/// 探测路径类型。stat 失败一律按缺失处理
pub fn probe(path: &Path) -> EntryKind {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => EntryKind::Directory,
        Ok(_) => EntryKind::File,
        Err(_) => EntryKind::Missing,
    }
}

/// 读取修改时间
pub fn modified(path: &Path) -> Result<SystemTime> {
    Ok(fs::metadata(path)?.modified()?)
}

/// 列出目录下的条目名，按名称排序保证顺序稳定
pub fn list_names(path: &Path) -> Result<Vec<OsString>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path)? {
        names.push(entry?.file_name());
    }
    names.sort();
    Ok(names)
}

/// 递归复制文件或目录，目标的父目录不存在时自动创建
pub fn copy_recursively(source: &Path, target: &Path) -> Result<()> {
    if fs::metadata(source)?.is_dir() {
        for entry in WalkDir::new(source).follow_links(false) {
            let entry = entry?;
            let rel = entry.path().strip_prefix(source)?;
            let dest = if rel.as_os_str().is_empty() {
                target.to_path_buf()
            } else {
                target.join(rel)
            };
            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest)?;
            } else {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &dest)?;
            }
        }
    } else {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, target)?;
    }
    Ok(())
}

/// 删除文件或目录，路径不存在时视为成功
pub fn remove_entry(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path)?,
        Ok(_) => fs::remove_file(path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
