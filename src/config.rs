//! 镜像选项模块

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 镜像选项
///
/// 每次顶层调用构造一次，整个递归过程只读共享。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorOptions {
    /// 最大递归深度，None 表示不限制；负值视为配置错误
    #[serde(default)]
    pub depth: Option<i64>,
    /// 是否删除目标侧多余的条目
    #[serde(default)]
    pub delete: bool,
    /// 初始镜像完成后是否继续监视源目录
    #[serde(default)]
    pub watch: bool,
    /// 排除规则（glob patterns），两侧路径都适用
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl MirrorOptions {
    /// 校验并解析深度限制
    pub fn depth_limit(&self) -> Result<Option<u64>> {
        match self.depth {
            None => Ok(None),
            Some(d) if d >= 0 => Ok(Some(d as u64)),
            Some(d) => bail!("depth 选项无效: {}", d),
        }
    }

    /// 从 JSON 文件加载选项，读取或解析失败时回退到默认值
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }
}
