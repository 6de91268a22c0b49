use anyhow::{Context, Result};
use regex::Regex;

/// 路径排除过滤器，规则在构造时编译一次
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    rules: Vec<MatchRule>,
}

#[derive(Debug, Clone)]
enum MatchRule {
    /// `**` 规则：前缀 + 后缀匹配
    Subtree { prefix: String, suffix: String },
    /// 含 `*` 的规则，编译为正则
    Pattern(Regex),
    /// 精确匹配（整个路径或最后一段）
    Exact(String),
}

impl PathFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut rules = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let rule = Self::compile(pattern)
                .with_context(|| format!("排除规则无效: {}", pattern))?;
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 判断相对路径是否被排除，匹配不区分大小写，分隔符统一为 /
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let path = rel_path.replace('\\', "/").to_lowercase();
        self.rules.iter().any(|rule| rule.matches(&path))
    }

    fn compile(pattern: &str) -> Result<MatchRule> {
        let pattern = pattern.to_lowercase();

        if let Some((prefix, suffix)) = pattern.split_once("**") {
            if !suffix.contains("**") {
                return Ok(MatchRule::Subtree {
                    prefix: prefix.trim_end_matches('/').to_string(),
                    suffix: suffix.trim_start_matches('/').to_string(),
                });
            }
        }

        if pattern.contains('*') {
            let escaped = pattern.replace('.', "\\.").replace('*', ".*");
            let re = Regex::new(&format!("^{}$", escaped))?;
            return Ok(MatchRule::Pattern(re));
        }

        Ok(MatchRule::Exact(pattern))
    }
}

impl MatchRule {
    fn matches(&self, path: &str) -> bool {
        match self {
            MatchRule::Subtree { prefix, suffix } => {
                (prefix.is_empty() || path.starts_with(prefix.as_str()))
                    && (suffix.is_empty() || path.ends_with(suffix.as_str()))
            }
            MatchRule::Pattern(re) => re.is_match(path),
            MatchRule::Exact(exact) => {
                path == exact.as_str() || path.ends_with(&format!("/{}", exact))
            }
        }
    }
}
