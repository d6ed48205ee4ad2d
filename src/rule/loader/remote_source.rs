//! 远程规则源与源注册表
//! 注册表在配置加载时一次性构建，之后只读；SourceId 即源在注册表中的下标

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use adrules_engine::{DeclaredType, SourceId};
use tracing::{debug, warn};
use url::Url;

use crate::config::{GlobalConfig, SourceConfig};
use crate::error::{AdResult, AdRulesError};

/// 支持的 URL 协议
const SUPPORTED_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// 单个远程规则源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRuleSource {
    pub id: SourceId,
    pub name: String,
    pub raw_url: String,
    pub declared_type: DeclaredType,
}

impl fmt::Display for RemoteRuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.name, self.declared_type, self.raw_url)
    }
}

/// 规则源注册表（有序）
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<RemoteRuleSource>,
}

impl SourceRegistry {
    /// 由配置构建：先读列表文件，再追加 `[[sources]]`
    /// 结果为空时返回配置错误
    pub fn from_config(config: &GlobalConfig) -> AdResult<Self> {
        let mut entries = Vec::new();
        for (path, declared_type) in config.source_lists.entries() {
            entries.extend(load_source_list(path, declared_type)?);
        }
        entries.extend(config.sources.iter().cloned());

        let registry = Self::from_entries(entries)?;
        if registry.is_empty() {
            return Err(AdRulesError::Config("未配置任何规则源".into()));
        }
        Ok(registry)
    }

    /// 校验 URL、按 (url, 类型) 去重、补全并去重名称
    pub fn from_entries(entries: impl IntoIterator<Item = SourceConfig>) -> AdResult<Self> {
        let mut registry = Self::default();
        let mut seen_keys = HashSet::new();
        let mut seen_names = HashSet::new();

        for entry in entries {
            let url = entry.url.trim();
            let parsed = Url::parse(url)
                .map_err(|e| AdRulesError::Config(format!("规则源 URL 无效 `{}`：{}", url, e)))?;
            if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
                return Err(AdRulesError::Config(format!(
                    "规则源 URL 协议不受支持 `{}`",
                    url
                )));
            }

            if !seen_keys.insert((url.to_string(), entry.declared_type)) {
                warn!("Duplicate source dropped: {} [{}]", url, entry.declared_type);
                continue;
            }

            let base = match entry.name.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => derive_source_name(&parsed),
            };
            let mut name = base.clone();
            let mut suffix = 2;
            while !seen_names.insert(name.clone()) {
                name = format!("{}-{}", base, suffix);
                suffix += 1;
            }

            let source = RemoteRuleSource {
                id: SourceId(registry.sources.len() as u32),
                name,
                raw_url: url.to_string(),
                declared_type: entry.declared_type,
            };
            debug!("Registered source {}", source);
            registry.sources.push(source);
        }

        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn get(&self, id: SourceId) -> Option<&RemoteRuleSource> {
        self.sources.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteRuleSource> {
        self.sources.iter()
    }

    pub fn sources(&self) -> &[RemoteRuleSource] {
        &self.sources
    }
}

/// 读取源列表文件：每行一个 URL，`#` 开头为注释
pub fn load_source_list(path: &Path, declared_type: DeclaredType) -> AdResult<Vec<SourceConfig>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AdRulesError::Config(format!("无法读取规则源列表 {}：{}", path.display(), e))
    })?;
    let entries: Vec<_> = parse_source_list(&content)
        .map(|url| SourceConfig::new(url, declared_type))
        .collect();
    debug!(
        "Loaded {} {} sources from {}",
        entries.len(),
        declared_type,
        path.display()
    );
    Ok(entries)
}

pub fn parse_source_list(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// 由 URL 推导源名称：主机名 + 最后一段路径，仅保留文件名安全字符
pub fn derive_source_name(url: &Url) -> String {
    let host = url.host_str().unwrap_or("local");
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty());

    let raw = match last {
        Some(segment) => format!("{}-{}", host, segment),
        None => host.to_string(),
    };
    raw.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}
