//! 全局配置管理,存储所有可配置项
//! TOML 文件加载 + 链式构建器，校验失败在任何拉取之前返回配置错误

use std::path::{Path, PathBuf};
use std::time::Duration;

use adrules_engine::{DeclaredType, MatchMode, OutputOrder};
use adrules_engine::render::DEFAULT_HOSTS_MAX_ENTRIES;
use serde::{Deserialize, Serialize};

use crate::error::{AdResult, AdRulesError};

/// 拉取配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    // 并发拉取上限
    pub max_workers: usize,
    // 单次请求超时（秒）
    pub timeout_secs: u64,
    // 失败后额外重试次数
    pub retries: u32,
    // 首次重试退避（毫秒），之后指数增长
    pub backoff_ms: u64,
    // 整次运行的拉取预算（秒）
    pub run_budget_secs: u64,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_workers: 5,
            timeout_secs: 30,
            retries: 2,
            backoff_ms: 2000,
            run_budget_secs: 1800,
            user_agent: format!("Mozilla/5.0 (compatible; adrules/{})", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn run_budget(&self) -> Duration {
        Duration::from_secs(self.run_budget_secs)
    }
}

/// 产物输出配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub dir: PathBuf,
    pub order: OutputOrder,
    pub match_mode: MatchMode,
    // hosts 条数上限，0 表示不限
    pub hosts_max_entries: usize,
    // 是否写注释头
    pub header: bool,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("rules/outputs"),
            order: OutputOrder::default(),
            match_mode: MatchMode::default(),
            hosts_max_entries: DEFAULT_HOSTS_MAX_ENTRIES,
            header: true,
            title: "AdRules".to_string(),
            homepage: None,
        }
    }
}

impl OutputOptions {
    pub fn hosts_limit(&self) -> Option<usize> {
        (self.hosts_max_entries > 0).then_some(self.hosts_max_entries)
    }
}

/// 规则源列表文件（每行一个 URL），每个文件绑定一种声明类型
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceListFiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosts: Option<PathBuf>,
}

impl SourceListFiles {
    /// 已配置的列表文件及其声明类型
    pub fn entries(&self) -> Vec<(&Path, DeclaredType)> {
        [
            (&self.black, DeclaredType::Blacklist),
            (&self.white, DeclaredType::Whitelist),
            (&self.dns, DeclaredType::Dns),
            (&self.hosts, DeclaredType::Hosts),
        ]
        .into_iter()
        .filter_map(|(path, ty)| path.as_deref().map(|p| (p, ty)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// `[[sources]]` 条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    // 缺省时由 URL 推导
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
    #[serde(rename = "type")]
    pub declared_type: DeclaredType,
}

impl SourceConfig {
    pub fn new(url: impl Into<String>, declared_type: DeclaredType) -> Self {
        Self {
            name: None,
            url: url.into(),
            declared_type,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 全局配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    // 缓存目录（ETag 记录、原始文件、上次运行快照），None 表示不缓存
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    pub fetch: FetchOptions,
    pub output: OutputOptions,
    pub source_lists: SourceListFiles,
    pub sources: Vec<SourceConfig>,
}

impl GlobalConfig {
    /// 从 TOML 文件加载
    /// 列表文件的相对路径以配置文件所在目录为基准
    pub fn load(path: impl AsRef<Path>) -> AdResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AdRulesError::Config(format!("无法读取配置文件 {}：{}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.source_lists.rebase(base);
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> AdResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> AdResult<String> {
        toml::to_string_pretty(self).map_err(|e| AdRulesError::Config(e.to_string()))
    }

    /// 数值项校验；源列表是否为空在构建注册表时校验
    pub fn validate(&self) -> AdResult<()> {
        if self.fetch.max_workers == 0 {
            return Err(AdRulesError::Config("fetch.max_workers 必须大于 0".into()));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AdRulesError::Config("fetch.timeout_secs 必须大于 0".into()));
        }
        if self.fetch.run_budget_secs == 0 {
            return Err(AdRulesError::Config("fetch.run_budget_secs 必须大于 0".into()));
        }
        if self.output.dir.as_os_str().is_empty() {
            return Err(AdRulesError::Config("output.dir 不能为空".into()));
        }
        if let Some(homepage) = &self.output.homepage {
            url::Url::parse(homepage)?;
        }
        Ok(())
    }
}

impl SourceListFiles {
    fn rebase(&mut self, base: &Path) {
        for path in [&mut self.black, &mut self.white, &mut self.dns, &mut self.hosts]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = Some(dir.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output.dir = dir.into();
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.config.fetch.max_workers = workers;
        self
    }

    pub fn timeout_secs(mut self, timeout: u64) -> Self {
        self.config.fetch.timeout_secs = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.config.fetch.retries = retries;
        self
    }

    pub fn backoff_ms(mut self, backoff: u64) -> Self {
        self.config.fetch.backoff_ms = backoff;
        self
    }

    pub fn run_budget_secs(mut self, budget: u64) -> Self {
        self.config.fetch.run_budget_secs = budget;
        self
    }

    pub fn order(mut self, order: OutputOrder) -> Self {
        self.config.output.order = order;
        self
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.config.output.match_mode = mode;
        self
    }

    pub fn hosts_max_entries(mut self, max: usize) -> Self {
        self.config.output.hosts_max_entries = max;
        self
    }

    pub fn header(mut self, header: bool) -> Self {
        self.config.output.header = header;
        self
    }

    pub fn source(mut self, source: SourceConfig) -> Self {
        self.config.sources.push(source);
        self
    }

    pub fn source_list(mut self, path: impl Into<PathBuf>, declared_type: DeclaredType) -> Self {
        let path = Some(path.into());
        match declared_type {
            DeclaredType::Blacklist => self.config.source_lists.black = path,
            DeclaredType::Whitelist => self.config.source_lists.white = path,
            DeclaredType::Dns => self.config.source_lists.dns = path,
            DeclaredType::Hosts => self.config.source_lists.hosts = path,
        }
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
cache_dir = ".cache/adrules"

[fetch]
max_workers = 8
timeout_secs = 10

[output]
dir = "out"
order = "blacklist-first"
match_mode = "exact"
hosts_max_entries = 0

[source_lists]
black = "rules/sources/black.txt"

[[sources]]
name = "base"
url = "https://lists.example.org/base.txt"
type = "blacklist"

[[sources]]
url = "https://lists.example.org/hosts"
type = "hosts"
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = GlobalConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from(".cache/adrules")));
        assert_eq!(config.fetch.max_workers, 8);
        assert_eq!(config.fetch.retries, 2);
        assert_eq!(config.fetch.backoff_ms, 2000);
        assert_eq!(config.output.order, OutputOrder::BlacklistFirst);
        assert_eq!(config.output.match_mode, MatchMode::Exact);
        assert_eq!(config.output.hosts_limit(), None);
        assert!(config.output.header);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].name.as_deref(), Some("base"));
        assert_eq!(config.sources[1].declared_type, DeclaredType::Hosts);
        assert_eq!(config.source_lists.entries().len(), 1);
        config.validate().unwrap();
    }

    #[test]
    fn empty_document_is_default() {
        let config = GlobalConfig::from_toml("").unwrap();
        assert_eq!(config, GlobalConfig::default());
        assert_eq!(config.output.hosts_limit(), Some(DEFAULT_HOSTS_MAX_ENTRIES));
        assert_eq!(config.output.match_mode, MatchMode::Hierarchical);
        assert_eq!(config.output.order, OutputOrder::WhitelistFirst);
    }

    #[test]
    fn rejects_unknown_source_type() {
        let err = GlobalConfig::from_toml("[[sources]]\nurl = \"https://a.example\"\ntype = \"cosmetic\"\n")
            .unwrap_err();
        assert!(matches!(err, AdRulesError::TomlParse(_)));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = CustomConfigBuilder::new().max_workers(0).build();
        assert!(matches!(config.validate(), Err(AdRulesError::Config(_))));
    }

    #[test]
    fn builder_round_trips_through_toml() {
        let config = ConfigManager::custom()
            .output_dir("dist")
            .retries(0)
            .source(SourceConfig::new("https://a.example.org/list.txt", DeclaredType::Dns).named("a"))
            .source_list("white.txt", DeclaredType::Whitelist)
            .build();
        let reparsed = GlobalConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn bundled_sample_is_valid() {
        let config = GlobalConfig::from_toml(include_str!("../adrules.sample.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.sources.len(), 4);
        assert!(config.source_lists.is_empty());
    }

    #[test]
    fn load_rebases_list_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adrules.toml");
        std::fs::write(&path, "[source_lists]\nwhite = \"lists/white.txt\"\n").unwrap();
        let config = GlobalConfig::load(&path).unwrap();
        assert_eq!(config.source_lists.white, Some(dir.path().join("lists/white.txt")));
    }
}
