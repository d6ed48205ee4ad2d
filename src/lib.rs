//! adrules - 多源广告过滤规则聚合
//! 拉取规则源 → 解析规范化 → 去重合并、黑白名单冲突解析 → 输出 Adblock / DNS / Hosts 等产物

// 导出全局错误类型
pub use self::error::{AdResult, AdRulesError};

// 导出配置模块
pub use self::config::{
    ConfigManager, CustomConfigBuilder, FetchOptions, GlobalConfig, OutputOptions, SourceConfig,
    SourceListFiles,
};

// 导出规则模块核心接口
pub use self::rule::{
    FetchError, FetchPolicy, FetchedContent, HttpRuleFetcher, RemoteRuleSource, RuleCacheManager,
    RuleFetcher, RuleLoader, RuleSnapshot, SourceRegistry,
};

// 导出编排与输出
pub use self::emitter::ArtifactEmitter;
pub use self::pipeline::{Pipeline, RunReport};

// 内核类型
pub use adrules_engine as engine;

// 声明所有子模块
pub mod config;
pub mod emitter;
pub mod error;
pub mod pipeline;
pub mod rule;
