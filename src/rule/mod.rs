//! 规则模块：远程加载 + 运行间快照
pub mod cache;
pub mod loader;

pub use cache::{RuleCacheManager, RuleSnapshot, SnapshotDiff};
pub use loader::{
    EtagManager, FetchError, FetchPolicy, FetchedContent, HttpRuleFetcher, RemoteRuleSource,
    RuleFetcher, RuleLoader, RulePathManager, SourceFetchResult, SourceRegistry,
};
