//! 规则加载模块
//! 统一导出规则加载相关组件
pub mod etag;
pub mod etag_manager;
pub mod path_manager;
pub mod remote_fetcher;
pub mod remote_source;
pub mod rule_loader;

// 导出 ETag 相关
pub use etag::{ETagRecord, ETagTotalRecord};
pub use etag_manager::{CachedRaw, EtagManager};
pub use path_manager::RulePathManager;
// 导出远程源相关
pub use remote_fetcher::{FetchError, FetchedContent, HttpRuleFetcher, RuleFetcher};
pub use remote_source::{RemoteRuleSource, SourceRegistry};
// 导出加载器
pub use rule_loader::{FetchPolicy, RuleLoader, SourceFetchResult};
