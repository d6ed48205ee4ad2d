// 核心公共结构体+枚举
pub mod core;
// 内核错误
pub mod error;
// 规则解析+规范化（Adblock / Hosts / 纯域名）
pub mod parser;
// 去重合并+冲突解析
pub mod merger;
// 产物渲染
pub mod render;
// 日志辅助
pub mod utils;

// 顶层导出常用类型
pub use core::{
    CanonicalRule, DeclaredType, FetchStatus, MatchMode, OutputOrder, ParsedRule, Pattern,
    RawRule, RuleCategory, RuleKind, RuleTypeStats, RunStats, SourceId, SourceReport,
};
pub use error::{CoreError, CoreResult, RuleParseError};
pub use merger::{ConflictResolver, InsertOutcome, MergedRuleSet};
pub use parser::{LineOutcome, ParseStats, ParsedBatch, RuleParser, RuleSyntax};
pub use render::{Artifact, HeaderInfo, RenderOptions, RenderedArtifact, Renderer};
