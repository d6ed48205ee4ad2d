mod category;
mod enums;
mod pattern;
mod rule;
mod stats;

// 导出常用项
pub use category::{RuleCategory, RuleTypeStats};
pub use enums::{DeclaredType, FetchStatus, MatchMode, OutputOrder, RuleKind};
pub use pattern::Pattern;
pub use rule::{CanonicalRule, ParsedRule, RawRule, SourceId};
pub use stats::{RunStats, SourceReport};
