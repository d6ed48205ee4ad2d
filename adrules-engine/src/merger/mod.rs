//! 去重与冲突解析
pub mod merged_set;
pub mod resolver;

pub use merged_set::{InsertOutcome, MergedRuleSet};
pub use resolver::ConflictResolver;
