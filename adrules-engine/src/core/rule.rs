use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::enums::RuleKind;
use super::pattern::Pattern;

/// 规则源在注册表中的下标，用于溯源（避免每条规则克隆 URL）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl SourceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 规则源中的一行原始文本
#[derive(Debug, Clone, Copy)]
pub struct RawRule<'a> {
    pub line: &'a str,
    pub source: SourceId,
}

/// 单行解析结果（尚未合并）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedRule {
    pub pattern: Pattern,
    pub kind: RuleKind,
}

impl ParsedRule {
    pub fn new(pattern: Pattern, kind: RuleKind) -> Self {
        Self { pattern, kind }
    }

    pub fn block(domain: impl Into<String>) -> Self {
        Self::new(Pattern::domain(domain), RuleKind::Block)
    }

    pub fn allow(domain: impl Into<String>) -> Self {
        Self::new(Pattern::domain(domain), RuleKind::Allow)
    }
}

/// 合并后的规范化规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRule {
    pub pattern: Pattern,
    pub kind: RuleKind,
    /// 所有贡献过该模式的规则源
    pub origin_sources: BTreeSet<SourceId>,
}

impl CanonicalRule {
    pub fn new(parsed: ParsedRule, source: SourceId) -> Self {
        let mut origin_sources = BTreeSet::new();
        origin_sources.insert(source);
        Self {
            pattern: parsed.pattern,
            kind: parsed.kind,
            origin_sources,
        }
    }

    pub fn to_adblock(&self) -> String {
        self.pattern.to_adblock(self.kind)
    }
}
