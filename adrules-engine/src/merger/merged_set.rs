//! 去重合并后的规则集合
//! 以规范化模式为键；重复插入只合并来源并按优先级解析类型
use rustc_hash::FxHashMap;

use crate::core::{CanonicalRule, ParsedRule, Pattern, RuleKind, SourceId};

/// 单次插入的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// 新模式
    Inserted,
    /// 已存在的模式，kind_changed 表示类型是否被更高优先级覆盖
    Duplicate { kind_changed: bool },
}

/// 合并规则集
/// 不变量：同一模式只有一条；放行一旦出现即永久生效
#[derive(Debug, Default, Clone)]
pub struct MergedRuleSet {
    rules: FxHashMap<Pattern, CanonicalRule>,
    duplicates_removed: u64,
}

impl MergedRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rules: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            duplicates_removed: 0,
        }
    }

    /// 插入一条规则
    /// 已存在时：追加来源、按优先级合并类型、重复计数 +1（无论类型是否变化）
    pub fn insert(&mut self, rule: ParsedRule, source: SourceId) -> InsertOutcome {
        match self.rules.get_mut(&rule.pattern) {
            Some(existing) => {
                existing.origin_sources.insert(source);
                let resolved = existing.kind.resolve(rule.kind);
                let kind_changed = resolved != existing.kind;
                existing.kind = resolved;
                self.duplicates_removed += 1;
                InsertOutcome::Duplicate { kind_changed }
            }
            None => {
                self.rules
                    .insert(rule.pattern.clone(), CanonicalRule::new(rule, source));
                InsertOutcome::Inserted
            }
        }
    }

    /// 批量插入同一来源的规则
    pub fn extend(&mut self, rules: impl IntoIterator<Item = ParsedRule>, source: SourceId) {
        for rule in rules {
            self.insert(rule, source);
        }
    }

    pub fn get(&self, pattern: &Pattern) -> Option<&CanonicalRule> {
        self.rules.get(pattern)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn duplicates_removed(&self) -> u64 {
        self.duplicates_removed
    }

    pub fn count_kind(&self, kind: RuleKind) -> u64 {
        self.rules.values().filter(|r| r.kind == kind).count() as u64
    }

    /// 无序遍历
    pub fn iter(&self) -> impl Iterator<Item = &CanonicalRule> {
        self.rules.values()
    }

    /// 按模式排序后的指定类型规则（产物输出用）
    pub fn sorted_by_kind(&self, kind: RuleKind) -> Vec<&CanonicalRule> {
        let mut rules: Vec<_> = self.rules.values().filter(|r| r.kind == kind).collect();
        rules.sort_unstable_by(|a, b| a.pattern.cmp(&b.pattern));
        rules
    }

    pub(crate) fn rules_mut(&mut self) -> impl Iterator<Item = &mut CanonicalRule> {
        self.rules.values_mut()
    }
}
