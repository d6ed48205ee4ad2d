//! 子域名冲突解析：在全部插入完成后执行一次
use rustc_hash::FxHashSet;

use super::merged_set::MergedRuleSet;
use crate::core::{MatchMode, Pattern, RuleKind};
use crate::parser::domain::parent_domains;

/// 冲突解析器
#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictResolver {
    mode: MatchMode,
}

impl ConflictResolver {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    /// 按匹配模式完成最终解析
    /// Hierarchical：父域名被放行时，子域名的域名级拦截规则改为放行
    /// 返回：被改为放行的条目数
    pub fn finalize(&self, set: &mut MergedRuleSet) -> u64 {
        if self.mode == MatchMode::Exact {
            return 0;
        }

        let allowed: FxHashSet<String> = set
            .iter()
            .filter(|r| r.kind == RuleKind::Allow)
            .filter_map(|r| r.pattern.as_domain().map(str::to_string))
            .collect();
        if allowed.is_empty() {
            return 0;
        }

        let mut covered = 0;
        for rule in set.rules_mut() {
            if !matches!(rule.kind, RuleKind::Block | RuleKind::PopupBlock) {
                continue;
            }
            let Pattern::Domain(domain) = &rule.pattern else {
                continue;
            };
            if parent_domains(domain).any(|parent| allowed.contains(parent)) {
                rule.kind = RuleKind::Allow;
                covered += 1;
            }
        }

        if covered > 0 {
            log::debug!("Whitelist covered {} subdomain rules", covered);
        }
        covered
    }
}
