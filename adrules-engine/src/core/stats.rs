//! 运行统计：每次运行生成一份，发布为 stats.json
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::RuleTypeStats;
use super::enums::{DeclaredType, FetchStatus};
use crate::error::CoreResult;

/// 单个规则源的拉取结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub name: String,
    pub url: String,
    pub declared_type: DeclaredType,
    pub status: FetchStatus,
    /// 该源贡献的有效规则数（失败为 0）
    pub rule_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// 一次运行的统计结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// 版本号（YYYYMMDD）
    pub version: String,
    pub generated_at: DateTime<Utc>,

    // ========== 规则源 ==========
    pub sources_total: u64,
    pub sources_succeeded: u64,
    pub sources_failed: u64,

    // ========== 解析 ==========
    /// 非空、非注释的原始规则行数
    pub raw_rule_count: u64,
    /// 解析成功并进入合并阶段的规则数
    pub accepted_rule_count: u64,
    pub invalid_rule_count: u64,
    pub unsupported_rule_count: u64,

    // ========== 合并 ==========
    pub duplicates_removed: u64,
    /// 父域名被放行而转为放行的子域名条目数
    pub covered_by_parent: u64,

    // ========== 最终产物 ==========
    pub final_block_count: u64,
    pub final_allow_count: u64,
    pub final_hide_element_count: u64,
    pub final_popup_count: u64,
    pub rule_types: RuleTypeStats,

    // ========== 与上次运行对比 ==========
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_since_last_run: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_since_last_run: Option<u64>,

    pub sources: Vec<SourceReport>,
}

impl RunStats {
    /// 以生成时间初始化空统计
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self {
            version: generated_at.format("%Y%m%d").to_string(),
            generated_at,
            sources_total: 0,
            sources_succeeded: 0,
            sources_failed: 0,
            raw_rule_count: 0,
            accepted_rule_count: 0,
            invalid_rule_count: 0,
            unsupported_rule_count: 0,
            duplicates_removed: 0,
            covered_by_parent: 0,
            final_block_count: 0,
            final_allow_count: 0,
            final_hide_element_count: 0,
            final_popup_count: 0,
            rule_types: RuleTypeStats::default(),
            added_since_last_run: None,
            removed_since_last_run: None,
            sources: Vec::new(),
        }
    }

    /// 根据源报告汇总源计数
    pub fn set_sources(&mut self, sources: Vec<SourceReport>) {
        self.sources_total = sources.len() as u64;
        self.sources_succeeded = sources
            .iter()
            .filter(|s| s.status == FetchStatus::Success)
            .count() as u64;
        self.sources_failed = self.sources_total - self.sources_succeeded;
        self.sources = sources;
    }

    pub fn to_json_pretty(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 结构化日志输出
    pub fn print_stats(&self) {
        log::info!(
            "Sources: total {} | succeeded {} | failed {}",
            self.sources_total,
            self.sources_succeeded,
            self.sources_failed
        );
        log::info!(
            "Rules: raw {} | accepted {} | invalid {} | unsupported {} | duplicates removed {}",
            self.raw_rule_count,
            self.accepted_rule_count,
            self.invalid_rule_count,
            self.unsupported_rule_count,
            self.duplicates_removed
        );
        log::info!(
            "Output: block {} | allow {} | hide {} | popup {} | covered by parent {}",
            self.final_block_count,
            self.final_allow_count,
            self.final_hide_element_count,
            self.final_popup_count,
            self.covered_by_parent
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report(status: FetchStatus) -> SourceReport {
        SourceReport {
            name: "s".into(),
            url: "https://example.com/list.txt".into(),
            declared_type: DeclaredType::Blacklist,
            status,
            rule_count: 0,
            failure_reason: None,
        }
    }

    #[test]
    fn version_is_date_of_generation() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 2, 0, 0).unwrap();
        assert_eq!(RunStats::new(at).version, "20260307");
    }

    #[test]
    fn source_counters_follow_reports() {
        let mut stats = RunStats::new(Utc::now());
        stats.set_sources(vec![
            report(FetchStatus::Success),
            report(FetchStatus::Failed),
            report(FetchStatus::Success),
        ]);
        assert_eq!(stats.sources_total, 3);
        assert_eq!(stats.sources_succeeded, 2);
        assert_eq!(stats.sources_failed, 1);
    }

    #[test]
    fn json_carries_spec_fields() {
        let stats = RunStats::new(Utc::now());
        let value: serde_json::Value = serde_json::from_str(&stats.to_json_pretty().unwrap()).unwrap();
        for key in [
            "sources_total",
            "sources_succeeded",
            "sources_failed",
            "raw_rule_count",
            "duplicates_removed",
            "final_block_count",
            "final_allow_count",
            "generated_at",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert!(value.get("added_since_last_run").is_none());
    }
}
