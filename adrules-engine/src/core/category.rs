//! 规则用途分类（关键字启发式），只用于统计直方图
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::enums::RuleKind;
use super::rule::CanonicalRule;

static ANALYTICS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"analytics|gtag|ga\.js|metrics|telemetry").unwrap());
static MALWARE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"malware|phishing|scam|malicious").unwrap());
static ANNOYANCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"annoyance|cookie|gdpr|consent").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    ElementHiding,
    PopupBlocking,
    AnalyticsBlocking,
    MalwareBlocking,
    AnnoyanceBlocking,
    UrlBlocking,
}

impl RuleCategory {
    /// 判定顺序与优先级一致：元素隐藏 > 弹窗 > 统计 > 恶意 > 骚扰 > 其它
    pub fn classify(rule: &CanonicalRule) -> Self {
        if rule.pattern.is_cosmetic() {
            return RuleCategory::ElementHiding;
        }
        let text = rule.pattern.as_domain().unwrap_or_default();
        if rule.kind == RuleKind::PopupBlock || text.contains("popup") {
            RuleCategory::PopupBlocking
        } else if ANALYTICS_RE.is_match(text) {
            RuleCategory::AnalyticsBlocking
        } else if MALWARE_RE.is_match(text) {
            RuleCategory::MalwareBlocking
        } else if ANNOYANCE_RE.is_match(text) {
            RuleCategory::AnnoyanceBlocking
        } else {
            RuleCategory::UrlBlocking
        }
    }
}

/// 规则用途直方图，序列化进 stats.json
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTypeStats {
    pub element_hiding: u64,
    pub url_blocking: u64,
    pub popup_blocking: u64,
    pub analytics_blocking: u64,
    pub malware_blocking: u64,
    pub annoyance_blocking: u64,
}

impl RuleTypeStats {
    pub fn record(&mut self, category: RuleCategory) {
        let slot = match category {
            RuleCategory::ElementHiding => &mut self.element_hiding,
            RuleCategory::PopupBlocking => &mut self.popup_blocking,
            RuleCategory::AnalyticsBlocking => &mut self.analytics_blocking,
            RuleCategory::MalwareBlocking => &mut self.malware_blocking,
            RuleCategory::AnnoyanceBlocking => &mut self.annoyance_blocking,
            RuleCategory::UrlBlocking => &mut self.url_blocking,
        };
        *slot += 1;
    }

    pub fn from_rules<'a>(rules: impl IntoIterator<Item = &'a CanonicalRule>) -> Self {
        let mut stats = Self::default();
        for rule in rules {
            stats.record(RuleCategory::classify(rule));
        }
        stats
    }
}
