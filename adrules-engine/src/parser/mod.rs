//! 规则解析与规范化
//! 按规则源的声明类型选择语法（不做运行时嗅探），逐行产出 0 或 1 条规范化规则
pub mod adblock;
pub mod domain;
pub mod hosts;
pub mod parse_stats;
pub mod plain;

use std::time::Instant;

use crate::core::{DeclaredType, ParsedRule, RawRule, RuleKind, SourceId};
use crate::error::RuleParseError;
use crate::utils::preview_compact;
use domain::DomainReject;

pub use parse_stats::ParseStats;

/// 单行长度上限，超出视为无效
pub const MAX_RULE_LEN: usize = 2000;

/// 单行解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// 规范化规则
    Rule(ParsedRule),
    /// 空行 / 注释 / 列表头
    Skipped,
    /// 语法有效但无法在目标格式中表达
    Unsupported(&'static str),
    /// 语法无效
    Invalid(RuleParseError),
}

impl From<DomainReject> for LineOutcome {
    fn from(reject: DomainReject) -> Self {
        match reject {
            DomainReject::Reserved => LineOutcome::Unsupported("reserved host name"),
            DomainReject::IpLiteral => LineOutcome::Unsupported("ip literal"),
            DomainReject::Invalid(e) => LineOutcome::Invalid(e),
        }
    }
}

/// 规则语法（带标签的变体，每种语法有独立的解析函数）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSyntax {
    Adblock,
    Hosts,
    PlainDomain,
}

impl RuleSyntax {
    /// 由声明类型决定语法
    pub fn for_type(declared: DeclaredType) -> Self {
        match declared {
            DeclaredType::Blacklist | DeclaredType::Whitelist => RuleSyntax::Adblock,
            DeclaredType::Dns => RuleSyntax::PlainDomain,
            DeclaredType::Hosts => RuleSyntax::Hosts,
        }
    }

    /// 解析已去除首尾空白的非空行
    fn parse_trimmed(self, line: &str) -> LineOutcome {
        match self {
            RuleSyntax::Adblock => adblock::parse_line(line),
            RuleSyntax::Hosts => hosts::parse_line(line),
            RuleSyntax::PlainDomain => plain::parse_line(line),
        }
    }
}

/// 一个规则源全部内容的解析结果
#[derive(Debug, Clone)]
pub struct ParsedBatch {
    pub source: SourceId,
    pub rules: Vec<ParsedRule>,
    pub stats: ParseStats,
}

/// 规则解析器：绑定声明类型
#[derive(Debug, Clone, Copy)]
pub struct RuleParser {
    declared: DeclaredType,
    syntax: RuleSyntax,
}

impl RuleParser {
    pub fn for_type(declared: DeclaredType) -> Self {
        Self {
            declared,
            syntax: RuleSyntax::for_type(declared),
        }
    }

    pub fn syntax(&self) -> RuleSyntax {
        self.syntax
    }

    /// 解析单行
    /// 白名单源产出的所有规则一律视为放行
    pub fn parse_line(&self, line: &str) -> LineOutcome {
        let line = line.trim();
        if line.is_empty() {
            return LineOutcome::Skipped;
        }
        let len = line.chars().count();
        if len > MAX_RULE_LEN {
            return LineOutcome::Invalid(RuleParseError::TooLong { len });
        }

        match self.syntax.parse_trimmed(line) {
            LineOutcome::Rule(rule) if self.declared == DeclaredType::Whitelist => {
                LineOutcome::Rule(ParsedRule::new(rule.pattern, RuleKind::Allow))
            }
            other => other,
        }
    }

    /// 解析带来源标记的原始行
    pub fn parse_raw(&self, raw: RawRule<'_>) -> LineOutcome {
        self.parse_line(raw.line)
    }

    /// 解析一个规则源的全部内容
    pub fn parse_content(&self, label: &str, source: SourceId, content: &str) -> ParsedBatch {
        let start = Instant::now();
        let mut batch = ParsedBatch {
            source,
            rules: Vec::new(),
            stats: ParseStats::default(),
        };

        for line in content.lines() {
            let outcome = self.parse_raw(RawRule { line, source });
            batch.stats.record(&outcome);
            match outcome {
                LineOutcome::Rule(rule) => batch.rules.push(rule),
                LineOutcome::Invalid(e) => {
                    log::trace!("[{}] invalid rule `{}`: {}", label, preview_compact(line, 80), e);
                }
                LineOutcome::Unsupported(reason) => {
                    log::trace!("[{}] unsupported rule `{}`: {}", label, preview_compact(line, 80), reason);
                }
                LineOutcome::Skipped => {}
            }
        }

        batch.stats.print_stats(label, start.elapsed());
        batch
    }
}

/// 去掉行内 `#` 注释（hosts / 纯域名格式）
pub(crate) fn strip_inline_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => line[..idx].trim_end(),
        None => line,
    }
}
