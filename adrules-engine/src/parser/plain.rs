//! 纯域名列表：每行一个域名，支持 `*.` 与 `.` 前缀、`#` / `!` 注释
use super::domain::normalize_domain;
use super::{strip_inline_comment, LineOutcome};
use crate::core::{ParsedRule, Pattern, RuleKind};
use crate::error::RuleParseError;

/// 解析单行（已 trim、非空）
pub fn parse_line(line: &str) -> LineOutcome {
    if line.starts_with('!') {
        return LineOutcome::Skipped;
    }
    let line = strip_inline_comment(line);
    if line.is_empty() {
        return LineOutcome::Skipped;
    }
    if line.contains(char::is_whitespace) {
        return LineOutcome::Invalid(RuleParseError::Malformed(line.to_string()));
    }

    let candidate = line
        .strip_prefix("*.")
        .or_else(|| line.strip_prefix('.'))
        .unwrap_or(line);

    match normalize_domain(candidate) {
        Ok(domain) => LineOutcome::Rule(ParsedRule::new(Pattern::Domain(domain), RuleKind::Block)),
        Err(reject) => reject.into(),
    }
}
