//! Adblock / uBlock 过滤语法
//! 支持：`||domain^`、`@@` 例外、`$popup` 等域名级修饰符、`##` / `#@#` 元素隐藏、裸域名
//! 路径、通配、正则、作用域收窄的修饰符以及扩展语法计为不支持
//! 黑白名单源里混入的 hosts 行（`IP 域名`）交给 hosts 语法处理
use std::net::IpAddr;

use super::domain::{normalize_domain, DomainReject};
use super::LineOutcome;
use crate::core::{ParsedRule, Pattern, RuleKind};
use crate::error::RuleParseError;

/// 元素隐藏类标记，长标记在前
const COSMETIC_MARKERS: &[&str] = &["#@?#", "#@$#", "#@%#", "#@#", "#?#", "#$#", "#%#", "##"];

/// 不改变域名级语义、可以直接剥离的修饰符
const NEUTRAL_MODIFIERS: &[&str] = &["important", "all", "document", "doc"];

/// URL 路径、通配、查询等非域名字符
const NON_DOMAIN_CHARS: &[char] = &['/', '*', ':', '?', '=', '&', '^', '|', '#', '%', '~', '@'];

/// 解析单行（已 trim、非空）
pub fn parse_line(line: &str) -> LineOutcome {
    if is_comment(line) {
        return LineOutcome::Skipped;
    }
    if is_hosts_entry(line) {
        return super::hosts::parse_line(line);
    }
    if let Some((idx, marker)) = find_cosmetic_marker(line) {
        return parse_cosmetic(&line[..idx], marker, &line[idx + marker.len()..]);
    }
    if line.contains("$$") {
        return LineOutcome::Unsupported("html filtering rule");
    }

    match line.strip_prefix("@@") {
        Some(body) => parse_network(body, true),
        None => parse_network(line, false),
    }
}

fn is_comment(line: &str) -> bool {
    if line.starts_with('!') {
        return true;
    }
    if line.starts_with('[') && line.ends_with(']') {
        return true;
    }
    // `#` 注释，但排除以 `#` 开头的通用元素隐藏规则
    line.starts_with('#') && !matches!(line[1..].chars().next(), Some('#' | '@' | '?' | '$' | '%'))
}

/// 首个 token 为 IP 且后面还有主机名
fn is_hosts_entry(line: &str) -> bool {
    let mut tokens = line.split_whitespace();
    matches!(tokens.next(), Some(first) if first.parse::<IpAddr>().is_ok()) && tokens.next().is_some()
}

fn find_cosmetic_marker(line: &str) -> Option<(usize, &'static str)> {
    line.match_indices('#').find_map(|(idx, _)| {
        let rest = &line[idx..];
        COSMETIC_MARKERS
            .iter()
            .find(|marker| rest.starts_with(**marker))
            .map(|marker| (idx, *marker))
    })
}

fn parse_cosmetic(domains: &str, marker: &str, selector: &str) -> LineOutcome {
    let kind = match marker {
        "##" => RuleKind::HideElement,
        "#@#" => RuleKind::Allow,
        _ => return LineOutcome::Unsupported("extended cosmetic or scriptlet rule"),
    };

    let selector = selector.trim();
    if selector.is_empty() {
        return LineOutcome::Invalid(RuleParseError::EmptySelector);
    }
    if selector.starts_with("+js(") || selector.starts_with('^') {
        return LineOutcome::Unsupported("scriptlet or html filter");
    }

    match normalize_domain_list(domains) {
        Ok(domains) => LineOutcome::Rule(ParsedRule::new(Pattern::cosmetic(domains, selector), kind)),
        Err(outcome) => outcome,
    }
}

/// 规范化元素隐藏规则的域名列表：逐项规范化、排序去重，保留 `~` 否定前缀
fn normalize_domain_list(domains: &str) -> Result<String, LineOutcome> {
    let domains = domains.trim();
    if domains.is_empty() {
        return Ok(String::new());
    }

    let mut normalized = Vec::new();
    for entry in domains.split(',') {
        let entry = entry.trim();
        let (negated, name) = match entry.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, entry),
        };
        if name.contains('*') {
            return Err(LineOutcome::Unsupported("wildcard cosmetic domain"));
        }
        let name = normalize_domain(name).map_err(LineOutcome::from)?;
        normalized.push(if negated { format!("~{}", name) } else { name });
    }
    normalized.sort_unstable();
    normalized.dedup();
    Ok(normalized.join(","))
}

fn parse_network(body: &str, exception: bool) -> LineOutcome {
    if body.is_empty() {
        return LineOutcome::Invalid(RuleParseError::Malformed("empty exception rule".into()));
    }
    if body.len() > 1 && body.starts_with('/') && body.ends_with('/') {
        return LineOutcome::Unsupported("regex rule");
    }

    let (pattern, modifiers) = match body.rfind('$') {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };

    let mut popup = false;
    if let Some(modifiers) = modifiers {
        for modifier in modifiers.split(',') {
            let modifier = modifier.trim().to_ascii_lowercase();
            match modifier.as_str() {
                "" => {}
                "popup" => popup = true,
                m if NEUTRAL_MODIFIERS.contains(&m) => {}
                _ => return LineOutcome::Unsupported("scope-narrowing modifier"),
            }
        }
    }

    let (candidate, anchored) = if let Some(rest) = pattern.strip_prefix("||") {
        let rest = rest.strip_suffix('|').unwrap_or(rest);
        (rest.strip_suffix('^').unwrap_or(rest), true)
    } else if pattern.starts_with('|') {
        return LineOutcome::Unsupported("url anchor rule");
    } else {
        (pattern.strip_prefix("*.").unwrap_or(pattern), false)
    };

    if candidate.is_empty() {
        return LineOutcome::Invalid(RuleParseError::Malformed("empty pattern".into()));
    }
    if candidate.contains(NON_DOMAIN_CHARS) {
        return LineOutcome::Unsupported("path or wildcard rule");
    }

    let domain = match normalize_domain(candidate) {
        Ok(d) => d,
        // 裸模式在 Adblock 里是合法的 URL 子串规则，只是无法降为域名
        Err(DomainReject::Invalid(_)) if !anchored => {
            return LineOutcome::Unsupported("url substring rule")
        }
        Err(reject) => return reject.into(),
    };

    let kind = if exception {
        RuleKind::Allow
    } else if popup {
        RuleKind::PopupBlock
    } else {
        RuleKind::Block
    };
    LineOutcome::Rule(ParsedRule::new(Pattern::Domain(domain), kind))
}
