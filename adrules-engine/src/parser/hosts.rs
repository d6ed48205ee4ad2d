//! Hosts 文件语法
//! ```text
//! 0.0.0.0 ads.example.com
//! 127.0.0.1 tracker.example.com  # inline comment
//! ```
//! 只有黑洞地址（0.0.0.0 / 127.x / :: / ::1）视为拦截，其它地址是重定向，不支持。
//! 每行只取第一个主机名；不带 IP 的裸域名行同样接受。
use std::net::IpAddr;

use super::domain::normalize_domain;
use super::{strip_inline_comment, LineOutcome};
use crate::core::{ParsedRule, Pattern, RuleKind};
use crate::error::RuleParseError;

/// 解析单行（已 trim、非空）
pub fn parse_line(line: &str) -> LineOutcome {
    let line = strip_inline_comment(line);
    let mut tokens = line.split_whitespace();
    let Some(first) = tokens.next() else {
        return LineOutcome::Skipped;
    };

    let host = match first.parse::<IpAddr>() {
        Ok(ip) => {
            if !is_sink_address(&ip) {
                return LineOutcome::Unsupported("redirect address");
            }
            match tokens.next() {
                Some(host) => host,
                None => return LineOutcome::Invalid(RuleParseError::MalformedHosts(line.to_string())),
            }
        }
        Err(_) if tokens.next().is_none() => first,
        Err(_) => return LineOutcome::Invalid(RuleParseError::MalformedHosts(line.to_string())),
    };

    match normalize_domain(host) {
        Ok(domain) => LineOutcome::Rule(ParsedRule::new(Pattern::Domain(domain), RuleKind::Block)),
        Err(reject) => reject.into(),
    }
}

#[inline]
fn is_sink_address(ip: &IpAddr) -> bool {
    ip.is_unspecified() || ip.is_loopback()
}
