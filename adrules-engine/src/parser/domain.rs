//! 域名规范化与合法性校验
//! 小写、去尾点、IDNA 转 punycode，逐标签校验
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::IpAddr;
use url::Host;

use crate::error::RuleParseError;

/// 单个域名标签：字母数字开头结尾，中间允许连字符
static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").unwrap());

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// 系统保留主机名，出现在 hosts 文件头部，不是可拦截目标
const RESERVED_NAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "local",
    "broadcasthost",
    "ip6-localhost",
    "ip6-loopback",
    "ip6-localnet",
    "ip6-mcastprefix",
    "ip6-allnodes",
    "ip6-allrouters",
    "ip6-allhosts",
];

/// 域名被拒绝的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainReject {
    /// 保留主机名（localhost 等）
    Reserved,
    /// IP 字面量，不是域名
    IpLiteral,
    /// 语法不合法
    Invalid(RuleParseError),
}

fn invalid(raw: &str) -> DomainReject {
    DomainReject::Invalid(RuleParseError::InvalidDomain(raw.to_string()))
}

/// 规范化域名
/// 返回：小写 ASCII（punycode）域名 | 拒绝原因
pub fn normalize_domain(raw: &str) -> Result<String, DomainReject> {
    let trimmed = raw.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(invalid(raw));
    }
    if trimmed.parse::<IpAddr>().is_ok() {
        return Err(DomainReject::IpLiteral);
    }

    let domain = if trimmed.is_ascii() {
        trimmed.to_ascii_lowercase()
    } else {
        // 非 ASCII 域名走 IDNA 转换
        match Host::parse(trimmed) {
            Ok(Host::Domain(d)) => d,
            Ok(_) => return Err(DomainReject::IpLiteral),
            Err(_) => return Err(invalid(raw)),
        }
    };

    if RESERVED_NAMES.contains(&domain.as_str()) {
        return Err(DomainReject::Reserved);
    }
    if is_valid_domain(&domain) {
        Ok(domain)
    } else {
        Err(invalid(raw))
    }
}

/// 校验已小写的 ASCII 域名
/// 要求：至少两级、总长 ≤ 253、每个标签 1..=63 且符合 LABEL_RE
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.len() < 3 || domain.len() > MAX_DOMAIN_LEN || !domain.contains('.') {
        return false;
    }
    domain
        .split('.')
        .all(|label| !label.is_empty() && label.len() <= MAX_LABEL_LEN && LABEL_RE.is_match(label))
}

/// 逐级列出父域名（不含自身，不含顶级域）
/// a.b.example.com → b.example.com, example.com
pub fn parent_domains(domain: &str) -> impl Iterator<Item = &str> {
    domain
        .match_indices('.')
        .map(move |(idx, _)| &domain[idx + 1..])
        .filter(|parent| parent.contains('.'))
}
