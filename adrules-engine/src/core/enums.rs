use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// 规则源声明类型，决定该源内容按哪种语法解析
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Blacklist,
    Whitelist,
    Dns,
    Hosts,
}

impl DeclaredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredType::Blacklist => "blacklist",
            DeclaredType::Whitelist => "whitelist",
            DeclaredType::Dns => "dns",
            DeclaredType::Hosts => "hosts",
        }
    }
}

impl Display for DeclaredType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeclaredType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blacklist" | "black" => Ok(DeclaredType::Blacklist),
            "whitelist" | "white" => Ok(DeclaredType::Whitelist),
            "dns" | "domains" => Ok(DeclaredType::Dns),
            "hosts" => Ok(DeclaredType::Hosts),
            other => Err(format!("unknown source type: {}", other)),
        }
    }
}

/// 规则类型
/// 冲突优先级：Allow > Block > HideElement > PopupBlock
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Allow,
    Block,
    HideElement,
    PopupBlock,
}

impl RuleKind {
    /// 冲突优先级，数值越大越优先
    #[inline]
    pub fn precedence(self) -> u8 {
        match self {
            RuleKind::Allow => 3,
            RuleKind::Block => 2,
            RuleKind::HideElement => 1,
            RuleKind::PopupBlock => 0,
        }
    }

    /// 两种类型合并后的最终类型
    #[inline]
    pub fn resolve(self, other: RuleKind) -> RuleKind {
        if other.precedence() > self.precedence() {
            other
        } else {
            self
        }
    }

    pub fn is_blocking(self) -> bool {
        !matches!(self, RuleKind::Allow)
    }
}

impl Display for RuleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::Allow => write!(f, "allow"),
            RuleKind::Block => write!(f, "block"),
            RuleKind::HideElement => write!(f, "hide_element"),
            RuleKind::PopupBlock => write!(f, "popup_block"),
        }
    }
}

/// 子域名匹配模式
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// 精确键匹配，子域名互不影响
    Exact,
    /// 父域名被放行时，其子域名的拦截规则一并放行
    #[default]
    Hierarchical,
}

/// Adblock 产物中黑白名单段落的先后顺序
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputOrder {
    #[default]
    WhitelistFirst,
    BlacklistFirst,
}

/// 规则源拉取状态
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    #[default]
    Pending,
    Success,
    Failed,
}
