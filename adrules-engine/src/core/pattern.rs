use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

use super::enums::RuleKind;

/// 规范化模式，去重合并的唯一键
/// 域名已小写、去尾点、punycode 化；元素隐藏规则的域名列表同样规范化
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pattern {
    /// 域名级规则
    Domain(String),
    /// 元素隐藏规则，domains 为空表示通用规则
    Cosmetic { domains: String, selector: String },
}

impl Pattern {
    pub fn domain(domain: impl Into<String>) -> Self {
        Pattern::Domain(domain.into())
    }

    pub fn cosmetic(domains: impl Into<String>, selector: impl Into<String>) -> Self {
        Pattern::Cosmetic {
            domains: domains.into(),
            selector: selector.into(),
        }
    }

    /// 域名级模式返回域名
    pub fn as_domain(&self) -> Option<&str> {
        match self {
            Pattern::Domain(d) => Some(d),
            Pattern::Cosmetic { .. } => None,
        }
    }

    pub fn is_cosmetic(&self) -> bool {
        matches!(self, Pattern::Cosmetic { .. })
    }

    /// 按 Adblock 语法渲染单条规则
    pub fn to_adblock(&self, kind: RuleKind) -> String {
        match (self, kind) {
            (Pattern::Domain(d), RuleKind::Allow) => format!("@@||{}^", d),
            (Pattern::Domain(d), RuleKind::PopupBlock) => format!("||{}^$popup", d),
            (Pattern::Domain(d), _) => format!("||{}^", d),
            (Pattern::Cosmetic { domains, selector }, RuleKind::Allow) => {
                format!("{}#@#{}", domains, selector)
            }
            (Pattern::Cosmetic { domains, selector }, _) => format!("{}##{}", domains, selector),
        }
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Domain(d) => f.write_str(d),
            Pattern::Cosmetic { domains, selector } => write!(f, "{}##{}", domains, selector),
        }
    }
}
