//! adrules-engine 内核错误定义
//! 行级解析错误与内核级错误分离：前者只计数不传播，后者向调用方返回
use thiserror::Error;

use serde_json::Error as SerdeJsonError;

/// 单行规则解析错误
/// 解析器遇到语法无效的行时返回，调用方只计数丢弃，从不中断整个批次
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleParseError {
    /// 超长规则（原始行长度超过上限）
    #[error("Rule too long: {len} chars")]
    TooLong { len: usize },

    /// 域名不合法（标签字符/长度/层级不满足要求）
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// 元素隐藏规则缺少选择器
    #[error("Empty element-hiding selector")]
    EmptySelector,

    /// Hosts 行格式错误（缺少主机名等）
    #[error("Malformed hosts line: {0}")]
    MalformedHosts(String),

    /// 其它无法识别的语法
    #[error("Malformed rule: {0}")]
    Malformed(String),
}

/// 内核核心错误枚举
#[derive(Error, Debug)]
pub enum CoreError {
    /// 无效输入参数
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 统计信息序列化失败
    #[error("Stats serialization failed: {0}")]
    StatsSerialize(#[from] SerdeJsonError),
}

/// 内核层全局Result类型别名
pub type CoreResult<T> = Result<T, CoreError>;
