//! 全局错误类型定义

use std::io::Error as IoError;
use std::path::PathBuf;

use adrules_engine::CoreError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum AdRulesError {
    // 配置错误（在任何拉取之前致命）
    #[error("配置错误：{0}")]
    Config(String),
    #[error("TOML解析失败：{0}")]
    TomlParse(#[from] toml::de::Error),

    // 产物写入错误（致命）
    #[error("产物写入失败 [{}]：{source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    // 缓存错误（记录日志，不影响本次运行）
    #[error("缓存读写失败：{0}")]
    Cache(String),

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    Http(#[from] reqwest::Error),

    // 内核错误
    #[error(transparent)]
    Core(#[from] CoreError),

    // 基础错误
    #[error("JSON解析失败：{0}")]
    Json(#[from] SerdeJsonError),
    #[error("IO操作失败：{0}")]
    Io(#[from] IoError),
    #[error("URL解析失败：{0}")]
    Url(#[from] UrlParseError),
}

impl AdRulesError {
    pub fn output_write(path: impl Into<PathBuf>, source: IoError) -> Self {
        AdRulesError::OutputWrite {
            path: path.into(),
            source,
        }
    }
}

// 全局Result类型
pub type AdResult<T> = Result<T, AdRulesError>;
