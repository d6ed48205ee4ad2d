//! 远程规则拉取
//! RuleFetcher 只负责单次请求；超时、重试、并发由 RuleLoader 控制

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::FetchOptions;
use crate::error::AdResult;

/// 单个源的拉取失败原因
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("timeout")]
    Timeout,
    #[error("http status {0}")]
    Status(u16),
    #[error("network: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("io: {0}")]
    Io(String),
    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    /// 是否值得重试：超时、连接错误、5xx、429
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::Status(code) => *code == 429 || (500..600).contains(code),
            FetchError::Malformed(_) | FetchError::Io(_) | FetchError::Cancelled => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_decode() || e.is_body() {
            FetchError::Malformed(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// 单次拉取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedContent {
    /// 新内容，附带服务端 ETag（若有）
    Fresh { body: String, etag: Option<String> },
    /// 304，沿用本地缓存
    NotModified,
}

impl FetchedContent {
    pub fn fresh(body: impl Into<String>) -> Self {
        FetchedContent::Fresh {
            body: body.into(),
            etag: None,
        }
    }
}

/// 规则拉取接口
#[async_trait]
pub trait RuleFetcher: Send + Sync {
    /// 拉取 URL；etag 为本地缓存的 ETag，用于条件请求
    async fn fetch(&self, url: &str, etag: Option<&str>) -> Result<FetchedContent, FetchError>;
}

/// 基于 reqwest 的拉取器，同时支持 file:// 本地镜像
#[derive(Debug, Clone)]
pub struct HttpRuleFetcher {
    client: Client,
}

impl HttpRuleFetcher {
    pub fn new(options: &FetchOptions) -> AdResult<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent.clone())
            .connect_timeout(options.timeout())
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_http(&self, url: &str, etag: Option<&str>) -> Result<FetchedContent, FetchError> {
        let mut request = self.client.get(url);
        if let Some(etag) = etag {
            request = request.header(IF_NONE_MATCH, format!("\"{}\"", etag));
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            debug!("Not modified: {}", url);
            return Ok(FetchedContent::NotModified);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("text/html"));
        if is_html {
            return Err(FetchError::Malformed("unexpected text/html body".into()));
        }

        // 清理ETag（移除W/前缀和引号）
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(clean_etag)
            .filter(|v| !v.is_empty());

        let bytes = response.bytes().await?;
        let body = decode_body(bytes.to_vec())?;
        Ok(FetchedContent::Fresh { body, etag })
    }

    async fn fetch_file(&self, url: &Url) -> Result<FetchedContent, FetchError> {
        let path = url
            .to_file_path()
            .map_err(|_| FetchError::Io(format!("invalid file url {}", url)))?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| FetchError::Io(format!("{}: {}", path.display(), e)))?;
        Ok(FetchedContent::Fresh {
            body: decode_body(bytes)?,
            etag: None,
        })
    }
}

#[async_trait]
impl RuleFetcher for HttpRuleFetcher {
    async fn fetch(&self, url: &str, etag: Option<&str>) -> Result<FetchedContent, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::Network(e.to_string()))?;
        if parsed.scheme() == "file" {
            self.fetch_file(&parsed).await
        } else {
            self.fetch_http(url, etag).await
        }
    }
}

/// 规范化 ETag：移除弱校验前缀与引号
pub fn clean_etag(raw: &str) -> String {
    raw.trim().trim_start_matches("W/").trim_matches('"').to_string()
}

/// 非 UTF-8 内容视为异常响应；去掉 BOM
fn decode_body(bytes: Vec<u8>) -> Result<String, FetchError> {
    let mut body = String::from_utf8(bytes)
        .map_err(|e| FetchError::Malformed(format!("body is not valid UTF-8 ({})", e.utf8_error())))?;
    if body.starts_with('\u{feff}') {
        body.drain(..'\u{feff}'.len_utf8());
    }
    Ok(body)
}

/// 重试退避：backoff * 2^(attempt-1)，上限 60 秒
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(Duration::from_secs(60))
}
