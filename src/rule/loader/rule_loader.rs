//! 并发规则拉取
//! 每个源一个任务，信号量限制并发；每次尝试独立超时；整次运行有总预算
//! 完成的结果经有界队列交给唯一的合并消费者

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use adrules_engine::SourceId;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::FetchOptions;
use crate::rule::loader::etag_manager::EtagManager;
use crate::rule::loader::remote_fetcher::{backoff_delay, FetchError, FetchedContent, RuleFetcher};
use crate::rule::loader::remote_source::RemoteRuleSource;

/// 拉取策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub max_workers: usize,
    pub timeout: Duration,
    pub retries: u32,
    pub backoff: Duration,
    pub run_budget: Duration,
}

impl From<&FetchOptions> for FetchPolicy {
    fn from(options: &FetchOptions) -> Self {
        Self {
            max_workers: options.max_workers.max(1),
            timeout: options.timeout(),
            retries: options.retries,
            backoff: options.backoff(),
            run_budget: options.run_budget(),
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from(&FetchOptions::default())
    }
}

/// 单个源的拉取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFetchResult {
    pub id: SourceId,
    pub outcome: Result<String, FetchError>,
    /// 实际尝试次数（被取消的源为 0）
    pub attempts: u32,
    /// 内容来自本地缓存（304）
    pub from_cache: bool,
}

impl SourceFetchResult {
    fn cancelled(id: SourceId) -> Self {
        Self {
            id,
            outcome: Err(FetchError::Cancelled),
            attempts: 0,
            from_cache: false,
        }
    }
}

#[derive(Clone)]
pub struct RuleLoader {
    fetcher: Arc<dyn RuleFetcher>,
    policy: FetchPolicy,
    etag_manager: Option<Arc<EtagManager>>,
}

impl RuleLoader {
    pub fn new(fetcher: Arc<dyn RuleFetcher>, policy: FetchPolicy) -> Self {
        Self {
            fetcher,
            policy,
            etag_manager: None,
        }
    }

    pub fn with_etag_manager(mut self, etag_manager: Option<Arc<EtagManager>>) -> Self {
        self.etag_manager = etag_manager;
        self
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// 启动拉取，返回结果接收端
    /// 每个源恰好产生一条结果；预算耗尽时未完成的源以 cancelled 结束
    pub fn spawn(&self, sources: Vec<RemoteRuleSource>) -> mpsc::Receiver<SourceFetchResult> {
        let (tx, rx) = mpsc::channel(self.policy.max_workers.max(1));
        let loader = self.clone();
        tokio::spawn(async move { loader.supervise(sources, tx).await });
        rx
    }

    async fn supervise(self, sources: Vec<RemoteRuleSource>, tx: mpsc::Sender<SourceFetchResult>) {
        let deadline = Instant::now() + self.policy.run_budget;
        let semaphore = Arc::new(Semaphore::new(self.policy.max_workers.max(1)));
        let mut pending: BTreeSet<SourceId> = sources.iter().map(|s| s.id).collect();
        let mut tasks = JoinSet::new();

        info!(
            "Fetching {} sources (workers {}, timeout {:?}, retries {})",
            sources.len(),
            self.policy.max_workers,
            self.policy.timeout,
            self.policy.retries
        );

        for source in sources {
            let loader = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return SourceFetchResult::cancelled(source.id);
                };
                loader.fetch_source(&source).await
            });
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(result))) => {
                    pending.remove(&result.id);
                    if tx.send(result).await.is_err() {
                        debug!("Result receiver dropped, aborting fetch tasks");
                        tasks.abort_all();
                        return;
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!("Fetch task failed: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Run budget of {:?} exhausted, cancelling {} outstanding sources",
                        self.policy.run_budget,
                        pending.len()
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        for id in pending {
            if tx.send(SourceFetchResult::cancelled(id)).await.is_err() {
                return;
            }
        }
    }

    /// 拉取单个源：条件请求 + 超时 + 对瞬时错误指数退避重试
    async fn fetch_source(&self, source: &RemoteRuleSource) -> SourceFetchResult {
        let cached = match &self.etag_manager {
            Some(manager) => manager.cached_content(source).await,
            None => None,
        };
        let etag = cached.as_ref().map(|c| c.etag.as_str());

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.policy.timeout, self.fetcher.fetch(&source.raw_url, etag)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout),
            };

            let e = match result {
                Ok(FetchedContent::Fresh { body, etag }) => {
                    if let Some(manager) = &self.etag_manager {
                        let cached = match etag.as_deref() {
                            Some(etag) => manager.store(source, etag, &body).await,
                            None => manager.forget(source).await,
                        };
                        if let Err(e) = cached {
                            warn!("[{}] failed to update raw content cache: {}", source.name, e);
                        }
                    }
                    debug!("[{}] fetched {} bytes (attempt {})", source.name, body.len(), attempt);
                    return self.finish(source, Ok(body), attempt, false);
                }
                Ok(FetchedContent::NotModified) => match &cached {
                    Some(cached) => {
                        debug!("[{}] not modified, reusing cached content", source.name);
                        return self.finish(source, Ok(cached.body.clone()), attempt, true);
                    }
                    None => FetchError::Malformed("304 without cached content".into()),
                },
                Err(e) => e,
            };

            if e.is_transient() && attempt <= self.policy.retries {
                let delay = backoff_delay(self.policy.backoff, attempt);
                warn!(
                    "[{}] request failed ({}), retrying in {:?} (attempt {}/{})",
                    source.name,
                    e,
                    delay,
                    attempt,
                    self.policy.retries + 1
                );
                tokio::time::sleep(delay).await;
                continue;
            }
            return self.finish(source, Err(e), attempt, false);
        }
    }

    fn finish(
        &self,
        source: &RemoteRuleSource,
        outcome: Result<String, FetchError>,
        attempts: u32,
        from_cache: bool,
    ) -> SourceFetchResult {
        if let Err(e) = &outcome {
            warn!("[{}] fetch failed after {} attempts: {}", source.name, attempts, e);
        }
        SourceFetchResult {
            id: source.id,
            outcome,
            attempts,
            from_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::loader::path_manager::RulePathManager;
    use adrules_engine::DeclaredType;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 前 failures 次返回 503，之后成功
    struct FlakyFetcher {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl RuleFetcher for FlakyFetcher {
        async fn fetch(&self, _url: &str, _etag: Option<&str>) -> Result<FetchedContent, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(FetchError::Status(503))
            } else {
                Ok(FetchedContent::fresh("||ads.example.com^\n"))
            }
        }
    }

    /// hang 为 URL 子串时永不返回
    struct RoutingFetcher;

    #[async_trait]
    impl RuleFetcher for RoutingFetcher {
        async fn fetch(&self, url: &str, _etag: Option<&str>) -> Result<FetchedContent, FetchError> {
            if url.contains("hang") {
                std::future::pending::<()>().await;
            }
            if url.contains("missing") {
                return Err(FetchError::Status(404));
            }
            Ok(FetchedContent::fresh(format!("{}\n", url)))
        }
    }

    fn sources(urls: &[&str]) -> Vec<RemoteRuleSource> {
        urls.iter()
            .enumerate()
            .map(|(i, url)| RemoteRuleSource {
                id: SourceId(i as u32),
                name: format!("s{}", i),
                raw_url: url.to_string(),
                declared_type: DeclaredType::Blacklist,
            })
            .collect()
    }

    fn fast_policy() -> FetchPolicy {
        FetchPolicy {
            max_workers: 2,
            timeout: Duration::from_millis(200),
            retries: 2,
            backoff: Duration::from_millis(10),
            run_budget: Duration::from_secs(10),
        }
    }

    async fn collect(mut rx: mpsc::Receiver<SourceFetchResult>) -> Vec<SourceFetchResult> {
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results.sort_by_key(|r| r.id);
        results
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let fetcher = Arc::new(FlakyFetcher {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let loader = RuleLoader::new(fetcher.clone(), fast_policy());
        let results = collect(loader.spawn(sources(&["https://a.example/list.txt"]))).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].attempts, 3);
        assert!(results[0].outcome.is_ok());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_retry_limit() {
        let fetcher = Arc::new(FlakyFetcher {
            failures: 10,
            calls: AtomicU32::new(0),
        });
        let loader = RuleLoader::new(fetcher, fast_policy());
        let results = collect(loader.spawn(sources(&["https://a.example/list.txt"]))).await;
        assert_eq!(results[0].outcome, Err(FetchError::Status(503)));
        assert_eq!(results[0].attempts, 3);
    }

    #[tokio::test]
    async fn hanging_source_times_out_without_blocking_others() {
        let policy = FetchPolicy {
            retries: 0,
            ..fast_policy()
        };
        let loader = RuleLoader::new(Arc::new(RoutingFetcher), policy);
        let results = collect(loader.spawn(sources(&[
            "https://hang.example/list.txt",
            "https://ok.example/list.txt",
            "https://missing.example/list.txt",
        ])))
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].outcome, Err(FetchError::Timeout));
        assert_eq!(results[1].outcome, Ok("https://ok.example/list.txt\n".to_string()));
        assert_eq!(results[2].outcome, Err(FetchError::Status(404)));
        assert_eq!(results[2].attempts, 1);
    }

    #[tokio::test]
    async fn run_budget_cancels_outstanding_sources() {
        let policy = FetchPolicy {
            timeout: Duration::from_secs(30),
            run_budget: Duration::from_millis(200),
            ..fast_policy()
        };
        let loader = RuleLoader::new(Arc::new(RoutingFetcher), policy);
        let results = collect(loader.spawn(sources(&[
            "https://ok.example/list.txt",
            "https://hang.example/list.txt",
        ])))
        .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].outcome.is_ok());
        assert_eq!(results[1].outcome, Err(FetchError::Cancelled));
    }

    /// 带 ETag 请求时返回 304，否则返回带 ETag 的新内容
    #[derive(Default)]
    struct ConditionalFetcher {
        sent_etags: std::sync::Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl RuleFetcher for ConditionalFetcher {
        async fn fetch(&self, _url: &str, etag: Option<&str>) -> Result<FetchedContent, FetchError> {
            self.sent_etags.lock().unwrap().push(etag.map(str::to_string));
            if etag.is_some() {
                return Ok(FetchedContent::NotModified);
            }
            Ok(FetchedContent::Fresh {
                body: "||ads.example.com^\n".into(),
                etag: Some("v1".into()),
            })
        }
    }

    /// 始终返回 304
    struct NotModifiedFetcher;

    #[async_trait]
    impl RuleFetcher for NotModifiedFetcher {
        async fn fetch(&self, _url: &str, _etag: Option<&str>) -> Result<FetchedContent, FetchError> {
            Ok(FetchedContent::NotModified)
        }
    }

    #[tokio::test]
    async fn not_modified_reuses_cached_body() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(EtagManager::load(RulePathManager::new(dir.path())).await);
        let fetcher = Arc::new(ConditionalFetcher::default());
        let loader = RuleLoader::new(fetcher.clone(), fast_policy()).with_etag_manager(Some(manager.clone()));

        let first = collect(loader.spawn(sources(&["https://a.example/list.txt"]))).await;
        assert_eq!(first[0].outcome, Ok("||ads.example.com^\n".to_string()));
        assert!(!first[0].from_cache);

        let second = collect(loader.spawn(sources(&["https://a.example/list.txt"]))).await;
        assert_eq!(second[0].outcome, Ok("||ads.example.com^\n".to_string()));
        assert!(second[0].from_cache);
        assert_eq!(second[0].attempts, 1);

        let sent = fetcher.sent_etags.lock().unwrap().clone();
        assert_eq!(sent, vec![None, Some("v1".to_string())]);
    }

    #[tokio::test]
    async fn not_modified_without_cache_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(EtagManager::load(RulePathManager::new(dir.path())).await);
        let loader = RuleLoader::new(Arc::new(NotModifiedFetcher), fast_policy()).with_etag_manager(Some(manager));

        let results = collect(loader.spawn(sources(&["https://a.example/list.txt"]))).await;
        assert!(matches!(results[0].outcome, Err(FetchError::Malformed(_))));
        assert_eq!(results[0].attempts, 1);
        assert!(!results[0].from_cache);
    }

    #[tokio::test]
    async fn fresh_body_without_etag_drops_stale_record() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(EtagManager::load(RulePathManager::new(dir.path())).await);
        let source = sources(&["https://a.example/list.txt"]);
        manager.store(&source[0], "stale", "||old.example.com^\n").await.unwrap();
        let raw = manager.path_manager().raw_file_path(&source[0].name);

        // 服务端忽略条件请求，返回不带 ETag 的新内容
        let loader = RuleLoader::new(Arc::new(RoutingFetcher), fast_policy()).with_etag_manager(Some(manager.clone()));
        let results = collect(loader.spawn(source.clone())).await;
        assert_eq!(results[0].outcome, Ok("https://a.example/list.txt\n".to_string()));
        assert!(!results[0].from_cache);
        assert!(manager.cached_content(&source[0]).await.is_none());
        assert!(!raw.exists());
    }
}
