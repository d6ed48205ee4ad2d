//! 端到端运行：内存拉取器 + 临时输出目录

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use adrules::engine::{DeclaredType, FetchStatus, RunStats};
use adrules::{
    AdRulesError, CustomConfigBuilder, FetchError, FetchedContent, GlobalConfig, Pipeline,
    RuleFetcher, SourceConfig,
};
use async_trait::async_trait;

enum Reply {
    Body(&'static str),
    Hang,
    Status(u16),
    /// 先返回 503，之后返回内容
    FlakyThen(&'static str),
}

#[derive(Default)]
struct MemoryFetcher {
    replies: HashMap<String, Reply>,
    calls: AtomicU32,
}

impl MemoryFetcher {
    fn with(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }
}

#[async_trait]
impl RuleFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str, _etag: Option<&str>) -> Result<FetchedContent, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(url) {
            Some(Reply::Body(body)) => Ok(FetchedContent::fresh(*body)),
            Some(Reply::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Some(Reply::Status(code)) => Err(FetchError::Status(*code)),
            Some(Reply::FlakyThen(body)) if call > 0 => Ok(FetchedContent::fresh(*body)),
            Some(Reply::FlakyThen(_)) => Err(FetchError::Status(503)),
            None => Err(FetchError::Status(404)),
        }
    }
}

fn config(out: &Path, sources: &[(&str, DeclaredType)]) -> GlobalConfig {
    let mut builder = CustomConfigBuilder::new()
        .output_dir(out)
        .timeout_secs(1)
        .retries(0)
        .backoff_ms(10)
        .header(false);
    for (url, ty) in sources {
        builder = builder.source(SourceConfig::new(*url, *ty));
    }
    builder.build()
}

fn read(out: &Path, name: &str) -> String {
    std::fs::read_to_string(out.join(name)).unwrap()
}

fn read_stats(out: &Path) -> RunStats {
    serde_json::from_str(&read(out, "stats.json")).unwrap()
}

#[tokio::test]
async fn allow_from_one_source_overrides_block_from_another() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MemoryFetcher::default()
        .with("https://a.example/a.txt", Reply::Body("||ads.example.com^\n"))
        .with("https://b.example/b.txt", Reply::Body("@@||ads.example.com^\n"));
    let config = config(
        dir.path(),
        &[
            ("https://a.example/a.txt", DeclaredType::Blacklist),
            ("https://b.example/b.txt", DeclaredType::Blacklist),
        ],
    );

    let report = Pipeline::new(config, Arc::new(fetcher)).run().await.unwrap();

    assert_eq!(report.stats.final_allow_count, 1);
    assert_eq!(report.stats.final_block_count, 0);
    assert_eq!(report.stats.duplicates_removed, 1);
    assert_eq!(read(dir.path(), "ad.txt"), "@@||ads.example.com^\n");
    assert_eq!(read(dir.path(), "dns.txt"), "");
    assert_eq!(read(dir.path(), "white_only.txt"), "ads.example.com\n");
}

#[tokio::test]
async fn same_domain_from_three_sources_is_counted_once() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MemoryFetcher::default()
        .with("https://a.example/list", Reply::Body("||track.example.net^\n"))
        .with("https://b.example/list", Reply::Body("track.example.net\n"))
        .with("https://c.example/hosts", Reply::Body("0.0.0.0 track.example.net\n"));
    let config = config(
        dir.path(),
        &[
            ("https://a.example/list", DeclaredType::Blacklist),
            ("https://b.example/list", DeclaredType::Dns),
            ("https://c.example/hosts", DeclaredType::Hosts),
        ],
    );

    let report = Pipeline::new(config, Arc::new(fetcher)).run().await.unwrap();

    assert_eq!(report.stats.final_block_count, 1);
    assert!(report.stats.duplicates_removed >= 2);
    assert_eq!(read(dir.path(), "dns.txt"), "track.example.net\n");
    assert_eq!(read(dir.path(), "hosts.txt"), "0.0.0.0 track.example.net\n");
    assert!(report.stats.sources.iter().all(|s| s.rule_count == 1));
}

#[tokio::test]
async fn blacklist_source_serving_hosts_file_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MemoryFetcher::default().with(
        "https://a.example/hosts",
        Reply::Body("# hosts\n0.0.0.0 ads.example.com\n127.0.0.1 track.example.net\n"),
    );
    let config = config(dir.path(), &[("https://a.example/hosts", DeclaredType::Blacklist)]);

    let report = Pipeline::new(config, Arc::new(fetcher)).run().await.unwrap();

    assert_eq!(report.stats.accepted_rule_count, 2);
    assert_eq!(report.stats.unsupported_rule_count, 0);
    assert_eq!(report.stats.final_block_count, 2);
    let dns = read(dir.path(), "dns.txt");
    assert!(dns.lines().any(|l| l == "ads.example.com"));
    assert!(dns.lines().any(|l| l == "track.example.net"));
}

#[tokio::test]
async fn timed_out_source_is_recorded_and_artifacts_still_emitted() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MemoryFetcher::default()
        .with("https://ok1.example/list", Reply::Body("||ads.example.com^\n"))
        .with("https://slow.example/list", Reply::Hang)
        .with("https://ok2.example/list", Reply::Body("tracker.example.org\n"));
    let config = config(
        dir.path(),
        &[
            ("https://ok1.example/list", DeclaredType::Blacklist),
            ("https://slow.example/list", DeclaredType::Blacklist),
            ("https://ok2.example/list", DeclaredType::Dns),
        ],
    );

    let report = Pipeline::new(config, Arc::new(fetcher)).run().await.unwrap();

    assert_eq!(report.stats.sources_total, 3);
    assert_eq!(report.stats.sources_failed, 1);
    assert_eq!(report.stats.sources_succeeded, 2);
    let slow = &report.stats.sources[1];
    assert_eq!(slow.status, FetchStatus::Failed);
    assert_eq!(slow.failure_reason.as_deref(), Some("timeout"));

    for name in [
        "ad.txt",
        "dns.txt",
        "hosts.txt",
        "black.txt",
        "white.txt",
        "black_only.txt",
        "white_only.txt",
        "adblock.txt.gz",
        "stats.json",
    ] {
        assert!(dir.path().join(name).is_file(), "missing {}", name);
    }
    assert_eq!(read_stats(dir.path()).sources_failed, 1);
}

#[tokio::test]
async fn failing_source_does_not_change_other_counts() {
    let dir_ok = tempfile::tempdir().unwrap();
    let dir_mixed = tempfile::tempdir().unwrap();
    let body = "||a.example.com^\n||b.example.com^\n@@||c.example.com^\n";

    let alone = Pipeline::new(
        config(dir_ok.path(), &[("https://good.example/list", DeclaredType::Blacklist)]),
        Arc::new(MemoryFetcher::default().with("https://good.example/list", Reply::Body(body))),
    )
    .run()
    .await
    .unwrap();

    let mixed = Pipeline::new(
        config(
            dir_mixed.path(),
            &[
                ("https://bad.example/list", DeclaredType::Blacklist),
                ("https://good.example/list", DeclaredType::Blacklist),
            ],
        ),
        Arc::new(
            MemoryFetcher::default()
                .with("https://bad.example/list", Reply::Status(500))
                .with("https://good.example/list", Reply::Body(body)),
        ),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(alone.stats.sources[0].rule_count, 3);
    assert_eq!(mixed.stats.sources[1].rule_count, 3);
    assert_eq!(mixed.stats.sources[0].rule_count, 0);
    assert_eq!(mixed.stats.sources[0].failure_reason.as_deref(), Some("http status 500"));
    assert_eq!(read(dir_ok.path(), "ad.txt"), read(dir_mixed.path(), "ad.txt"));
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MemoryFetcher::default().with("https://a.example/list", Reply::FlakyThen("||ads.example.com^\n")));
    let config = CustomConfigBuilder::new()
        .output_dir(dir.path())
        .retries(2)
        .backoff_ms(10)
        .source(SourceConfig::new("https://a.example/list", DeclaredType::Blacklist))
        .build();

    let report = Pipeline::new(config, fetcher.clone()).run().await.unwrap();

    assert_eq!(report.stats.sources_succeeded, 1);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn whitelist_source_and_subdomain_coverage() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MemoryFetcher::default()
        .with(
            "https://a.example/black",
            Reply::Body("||ads.example.com^\n||cdn.safe.example.org^\n||safe.example.org^\nexample.com##.banner\n"),
        )
        .with("https://a.example/white", Reply::Body("safe.example.org\n"));
    let config = config(
        dir.path(),
        &[
            ("https://a.example/black", DeclaredType::Blacklist),
            ("https://a.example/white", DeclaredType::Whitelist),
        ],
    );

    let report = Pipeline::new(config, Arc::new(fetcher)).run().await.unwrap();

    assert_eq!(report.stats.covered_by_parent, 1);
    assert_eq!(report.stats.final_block_count, 1);
    assert_eq!(report.stats.final_hide_element_count, 1);
    assert_eq!(read(dir.path(), "dns.txt"), "ads.example.com\n");
    assert_eq!(read(dir.path(), "black.txt"), "||ads.example.com^\nexample.com##.banner\n");
    assert_eq!(report.stats.rule_types.element_hiding, 1);
}

#[tokio::test]
async fn second_run_reports_diff_against_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let build = |body: &'static str| {
        let config = CustomConfigBuilder::new()
            .output_dir(dir.path())
            .cache_dir(cache.path())
            .retries(0)
            .source(SourceConfig::new("https://a.example/list", DeclaredType::Blacklist))
            .build();
        Pipeline::new(config, Arc::new(MemoryFetcher::default().with("https://a.example/list", Reply::Body(body))))
    };

    let first = build("||a.example.com^\n||b.example.com^\n").run().await.unwrap();
    assert_eq!(first.stats.added_since_last_run, None);

    let second = build("||b.example.com^\n||c.example.com^\n||d.example.com^\n").run().await.unwrap();
    assert_eq!(second.stats.added_since_last_run, Some(2));
    assert_eq!(second.stats.removed_since_last_run, Some(1));
}

#[tokio::test]
async fn no_sources_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(MemoryFetcher::default());
    let err = Pipeline::new(config(dir.path(), &[]), fetcher.clone()).run().await.unwrap_err();
    assert!(matches!(err, AdRulesError::Config(_)));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert!(!dir.path().join("ad.txt").exists());
}

#[tokio::test]
async fn unwritable_output_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "x").unwrap();
    let fetcher = MemoryFetcher::default().with("https://a.example/list", Reply::Body("||ads.example.com^\n"));
    let config = config(&blocker.join("out"), &[("https://a.example/list", DeclaredType::Blacklist)]);

    let err = Pipeline::new(config, Arc::new(fetcher)).run().await.unwrap_err();
    assert!(matches!(err, AdRulesError::OutputWrite { .. }));
}

#[tokio::test]
async fn headers_are_written_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MemoryFetcher::default().with("https://a.example/list", Reply::Body("||ads.example.com^\n"));
    let config = CustomConfigBuilder::new()
        .output_dir(dir.path())
        .source(SourceConfig::new("https://a.example/list", DeclaredType::Blacklist))
        .build();

    Pipeline::new(config, Arc::new(fetcher)).run().await.unwrap();

    let ad = read(dir.path(), "ad.txt");
    assert!(ad.starts_with("! Title: AdRules Adblock List\n"));
    assert!(ad.ends_with("||ads.example.com^\n"));
    let hosts = read(dir.path(), "hosts.txt");
    assert!(hosts.starts_with("# Title: AdRules Hosts\n"));
    assert!(hosts.contains("127.0.0.1 localhost\n"));
    assert!(hosts.ends_with("0.0.0.0 ads.example.com\n"));
}
