//! 单次运行编排：拉取 → 解析规范化 → 去重合并 → 冲突解析 → 输出
//! 合并集合只由本模块的消费循环写入（单写者）

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use adrules_engine::{
    Artifact, ConflictResolver, FetchStatus, HeaderInfo, MergedRuleSet, ParseStats, RenderOptions,
    RenderedArtifact, Renderer, RuleKind, RuleParser, RuleTypeStats, RunStats, SourceReport,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::emitter::ArtifactEmitter;
use crate::error::AdResult;
use crate::rule::cache::{RuleCacheManager, RuleSnapshot};
use crate::rule::loader::{
    EtagManager, FetchError, FetchPolicy, HttpRuleFetcher, RuleFetcher, RuleLoader,
    RulePathManager, SourceFetchResult, SourceRegistry,
};

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: RunStats,
    pub written: Vec<PathBuf>,
}

/// 合并阶段的产出
#[derive(Debug)]
pub struct MergeOutcome {
    pub set: MergedRuleSet,
    pub parse_stats: ParseStats,
    pub sources: Vec<SourceReport>,
}

pub struct Pipeline {
    config: GlobalConfig,
    fetcher: Arc<dyn RuleFetcher>,
}

impl Pipeline {
    pub fn new(config: GlobalConfig, fetcher: Arc<dyn RuleFetcher>) -> Self {
        Self { config, fetcher }
    }

    /// 使用 reqwest 拉取器
    pub fn with_http(config: GlobalConfig) -> AdResult<Self> {
        let fetcher = HttpRuleFetcher::new(&config.fetch)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// 完整运行；配置错误在任何拉取之前返回，产物写入失败为致命错误
    pub async fn run(&self) -> AdResult<RunReport> {
        let started = Instant::now();
        self.config.validate()?;
        let registry = SourceRegistry::from_config(&self.config)?;
        let generated_at = Utc::now();

        let paths = self.config.cache_dir.as_ref().map(RulePathManager::new);
        let etag_manager = match &paths {
            Some(paths) => Some(Arc::new(EtagManager::load(paths.clone()).await)),
            None => None,
        };

        let loader = RuleLoader::new(self.fetcher.clone(), FetchPolicy::from(&self.config.fetch))
            .with_etag_manager(etag_manager.clone());
        let merged = self.fetch_and_merge(&loader, &registry).await;

        if let Some(manager) = &etag_manager {
            if let Err(e) = manager.save().await {
                warn!("Failed to save ETag records: {}", e);
            }
        }

        let MergeOutcome {
            mut set,
            parse_stats,
            sources,
        } = merged;
        let covered = ConflictResolver::new(self.config.output.match_mode).finalize(&mut set);

        let mut stats = build_stats(generated_at, &set, &parse_stats, sources, covered);
        let rendered = self.render(&set, generated_at);

        let snapshot = RuleSnapshot::new(generated_at, published_lines(&rendered));
        let snapshot_path = paths.as_ref().map(RulePathManager::snapshot_path);
        if let Some(path) = &snapshot_path {
            match RuleCacheManager::load_snapshot(path).await {
                Ok(Some(previous)) => {
                    let diff = previous.diff(&snapshot);
                    stats.added_since_last_run = Some(diff.added);
                    stats.removed_since_last_run = Some(diff.removed);
                }
                Ok(None) => {}
                Err(e) => warn!("Previous snapshot unavailable: {}", e),
            }
        }

        let written = ArtifactEmitter::new(&self.config.output.dir)
            .emit(&rendered, &stats)
            .await?;

        if let Some(path) = &snapshot_path {
            if let Err(e) = RuleCacheManager::save_snapshot(path, &snapshot).await {
                warn!("Failed to save snapshot: {}", e);
            }
        }

        stats.print_stats();
        info!("Run finished in {:.2?}", started.elapsed());
        Ok(RunReport { stats, written })
    }

    /// 消费拉取结果并写入合并集合
    pub async fn fetch_and_merge(&self, loader: &RuleLoader, registry: &SourceRegistry) -> MergeOutcome {
        let mut set = MergedRuleSet::new();
        let mut parse_stats = ParseStats::default();
        let mut sources: Vec<SourceReport> = registry
            .iter()
            .map(|s| SourceReport {
                name: s.name.clone(),
                url: s.raw_url.clone(),
                declared_type: s.declared_type,
                status: FetchStatus::Pending,
                rule_count: 0,
                failure_reason: None,
            })
            .collect();

        let mut rx = loader.spawn(registry.sources().to_vec());
        while let Some(SourceFetchResult { id, outcome, .. }) = rx.recv().await {
            let (Some(source), Some(report)) = (registry.get(id), sources.get_mut(id.index())) else {
                warn!("Fetch result for unknown source {}", id);
                continue;
            };
            match outcome {
                Ok(body) => {
                    let batch = RuleParser::for_type(source.declared_type).parse_content(&source.name, id, &body);
                    report.status = FetchStatus::Success;
                    report.rule_count = batch.stats.accepted;
                    parse_stats.merge(&batch.stats);
                    set.extend(batch.rules, batch.source);
                }
                Err(e) => {
                    report.status = FetchStatus::Failed;
                    report.failure_reason = Some(e.to_string());
                }
            }
        }

        // 结果通道提前关闭时，未回报的源按取消处理
        for report in sources.iter_mut().filter(|r| r.status == FetchStatus::Pending) {
            report.status = FetchStatus::Failed;
            report.failure_reason = Some(FetchError::Cancelled.to_string());
        }

        MergeOutcome {
            set,
            parse_stats,
            sources,
        }
    }

    pub fn render_options(&self, generated_at: DateTime<Utc>) -> RenderOptions {
        let output = &self.config.output;
        RenderOptions {
            order: output.order,
            hosts_max_entries: output.hosts_limit(),
            header: output
                .header
                .then(|| HeaderInfo::new(output.title.clone(), generated_at).with_homepage(output.homepage.clone())),
        }
    }

    fn render(&self, set: &MergedRuleSet, generated_at: DateTime<Utc>) -> Vec<RenderedArtifact> {
        let options = self.render_options(generated_at);
        Renderer::new(set, &options).render_all()
    }
}

/// 汇总运行统计
pub fn build_stats(
    generated_at: DateTime<Utc>,
    set: &MergedRuleSet,
    parse_stats: &ParseStats,
    sources: Vec<SourceReport>,
    covered_by_parent: u64,
) -> RunStats {
    let mut stats = RunStats::new(generated_at);
    stats.set_sources(sources);
    stats.raw_rule_count = parse_stats.raw_rules();
    stats.accepted_rule_count = parse_stats.accepted;
    stats.invalid_rule_count = parse_stats.invalid;
    stats.unsupported_rule_count = parse_stats.unsupported;
    stats.duplicates_removed = set.duplicates_removed();
    stats.covered_by_parent = covered_by_parent;
    stats.final_block_count = set.count_kind(RuleKind::Block);
    stats.final_allow_count = set.count_kind(RuleKind::Allow);
    stats.final_hide_element_count = set.count_kind(RuleKind::HideElement);
    stats.final_popup_count = set.count_kind(RuleKind::PopupBlock);
    stats.rule_types = RuleTypeStats::from_rules(set.iter());
    stats
}

/// ad.txt 中的规则行（去掉注释头）
fn published_lines(rendered: &[RenderedArtifact]) -> Vec<String> {
    rendered
        .iter()
        .filter(|r| r.artifact == Artifact::Adblock)
        .flat_map(|r| r.content.lines())
        .filter(|line| !line.is_empty() && !line.starts_with('!'))
        .map(str::to_string)
        .collect()
}
