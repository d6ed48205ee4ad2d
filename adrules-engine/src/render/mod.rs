//! 产物渲染：把最终规则集渲染为各目标格式的文本
//! 只读 MergedRuleSet，不做任何 I/O
mod header;

pub use header::HeaderInfo;

use crate::core::{CanonicalRule, OutputOrder, RuleKind};
use crate::merger::MergedRuleSet;

/// 默认 hosts 条数上限
pub const DEFAULT_HOSTS_MAX_ENTRIES: usize = 100_000;

/// 文本产物
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// ad.txt：完整 Adblock 规则
    Adblock,
    /// dns.txt：拦截域名列表
    Dns,
    /// hosts.txt
    Hosts,
    /// black.txt：所有拦截类规则（Adblock 语法）
    Black,
    /// white.txt：所有放行规则（Adblock 语法）
    White,
    /// black_only.txt：拦截域名
    BlackOnly,
    /// white_only.txt：放行域名
    WhiteOnly,
}

impl Artifact {
    pub const ALL: [Artifact; 7] = [
        Artifact::Adblock,
        Artifact::Dns,
        Artifact::Hosts,
        Artifact::Black,
        Artifact::White,
        Artifact::BlackOnly,
        Artifact::WhiteOnly,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::Adblock => "ad.txt",
            Artifact::Dns => "dns.txt",
            Artifact::Hosts => "hosts.txt",
            Artifact::Black => "black.txt",
            Artifact::White => "white.txt",
            Artifact::BlackOnly => "black_only.txt",
            Artifact::WhiteOnly => "white_only.txt",
        }
    }

    fn subtitle(self) -> &'static str {
        match self {
            Artifact::Adblock => "Adblock List",
            Artifact::Dns => "DNS List",
            Artifact::Hosts => "Hosts",
            Artifact::Black => "Blacklist",
            Artifact::White => "Whitelist",
            Artifact::BlackOnly => "Blacklist (domains only)",
            Artifact::WhiteOnly => "Whitelist (domains only)",
        }
    }

    fn comment_prefix(self) -> char {
        match self {
            Artifact::Adblock | Artifact::Black | Artifact::White => '!',
            _ => '#',
        }
    }
}

/// 渲染选项
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub order: OutputOrder,
    /// hosts 条数上限，None 表示不限
    pub hosts_max_entries: Option<usize>,
    /// None 表示不写注释头
    pub header: Option<HeaderInfo>,
}

/// 渲染结果
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub artifact: Artifact,
    pub content: String,
    /// 规则条数（不含注释头）
    pub entries: usize,
}

/// 产物渲染器
pub struct Renderer<'a> {
    set: &'a MergedRuleSet,
    options: &'a RenderOptions,
}

const BLOCKING_KINDS: [RuleKind; 3] = [RuleKind::Block, RuleKind::PopupBlock, RuleKind::HideElement];

impl<'a> Renderer<'a> {
    pub fn new(set: &'a MergedRuleSet, options: &'a RenderOptions) -> Self {
        Self { set, options }
    }

    pub fn render_all(&self) -> Vec<RenderedArtifact> {
        Artifact::ALL.iter().map(|a| self.render(*a)).collect()
    }

    pub fn render(&self, artifact: Artifact) -> RenderedArtifact {
        let lines = match artifact {
            Artifact::Adblock => self.adblock_lines(),
            Artifact::Dns | Artifact::BlackOnly => self.domain_lines(RuleKind::Block),
            Artifact::WhiteOnly => self.domain_lines(RuleKind::Allow),
            Artifact::Hosts => self.hosts_lines(),
            Artifact::Black => self.adblock_kinds(&BLOCKING_KINDS),
            Artifact::White => self.adblock_kinds(&[RuleKind::Allow]),
        };

        let entries = lines.len();
        let mut content = String::with_capacity(entries * 32 + 256);
        if let Some(header) = &self.options.header {
            header.write(&mut content, artifact.comment_prefix(), artifact.subtitle(), entries);
            if artifact == Artifact::Hosts {
                content.push_str("127.0.0.1 localhost\n::1 localhost\n\n");
            }
        }
        for line in &lines {
            content.push_str(line);
            content.push('\n');
        }

        RenderedArtifact {
            artifact,
            content,
            entries,
        }
    }

    /// 完整 Adblock 列表：按配置决定黑白名单段落顺序
    fn adblock_lines(&self) -> Vec<String> {
        let white = self.adblock_kinds(&[RuleKind::Allow]);
        let black = self.adblock_kinds(&BLOCKING_KINDS);
        match self.options.order {
            OutputOrder::WhitelistFirst => white.into_iter().chain(black).collect(),
            OutputOrder::BlacklistFirst => black.into_iter().chain(white).collect(),
        }
    }

    fn adblock_kinds(&self, kinds: &[RuleKind]) -> Vec<String> {
        kinds
            .iter()
            .flat_map(|kind| self.set.sorted_by_kind(*kind))
            .map(CanonicalRule::to_adblock)
            .collect()
    }

    fn domain_lines(&self, kind: RuleKind) -> Vec<String> {
        self.set
            .sorted_by_kind(kind)
            .into_iter()
            .filter_map(|r| r.pattern.as_domain().map(str::to_string))
            .collect()
    }

    fn hosts_lines(&self) -> Vec<String> {
        let limit = self.options.hosts_max_entries.unwrap_or(usize::MAX);
        self.set
            .sorted_by_kind(RuleKind::Block)
            .into_iter()
            .filter_map(|r| r.pattern.as_domain())
            .take(limit)
            .map(|d| format!("0.0.0.0 {}", d))
            .collect()
    }
}
