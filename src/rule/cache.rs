//! 运行间规则快照
//! 仅处理已发布 Adblock 规则行的本地序列化（MessagePack），用于统计新增/移除条数

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rmp_serde::{from_slice, Serializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AdResult, AdRulesError};

/// 一次运行发布的规则行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub lines: Vec<String>,
}

/// 与上次运行相比的增减
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: u64,
    pub removed: u64,
}

impl RuleSnapshot {
    pub fn new(generated_at: DateTime<Utc>, mut lines: Vec<String>) -> Self {
        lines.sort_unstable();
        lines.dedup();
        Self {
            version: generated_at.format("%Y%m%d").to_string(),
            generated_at,
            lines,
        }
    }

    /// 以 self 为旧快照，计算 current 的增减
    pub fn diff(&self, current: &RuleSnapshot) -> SnapshotDiff {
        let previous: HashSet<&str> = self.lines.iter().map(String::as_str).collect();
        let now: HashSet<&str> = current.lines.iter().map(String::as_str).collect();
        SnapshotDiff {
            added: now.difference(&previous).count() as u64,
            removed: previous.difference(&now).count() as u64,
        }
    }
}

/// 规则快照管理器
pub struct RuleCacheManager;

impl RuleCacheManager {
    /// 从本地缓存加载快照；文件不存在返回 None
    pub async fn load_snapshot(path: &Path) -> AdResult<Option<RuleSnapshot>> {
        let cache_data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // MessagePack反序列化
        let snapshot: RuleSnapshot = from_slice(&cache_data)
            .map_err(|e| AdRulesError::Cache(format!("反序列化失败：{}", e)))?;

        debug!("快照反序列化成功，版本：{}，规则数：{}", snapshot.version, snapshot.lines.len());
        Ok(Some(snapshot))
    }

    /// 将快照整体写入本地（临时文件 + 重命名）
    pub async fn save_snapshot(path: &Path, snapshot: &RuleSnapshot) -> AdResult<()> {
        let mut cache_data = Vec::new();

        // MessagePack序列化
        snapshot
            .serialize(&mut Serializer::new(&mut cache_data))
            .map_err(|e| AdRulesError::Cache(format!("序列化失败：{}", e)))?;

        debug!("快照序列化成功，序列化后数据大小：{} 字节", cache_data.len());

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("mp.tmp");
        tokio::fs::write(&tmp, cache_data).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
