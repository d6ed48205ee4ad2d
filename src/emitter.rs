//! 产物写入
//! 两阶段发布：先把所有产物写成临时文件，全部写成功后再逐个重命名，stats.json 最后
//! 暂存阶段任何失败都不会替换已发布的文件；重命名阶段只保证单文件原子
//! 任何写入失败都是致命错误

use std::io::Write;
use std::path::{Path, PathBuf};

use adrules_engine::{Artifact, RenderedArtifact, RunStats};
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, info, warn};

use crate::error::{AdResult, AdRulesError};

/// 压缩产物文件名
pub const GZIP_FILE_NAME: &str = "adblock.txt.gz";
/// 统计文件名
pub const STATS_FILE_NAME: &str = "stats.json";

/// 已写入临时文件、等待重命名的产物
#[derive(Debug)]
struct StagedFile {
    tmp: PathBuf,
    path: PathBuf,
}

/// 产物写入器
#[derive(Debug, Clone)]
pub struct ArtifactEmitter {
    dir: PathBuf,
}

impl ArtifactEmitter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 写入全部文本产物、ad.txt 的 gzip 以及 stats.json，返回写入的路径
    pub async fn emit(&self, artifacts: &[RenderedArtifact], stats: &RunStats) -> AdResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AdRulesError::output_write(&self.dir, e))?;

        let mut staged = Vec::with_capacity(artifacts.len() + 2);
        if let Err(e) = self.stage_all(artifacts, stats, &mut staged).await {
            discard(&staged).await;
            return Err(e);
        }

        let mut written = Vec::with_capacity(staged.len());
        for (idx, file) in staged.iter().enumerate() {
            if let Err(e) = tokio::fs::rename(&file.tmp, &file.path).await {
                discard(&staged[idx..]).await;
                return Err(AdRulesError::output_write(&file.path, e));
            }
            written.push(file.path.clone());
        }

        info!("Emitted {} files to {}", written.len(), self.dir.display());
        Ok(written)
    }

    async fn stage_all(
        &self,
        artifacts: &[RenderedArtifact],
        stats: &RunStats,
        staged: &mut Vec<StagedFile>,
    ) -> AdResult<()> {
        for rendered in artifacts {
            staged.push(self.stage(rendered.artifact.file_name(), rendered.content.as_bytes()).await?);
            debug!("Staged {} ({} entries)", rendered.artifact.file_name(), rendered.entries);

            if rendered.artifact == Artifact::Adblock {
                let compressed = gzip(rendered.content.as_bytes())
                    .map_err(|e| AdRulesError::output_write(self.dir.join(GZIP_FILE_NAME), e))?;
                staged.push(self.stage(GZIP_FILE_NAME, &compressed).await?);
            }
        }

        let stats_json = stats.to_json_pretty()?;
        staged.push(self.stage(STATS_FILE_NAME, stats_json.as_bytes()).await?);
        Ok(())
    }

    async fn stage(&self, file_name: &str, data: &[u8]) -> AdResult<StagedFile> {
        let tmp = self.dir.join(format!(".{}.tmp", file_name));
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| AdRulesError::output_write(&tmp, e))?;
        Ok(StagedFile {
            tmp,
            path: self.dir.join(file_name),
        })
    }
}

/// 删除尚未发布的临时文件
async fn discard(staged: &[StagedFile]) {
    for file in staged {
        if let Err(e) = tokio::fs::remove_file(&file.tmp).await {
            warn!("Failed to remove staged file {}: {}", file.tmp.display(), e);
        }
    }
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 4), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}
