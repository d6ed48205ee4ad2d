use std::io;
use std::path::{Path, PathBuf};

/// 缓存路径管理器
/// 布局：缓存根目录/{etag_records.json, raw_files/, snapshot.mp}
#[derive(Debug, Clone)]
pub struct RulePathManager {
    cache_dir: PathBuf,
}

impl RulePathManager {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// ETag 记录文件路径
    pub fn etag_record_path(&self) -> PathBuf {
        self.cache_dir.join("etag_records.json")
    }

    /// 原始文件缓存目录
    pub fn raw_file_dir(&self) -> PathBuf {
        self.cache_dir.join("raw_files")
    }

    /// 源名称对应的原始文件路径
    pub fn raw_file_path(&self, source_name: &str) -> PathBuf {
        self.raw_file_dir().join(format!("{}.txt", source_name))
    }

    /// 上次运行的规则快照
    pub fn snapshot_path(&self) -> PathBuf {
        self.cache_dir.join("snapshot.mp")
    }

    /// 统一确保缓存目录存在
    pub async fn ensure_dirs(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(self.raw_file_dir()).await
    }
}
