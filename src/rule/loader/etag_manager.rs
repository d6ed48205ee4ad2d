use std::io::ErrorKind;
use std::sync::Mutex;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{AdResult, AdRulesError};
use crate::rule::loader::etag::{ETagRecord, ETagTotalRecord};
use crate::rule::loader::path_manager::RulePathManager;
use crate::rule::loader::remote_source::RemoteRuleSource;

/// 本地缓存的原始内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRaw {
    pub etag: String,
    pub body: String,
}

/// ETag 记录管理器
/// 启动时整体读入记录，运行中只改内存，结束时整体写回
#[derive(Debug)]
pub struct EtagManager {
    path_manager: RulePathManager,
    records: Mutex<ETagTotalRecord>,
}

impl EtagManager {
    /// 加载 ETag 记录；缓存不可用时退化为空记录
    pub async fn load(path_manager: RulePathManager) -> Self {
        let records = match Self::read_records(&path_manager).await {
            Ok(records) => records,
            Err(e) => {
                warn!("ETag records unavailable, starting empty: {}", e);
                ETagTotalRecord::default()
            }
        };
        debug!("Loaded {} ETag records", records.records.len());
        Self {
            path_manager,
            records: Mutex::new(records),
        }
    }

    async fn read_records(path_manager: &RulePathManager) -> AdResult<ETagTotalRecord> {
        let content = match tokio::fs::read_to_string(path_manager.etag_record_path()).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ETagTotalRecord::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    pub fn path_manager(&self) -> &RulePathManager {
        &self.path_manager
    }

    /// 查询源的缓存内容：记录与原始文件都存在时返回
    pub async fn cached_content(&self, source: &RemoteRuleSource) -> Option<CachedRaw> {
        let record = self.find_record(&source.raw_url)?;
        match tokio::fs::read_to_string(&record.local_file_path).await {
            Ok(body) => Some(CachedRaw {
                etag: record.etag,
                body,
            }),
            Err(e) => {
                debug!("[{}] cached raw file unreadable: {}", source.name, e);
                None
            }
        }
    }

    /// 写入原始文件并更新内存中的记录
    pub async fn store(&self, source: &RemoteRuleSource, etag: &str, body: &str) -> AdResult<()> {
        let raw_path = self.path_manager.raw_file_path(&source.name);
        if let Some(parent) = raw_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&raw_path, body).await?;

        let record = ETagRecord {
            source_name: source.name.clone(),
            source_url: source.raw_url.clone(),
            etag: etag.to_string(),
            local_file_path: raw_path.to_string_lossy().into_owned(),
            last_update: Utc::now(),
        };
        self.lock()?.upsert_record(record);
        Ok(())
    }

    /// 源返回新内容但没有 ETag：删除旧记录和原始文件，避免下次发送过期的 If-None-Match
    pub async fn forget(&self, source: &RemoteRuleSource) -> AdResult<()> {
        let removed = self.lock()?.remove_record(&source.raw_url);
        let Some(record) = removed else {
            return Ok(());
        };
        match tokio::fs::remove_file(&record.local_file_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!("[{}] dropped ETag record", source.name);
        Ok(())
    }

    /// 保存 ETag 记录
    pub async fn save(&self) -> AdResult<()> {
        self.path_manager.ensure_dirs().await?;
        let etag_path = self.path_manager.etag_record_path();
        // 序列化后再释放锁，锁不跨 await
        let content = serde_json::to_string_pretty(&*self.lock()?)?;
        tokio::fs::write(&etag_path, content).await?;
        debug!("ETag save to：{}", etag_path.display());
        Ok(())
    }

    fn find_record(&self, source_url: &str) -> Option<ETagRecord> {
        self.records.lock().ok()?.find_record(source_url).cloned()
    }

    fn lock(&self) -> AdResult<std::sync::MutexGuard<'_, ETagTotalRecord>> {
        self.records
            .lock()
            .map_err(|_| AdRulesError::Cache("ETag records lock poisoned".into()))
    }
}
