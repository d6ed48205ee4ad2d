use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ETag 记录（单个远程源）
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ETagRecord {
    /// 远程源名称
    pub source_name: String,
    /// 远程源 URL（查找键）
    pub source_url: String,
    /// 远程文件 ETag
    pub etag: String,
    /// 本地原始文件路径
    pub local_file_path: String,
    /// 最后更新时间
    pub last_update: DateTime<Utc>,
}

/// ETag 总记录（序列化到本地文件）
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ETagTotalRecord {
    pub records: Vec<ETagRecord>,
}

impl ETagTotalRecord {
    /// 根据源 URL 查找 ETag 记录
    pub fn find_record(&self, source_url: &str) -> Option<&ETagRecord> {
        self.records.iter().find(|r| r.source_url == source_url)
    }

    /// 添加/更新 ETag 记录
    pub fn upsert_record(&mut self, new_record: ETagRecord) {
        // 移除旧记录
        self.records.retain(|r| r.source_url != new_record.source_url);
        // 添加新记录
        self.records.push(new_record);
    }

    /// 删除源 URL 对应的记录，返回被删除的记录
    pub fn remove_record(&mut self, source_url: &str) -> Option<ETagRecord> {
        let idx = self.records.iter().position(|r| r.source_url == source_url)?;
        Some(self.records.remove(idx))
    }
}
