//! 单个实体一次同步的结果

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::AuditCounters;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub entity_name: String,
    pub total_records: u64,
    pub inserted: u64,
    pub updated: u64,
    /// 单条失败 + 整块失败的记录数
    pub errors: u64,
    pub duration_ms: u64,
    pub is_incremental: bool,
    /// 本次增量运行使用的截止时间；全量或首次增量为 None
    pub last_sync_date: Option<DateTime<Utc>>,
}

impl SyncResult {
    pub fn new(entity_name: impl Into<String>, is_incremental: bool) -> Self {
        Self {
            entity_name: entity_name.into(),
            total_records: 0,
            inserted: 0,
            updated: 0,
            errors: 0,
            duration_ms: 0,
            is_incremental,
            last_sync_date: None,
        }
    }

    /// 写入 record_count 的增量
    pub fn processed(&self) -> u64 {
        self.inserted + self.updated
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn counters(&self) -> AuditCounters {
        AuditCounters {
            total_records: self.total_records,
            inserted: self.inserted,
            updated: self.updated,
            errors: self.errors,
            duration_ms: self.duration_ms,
        }
    }
}
