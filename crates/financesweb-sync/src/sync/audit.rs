//! 同步审计事件
//!
//! 编排器在 start / complete / error 三个节点发事件；AuditEmitter 扇出到各个 sink。
//! sink 失败只记 warn，永远不向编排器返回错误。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::dao::AuditLogDao;
use crate::storage::entities::AuditLogRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditPhase {
    Start,
    Complete,
    Error,
}

impl AuditPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

/// 完成事件携带的计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCounters {
    pub total_records: u64,
    pub inserted: u64,
    pub updated: u64,
    pub errors: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// 同一次 perform_*_sync 调用内的所有事件共享 run_id
    pub run_id: Uuid,
    pub phase: AuditPhase,
    pub entity_name: String,
    pub is_incremental: bool,
    pub counters: Option<AuditCounters>,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn start(run_id: Uuid, entity_name: &str, is_incremental: bool) -> Self {
        Self {
            run_id,
            phase: AuditPhase::Start,
            entity_name: entity_name.to_string(),
            is_incremental,
            counters: None,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn complete(run_id: Uuid, entity_name: &str, is_incremental: bool, counters: AuditCounters) -> Self {
        Self {
            phase: AuditPhase::Complete,
            counters: Some(counters),
            ..Self::start(run_id, entity_name, is_incremental)
        }
    }

    pub fn error(run_id: Uuid, entity_name: &str, is_incremental: bool, message: impl Into<String>) -> Self {
        Self {
            phase: AuditPhase::Error,
            message: Some(message.into()),
            ..Self::start(run_id, entity_name, is_incremental)
        }
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    fn name(&self) -> &str;

    async fn emit(&self, event: &AuditEvent) -> Result<()>;
}

/// 扇出到多个 sink，吞掉所有 sink 错误
#[derive(Clone, Default)]
pub struct AuditEmitter {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn AuditSink>) {
        self.sinks.push(sink);
    }

    pub async fn emit(&self, event: AuditEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.emit(&event).await {
                warn!(
                    "⚠️ 审计事件写入失败 sink={}, entity={}, phase={}: {}",
                    sink.name(),
                    event.entity_name,
                    event.phase.as_str(),
                    e
                );
            }
        }
    }
}

/// 结构化 tracing 输出
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn emit(&self, event: &AuditEvent) -> Result<()> {
        let counters = event.counters.unwrap_or(AuditCounters {
            total_records: 0,
            inserted: 0,
            updated: 0,
            errors: 0,
            duration_ms: 0,
        });
        info!(
            target: "financesweb_sync::audit",
            run_id = %event.run_id,
            entity = %event.entity_name,
            phase = event.phase.as_str(),
            incremental = event.is_incremental,
            total = counters.total_records,
            inserted = counters.inserted,
            updated = counters.updated,
            errors = counters.errors,
            duration_ms = counters.duration_ms,
            message = event.message.as_deref().unwrap_or(""),
            "sync audit"
        );
        Ok(())
    }
}

/// 进程内广播，供管理界面/调用方订阅
pub struct BroadcastAuditSink {
    sender: broadcast::Sender<AuditEvent>,
}

impl BroadcastAuditSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl AuditSink for BroadcastAuditSink {
    fn name(&self) -> &str {
        "broadcast"
    }

    async fn emit(&self, event: &AuditEvent) -> Result<()> {
        // 无订阅者时 send 失败属正常
        if let Err(e) = self.sender.send(event.clone()) {
            debug!("审计事件无订阅者: {}", e);
        }
        Ok(())
    }
}

/// 写入 sync_audit_log 表
pub struct SqliteAuditSink {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuditSink {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn emit(&self, event: &AuditEvent) -> Result<()> {
        let row = AuditLogRow {
            run_id: event.run_id.to_string(),
            entity_name: event.entity_name.clone(),
            phase: event.phase.as_str().to_string(),
            is_incremental: event.is_incremental,
            total_records: event.counters.map(|c| c.total_records as i64),
            inserted: event.counters.map(|c| c.inserted as i64),
            updated: event.counters.map(|c| c.updated as i64),
            errors: event.counters.map(|c| c.errors as i64),
            duration_ms: event.counters.map(|c| c.duration_ms as i64),
            message: event.message.clone(),
            created_at: event.timestamp,
        };
        let conn = self.conn.lock().await;
        AuditLogDao::new(&conn).insert(&row)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErpSyncError;
    use crate::storage::SyncDatabase;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn emit(&self, _event: &AuditEvent) -> Result<()> {
            Err(ErpSyncError::Other("sink down".to_string()))
        }
    }

    struct CountingSink(AtomicUsize);

    #[async_trait]
    impl AuditSink for CountingSink {
        fn name(&self) -> &str {
            "counting"
        }

        async fn emit(&self, _event: &AuditEvent) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_the_others() {
        let counting = Arc::new(CountingSink(AtomicUsize::new(0)));
        let emitter = AuditEmitter::new()
            .with_sink(Arc::new(FailingSink))
            .with_sink(counting.clone());
        emitter.emit(AuditEvent::start(Uuid::new_v4(), "produtos", false)).await;
        emitter.emit(AuditEvent::error(Uuid::new_v4(), "produtos", false, "x")).await;
        assert_eq!(counting.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broadcast_sink_delivers_to_subscribers() {
        let sink = Arc::new(BroadcastAuditSink::new(16));
        let mut rx = sink.subscribe();
        let emitter = AuditEmitter::new().with_sink(sink.clone());
        let run_id = Uuid::new_v4();
        let counters = AuditCounters { total_records: 3, inserted: 3, updated: 0, errors: 0, duration_ms: 5 };
        emitter.emit(AuditEvent::complete(run_id, "pessoas", true, counters)).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.run_id, run_id);
        assert_eq!(event.phase, AuditPhase::Complete);
        assert_eq!(event.counters, Some(counters));
        assert!(event.is_incremental);
    }

    #[tokio::test]
    async fn sqlite_sink_persists_rows() {
        let db = SyncDatabase::open_in_memory().unwrap();
        let emitter = AuditEmitter::new().with_sink(Arc::new(SqliteAuditSink::new(db.connection())));
        let run_id = Uuid::new_v4();
        emitter.emit(AuditEvent::start(run_id, "pedidos", false)).await;
        emitter.emit(AuditEvent::error(run_id, "pedidos", false, "HTTP 503: busy")).await;

        let conn = db.connection();
        let conn = conn.lock().await;
        let rows = AuditLogDao::new(&conn).recent("pedidos", 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].phase, "error");
        assert_eq!(rows[0].message.as_deref(), Some("HTTP 503: busy"));
        assert_eq!(rows[1].phase, "start");
        assert!(rows.iter().all(|r| r.run_id == run_id.to_string()));
    }
}
