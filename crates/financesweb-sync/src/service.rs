//! 同步服务 - ErpSyncService 主入口
//!
//! 分层：
//! ```text
//! ErpSyncService (触发接口 + 运行锁)
//!   ├── SyncOrchestrator (编排)
//!   │     ├── RecordSource (FinancesWebClient)
//!   │     ├── StrategyRegistry (upsert 策略)
//!   │     └── AuditEmitter (tracing / broadcast / sqlite)
//!   ├── SyncControlStore (控制行)
//!   └── SyncDatabase (SQLite)
//! ```
//!
//! 同一进程内的所有运行（全量、增量、重置）经同一把异步锁串行化，
//! 定时任务与管理员手动触发不会交错。

use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use crate::config::SyncConfig;
use crate::error::Result;
use crate::fetch::{FinancesWebClient, RecordSource};
use crate::storage::{SyncControlRecord, SyncDatabase};
use crate::sync::{
    AuditEmitter, AuditEvent, BroadcastAuditSink, SqliteAuditSink, StrategyRegistry, SyncControlStore,
    SyncOrchestrator, SyncResult, TracingAuditSink,
};

/// 审计广播缓冲
const AUDIT_CHANNEL_CAPACITY: usize = 256;

pub struct ErpSyncService {
    config: SyncConfig,
    db: SyncDatabase,
    control: Arc<SyncControlStore>,
    orchestrator: SyncOrchestrator,
    audit_broadcast: Arc<BroadcastAuditSink>,
    run_lock: Mutex<()>,
}

impl ErpSyncService {
    /// 校验配置、打开数据库、创建 FinancesWeb 客户端
    pub async fn initialize(config: SyncConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let db = SyncDatabase::open(&config.database_path()).await?;
        let client: Arc<dyn RecordSource> = Arc::new(FinancesWebClient::new(&config)?);
        let service = Self::with_source(config, db, client).await?;
        Ok(Arc::new(service))
    }

    /// 使用默认策略注册表和自定义记录源
    pub async fn with_source(config: SyncConfig, db: SyncDatabase, source: Arc<dyn RecordSource>) -> Result<Self> {
        let strategies = StrategyRegistry::from_configs(&config.resolved_entities())?;
        Self::with_components(config, db, source, strategies).await
    }

    pub async fn with_components(
        config: SyncConfig,
        db: SyncDatabase,
        source: Arc<dyn RecordSource>,
        strategies: StrategyRegistry,
    ) -> Result<Self> {
        let entities = config.resolved_entities();
        let control = Arc::new(SyncControlStore::new(
            db.connection(),
            entities.iter().map(|e| e.entity_name.clone()).collect(),
        ));
        control.initialize().await?;

        let audit_broadcast = Arc::new(BroadcastAuditSink::new(AUDIT_CHANNEL_CAPACITY));
        let audit = AuditEmitter::new()
            .with_sink(Arc::new(TracingAuditSink))
            .with_sink(audit_broadcast.clone())
            .with_sink(Arc::new(SqliteAuditSink::new(db.connection())));

        let orchestrator = SyncOrchestrator::new(
            entities,
            db.connection(),
            control.clone(),
            source,
            strategies,
            audit,
        );

        info!("✅ ErpSyncService 初始化完成 ({})", crate::version::version_line());

        Ok(Self {
            config,
            db,
            control,
            orchestrator,
            audit_broadcast,
            run_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn database(&self) -> &SyncDatabase {
        &self.db
    }

    /// 全量同步；`entity` 为 None 时同步全部实体
    pub async fn perform_full_sync(&self, entity: Option<&str>) -> Result<Vec<SyncResult>> {
        let _guard = self.run_lock.lock().await;
        let names = entity.map(|e| [e]);
        self.orchestrator.perform_full_sync(names.as_ref().map(|n| &n[..])).await
    }

    /// 增量同步；没有增量字段的实体被跳过
    pub async fn perform_incremental_sync(&self, entity: Option<&str>) -> Result<Vec<SyncResult>> {
        let _guard = self.run_lock.lock().await;
        let names = entity.map(|e| [e]);
        self.orchestrator
            .perform_incremental_sync(names.as_ref().map(|n| &n[..]))
            .await
    }

    pub async fn get_sync_status(&self, entity: Option<&str>) -> Result<Vec<SyncControlRecord>> {
        self.control.get_status(entity).await
    }

    /// 管理员重置：控制行回到 pending，下一次增量等同全量
    pub async fn reset_sync_state(&self, entity: Option<&str>) -> Result<usize> {
        let _guard = self.run_lock.lock().await;
        self.control.reset(entity).await
    }

    pub fn subscribe_audit(&self) -> broadcast::Receiver<AuditEvent> {
        self.audit_broadcast.subscribe()
    }

    /// 当前是否有运行持有锁
    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }
}
