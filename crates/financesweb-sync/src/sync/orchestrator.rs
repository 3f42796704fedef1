//! 同步编排器
//!
//! 职责：
//! - 按配置顺序逐个实体执行全量 / 增量同步
//! - 构造增量过滤、拉取、分块交给 upsert 策略
//! - 维护控制行状态并发出审计事件
//!
//! 严格顺序执行：实体一个接一个，chunk 按源顺序一个接一个。
//! 单个实体失败只标记该实体 Error，不中断整次调用。

use rusqlite::Connection;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::audit::{AuditEmitter, AuditEvent};
use super::control_store::SyncControlStore;
use super::entity::EntitySyncConfig;
use super::result::SyncResult;
use super::strategy::{ensure_target_table, StrategyRegistry};
use crate::error::{ErpSyncError, Result};
use crate::fetch::{incremental_filter, RecordSource};

pub struct SyncOrchestrator {
    entities: Vec<EntitySyncConfig>,
    conn: Arc<Mutex<Connection>>,
    control: Arc<SyncControlStore>,
    source: Arc<dyn RecordSource>,
    strategies: StrategyRegistry,
    audit: AuditEmitter,
}

impl SyncOrchestrator {
    pub fn new(
        entities: Vec<EntitySyncConfig>,
        conn: Arc<Mutex<Connection>>,
        control: Arc<SyncControlStore>,
        source: Arc<dyn RecordSource>,
        strategies: StrategyRegistry,
        audit: AuditEmitter,
    ) -> Self {
        Self {
            entities,
            conn,
            control,
            source,
            strategies,
            audit,
        }
    }

    pub fn entities(&self) -> &[EntitySyncConfig] {
        &self.entities
    }

    /// 全量同步；`entity_filter` 为 None 时同步全部配置实体
    pub async fn perform_full_sync(&self, entity_filter: Option<&[&str]>) -> Result<Vec<SyncResult>> {
        self.run(entity_filter, false).await
    }

    /// 增量同步；没有增量字段的实体被跳过
    pub async fn perform_incremental_sync(&self, entity_filter: Option<&[&str]>) -> Result<Vec<SyncResult>> {
        self.run(entity_filter, true).await
    }

    async fn run(&self, entity_filter: Option<&[&str]>, incremental: bool) -> Result<Vec<SyncResult>> {
        let selected = self.select_entities(entity_filter)?;
        let run_id = Uuid::new_v4();
        let mode = if incremental { "增量" } else { "全量" };
        info!("🔄 开始{}同步: run_id={}, 实体数={}", mode, run_id, selected.len());

        let mut results = Vec::with_capacity(selected.len());
        for config in selected {
            if incremental && !config.supports_incremental() {
                warn!("⏭️ 实体 {} 没有增量字段，跳过增量同步", config.entity_name);
                continue;
            }

            match self.sync_entity(run_id, config, incremental).await {
                Ok(result) => results.push(result),
                Err(e) => self.fail_entity(run_id, config, incremental, &e).await,
            }
        }

        info!("✅ {}同步结束: run_id={}, 成功实体数={}", mode, run_id, results.len());
        Ok(results)
    }

    /// 按配置顺序返回要同步的实体；过滤中出现未配置的实体直接拒绝
    fn select_entities(&self, entity_filter: Option<&[&str]>) -> Result<Vec<&EntitySyncConfig>> {
        let Some(names) = entity_filter else {
            return Ok(self.entities.iter().collect());
        };

        if let Some(unknown) = names
            .iter()
            .find(|name| !self.entities.iter().any(|c| c.entity_name == **name))
        {
            return Err(ErpSyncError::InvalidArgument(format!("未配置的实体: {}", unknown)));
        }

        Ok(self
            .entities
            .iter()
            .filter(|c| names.contains(&c.entity_name.as_str()))
            .collect())
    }

    async fn sync_entity(
        &self,
        run_id: Uuid,
        config: &EntitySyncConfig,
        incremental: bool,
    ) -> Result<SyncResult> {
        let started = Instant::now();
        let name = config.entity_name.as_str();

        self.control.set_running(name).await?;
        self.audit.emit(AuditEvent::start(run_id, name, incremental)).await;

        let strategy = self
            .strategies
            .get(name)
            .ok_or_else(|| ErpSyncError::NotFound(format!("实体 {} 没有注册 upsert 策略", name)))?;
        ensure_target_table(config, strategy.as_ref())?;

        // 增量截止时间；全量运行为 None
        let mut cutoff = None;
        let filter = match (incremental, config.incremental_field.as_deref()) {
            (true, Some(field)) => {
                cutoff = self.control.get_last_sync_at(name).await?;
                if cutoff.is_none() {
                    info!("实体 {} 尚无同步记录，增量按全量拉取", name);
                }
                incremental_filter(field, cutoff.as_ref(), config.static_filter.as_deref())
            }
            _ => config.static_filter.clone(),
        };

        debug!("拉取 {}: tabela={}, filtro={:?}", name, config.source_endpoint, filter);
        let records = self
            .source
            .fetch_records(&config.source_endpoint, filter.as_deref())
            .await?;

        let mut result = SyncResult::new(name, incremental);
        result.total_records = records.len() as u64;
        result.last_sync_date = cutoff;

        if records.is_empty() {
            info!("实体 {} 没有需要同步的记录", name);
        }

        let chunk_size = config.chunk_size.max(1);
        for (index, chunk) in records.chunks(chunk_size).enumerate() {
            let outcome = {
                let conn = self.conn.lock().await;
                strategy.apply(&conn, chunk)
            };
            match outcome {
                Ok(outcome) => {
                    debug!(
                        "{} chunk #{}: inserted={}, updated={}, failed={}",
                        name, index, outcome.inserted, outcome.updated, outcome.failed
                    );
                    result.inserted += outcome.inserted as u64;
                    result.updated += outcome.updated as u64;
                    result.errors += outcome.failed as u64;
                }
                Err(e) => {
                    warn!("⚠️ {} chunk #{} ({} 条) 整体失败: {}", name, index, chunk.len(), e);
                    result.errors += chunk.len() as u64;
                }
            }
        }

        self.control.record_completion(name, result.processed()).await?;
        result.duration_ms = started.elapsed().as_millis() as u64;

        if result.has_errors() {
            warn!(
                "⚠️ 实体 {} 同步完成但有 {} 条失败 (total={}, inserted={}, updated={})",
                name, result.errors, result.total_records, result.inserted, result.updated
            );
        } else {
            info!(
                "✅ 实体 {} 同步完成: total={}, inserted={}, updated={}, {}ms",
                name, result.total_records, result.inserted, result.updated, result.duration_ms
            );
        }

        self.audit
            .emit(AuditEvent::complete(run_id, name, incremental, result.counters()))
            .await;
        Ok(result)
    }

    async fn fail_entity(&self, run_id: Uuid, config: &EntitySyncConfig, incremental: bool, err: &ErpSyncError) {
        let name = config.entity_name.as_str();
        let message = err.to_string();
        if err.is_fetch_error() {
            error!("❌ 实体 {} 拉取失败 (status={:?}): {}", name, err.http_status(), message);
        } else {
            error!("❌ 实体 {} 同步失败: {}", name, message);
        }

        if let Err(e) = self.control.set_error(name, &message).await {
            error!("❌ 无法记录实体 {} 的错误状态: {}", name, e);
        }
        self.audit
            .emit(AuditEvent::error(run_id, name, incremental, message))
            .await;
    }
}
