//! ERP 同步模块
//!
//! 职责：
//! - 实体配置与 upsert 策略注册
//! - 同步控制行（每实体一行）的读写
//! - 全量 / 增量编排、审计事件
//! - 定时调度

pub mod audit;
pub mod control_store;
pub mod entity;
pub mod orchestrator;
pub mod result;
pub mod scheduler;
pub mod strategy;

#[cfg(test)]
pub(crate) mod test_support;

pub use audit::{
    AuditCounters, AuditEmitter, AuditEvent, AuditPhase, AuditSink, BroadcastAuditSink, SqliteAuditSink,
    TracingAuditSink,
};
pub use control_store::SyncControlStore;
pub use entity::{default_entity_configs, EntityKind, EntitySyncConfig, DEFAULT_CHUNK_SIZE};
pub use orchestrator::SyncOrchestrator;
pub use result::SyncResult;
pub use scheduler::{spawn_periodic_sync, SchedulerHandle};
pub use strategy::{ChunkOutcome, StrategyRegistry, UpsertStrategy};
