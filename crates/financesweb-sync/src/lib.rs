//! FinancesWeb Sync - ERP 实体同步引擎
//!
//! 把 FinancesWeb ERP 的实体表（商品、客户/供应商、操作员、订单）拉取到本地 SQLite：
//! - 🔄 全量 / 增量同步，按 chunk 顺序 upsert
//! - 🧩 每种实体一个 upsert 策略，插入写全字段，冲突只刷新易变字段
//! - 📋 每实体一行同步控制记录（状态、上次同步时间、累计条数、最后错误）
//! - 🔍 `field=op.value` 过滤语法，增量子句 `<field>=gt.<ISO 时间>`
//! - 📣 审计事件：tracing / broadcast / sqlite
//! - ⏰ 定时调度与管理员重置
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use financesweb_sync::{ErpSyncService, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SyncConfig::builder()
//!         .data_dir("/var/lib/financesweb")
//!         .api_url("https://erp.example.com/api/query")
//!         .api_key("secret")
//!         .build();
//!
//!     let service = ErpSyncService::initialize(config).await?;
//!
//!     for result in service.perform_incremental_sync(None).await? {
//!         println!("{}: +{} ~{} !{}", result.entity_name, result.inserted, result.updated, result.errors);
//!     }
//!
//!     for status in service.get_sync_status(None).await? {
//!         println!("{} {} {:?}", status.entity_name, status.status, status.last_error);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod service;
pub mod storage;
pub mod sync;
pub mod version;

pub use config::{HttpClientConfig, ScheduleConfig, SyncConfig, SyncConfigBuilder};
pub use error::{ErpSyncError, Result};
pub use fetch::{FilterClause, FilterExpr, FilterOp, FinancesWebClient, RecordSource, SourceRecord};
pub use service::ErpSyncService;
pub use storage::{SyncControlRecord, SyncDatabase, SyncStatus};
pub use sync::{
    spawn_periodic_sync, AuditEvent, AuditPhase, AuditSink, EntityKind, EntitySyncConfig, SchedulerHandle,
    SyncResult, UpsertStrategy,
};
