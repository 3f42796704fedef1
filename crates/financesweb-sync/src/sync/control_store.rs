//! 同步控制存储 - 每个实体一行 sync_control
//!
//! 唯一允许修改控制行的组件。由调用方构造并注入编排器，不做全局单例。
//! `initialize()` 幂等：为每个配置实体插入缺失的 pending 行。

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use rusqlite::Connection;
use tracing::info;

use crate::error::{ErpSyncError, Result};
use crate::storage::dao::SyncControlDao;
use crate::storage::entities::{SyncControlRecord, SyncStatus};

pub struct SyncControlStore {
    conn: Arc<Mutex<Connection>>,
    entities: Vec<String>,
}

impl SyncControlStore {
    pub fn new(conn: Arc<Mutex<Connection>>, entities: Vec<String>) -> Self {
        Self { conn, entities }
    }

    /// 为每个配置实体补齐控制行；返回新建行数
    pub async fn initialize(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let dao = SyncControlDao::new(&conn);
        let now = Utc::now();
        let mut created = 0;
        for entity in &self.entities {
            if dao.insert_if_absent(entity, now)? {
                created += 1;
            }
        }
        if created > 0 {
            info!("同步控制表初始化: 新建 {} 行", created);
        }
        Ok(created)
    }

    /// None 返回全部实体；指定实体不存在时返回空
    pub async fn get_status(&self, entity: Option<&str>) -> Result<Vec<SyncControlRecord>> {
        let conn = self.conn.lock().await;
        let dao = SyncControlDao::new(&conn);
        match entity {
            Some(name) => Ok(dao.get(name)?.into_iter().collect()),
            None => dao.list(),
        }
    }

    pub async fn set_running(&self, entity: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let changed = SyncControlDao::new(&conn).set_status(entity, SyncStatus::Running, Utc::now())?;
        ensure_found(entity, changed)
    }

    /// last_sync/last_record = now，record_count += delta，清空 last_error，状态 completed
    pub async fn record_completion(&self, entity: &str, delta: u64) -> Result<()> {
        let delta = i64::try_from(delta)
            .map_err(|_| ErpSyncError::InvalidArgument(format!("record_count 增量过大: {}", delta)))?;
        let conn = self.conn.lock().await;
        let changed = SyncControlDao::new(&conn).record_completion(entity, delta, Utc::now())?;
        ensure_found(entity, changed)
    }

    pub async fn set_error(&self, entity: &str, message: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let changed = SyncControlDao::new(&conn).set_error(entity, message, Utc::now())?;
        ensure_found(entity, changed)
    }

    pub async fn get_last_sync_at(&self, entity: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().await;
        SyncControlDao::new(&conn).get_last_sync_at(entity)
    }

    /// 管理员重置：控制行原地清回 pending（计数清零，下次增量等同全量），缺失的行补建
    pub async fn reset(&self, entity: Option<&str>) -> Result<usize> {
        let targets: Vec<&str> = match entity {
            Some(name) => {
                if !self.entities.iter().any(|e| e == name) {
                    return Err(ErpSyncError::NotFound(format!("未配置的实体: {}", name)));
                }
                vec![name]
            }
            None => self.entities.iter().map(String::as_str).collect(),
        };

        let conn = self.conn.lock().await;
        let tx = conn.unchecked_transaction()?;
        let dao = SyncControlDao::new(&tx);
        let now = Utc::now();
        for name in &targets {
            if dao.reset_to_pending(name, now)? == 0 {
                dao.insert_if_absent(name, now)?;
            }
        }
        tx.commit()?;
        info!("同步控制已重置: {:?}", targets);
        Ok(targets.len())
    }
}

fn ensure_found(entity: &str, changed: usize) -> Result<()> {
    if changed == 0 {
        return Err(ErpSyncError::NotFound(format!("实体 {} 没有同步控制记录", entity)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SyncDatabase;

    fn store(entities: &[&str]) -> SyncControlStore {
        let db = SyncDatabase::open_in_memory().unwrap();
        SyncControlStore::new(db.connection(), entities.iter().map(|e| e.to_string()).collect())
    }

    #[tokio::test]
    async fn initialize_is_idempotent_and_creates_one_row_per_entity() {
        let store = store(&["produtos", "pessoas"]);
        assert_eq!(store.initialize().await.unwrap(), 2);
        assert_eq!(store.initialize().await.unwrap(), 0);

        let all = store.get_status(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.status == SyncStatus::Pending && r.record_count == 0));
        assert_eq!(store.get_status(Some("pessoas")).await.unwrap().len(), 1);
        assert!(store.get_status(Some("boletos")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lifecycle_running_completed_error_running() {
        let store = store(&["pedidos"]);
        store.initialize().await.unwrap();

        store.set_running("pedidos").await.unwrap();
        assert_eq!(store.get_status(Some("pedidos")).await.unwrap()[0].status, SyncStatus::Running);

        store.record_completion("pedidos", 4).await.unwrap();
        let first_sync = store.get_last_sync_at("pedidos").await.unwrap().unwrap();

        store.set_running("pedidos").await.unwrap();
        store.set_error("pedidos", "HTTP 500: down").await.unwrap();
        let record = store.get_status(Some("pedidos")).await.unwrap().remove(0);
        assert_eq!(record.status, SyncStatus::Error);
        assert_eq!(record.last_error.as_deref(), Some("HTTP 500: down"));
        assert_eq!(record.record_count, 4);
        // 失败不推进 last_sync
        assert_eq!(store.get_last_sync_at("pedidos").await.unwrap(), Some(first_sync));

        store.set_running("pedidos").await.unwrap();
        assert_eq!(store.get_status(Some("pedidos")).await.unwrap()[0].status, SyncStatus::Running);
    }

    #[tokio::test]
    async fn mutating_unknown_entity_is_not_found() {
        let store = store(&["produtos"]);
        store.initialize().await.unwrap();
        assert!(matches!(store.set_running("boletos").await, Err(ErpSyncError::NotFound(_))));
        assert!(matches!(store.record_completion("boletos", 1).await, Err(ErpSyncError::NotFound(_))));
    }

    #[tokio::test]
    async fn reset_recreates_pending_rows() {
        let store = store(&["produtos", "pessoas"]);
        store.initialize().await.unwrap();
        store.record_completion("produtos", 10).await.unwrap();
        store.record_completion("pessoas", 3).await.unwrap();

        assert_eq!(store.reset(Some("produtos")).await.unwrap(), 1);
        let produtos = store.get_status(Some("produtos")).await.unwrap().remove(0);
        assert_eq!(produtos.status, SyncStatus::Pending);
        assert_eq!(produtos.record_count, 0);
        assert!(produtos.last_sync_at.is_none());
        assert_eq!(store.get_status(Some("pessoas")).await.unwrap()[0].record_count, 3);

        assert_eq!(store.reset(None).await.unwrap(), 2);
        let names: Vec<_> = store
            .get_status(None)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.entity_name)
            .collect();
        assert_eq!(names, vec!["produtos", "pessoas"]);
        assert!(matches!(store.reset(Some("boletos")).await, Err(ErpSyncError::NotFound(_))));
    }

    #[tokio::test]
    async fn reset_keeps_configuration_order_and_restores_missing_rows() {
        let db = SyncDatabase::open_in_memory().unwrap();
        let store = SyncControlStore::new(
            db.connection(),
            vec!["produtos".to_string(), "pessoas".to_string(), "operadores".to_string()],
        );
        store.initialize().await.unwrap();
        store.record_completion("produtos", 2).await.unwrap();
        {
            let conn = db.connection();
            let conn = conn.lock().await;
            conn.execute("DELETE FROM sync_control WHERE entity = 'operadores'", []).unwrap();
        }

        assert_eq!(store.reset(Some("produtos")).await.unwrap(), 1);
        assert_eq!(store.reset(Some("operadores")).await.unwrap(), 1);

        let status = store.get_status(None).await.unwrap();
        let names: Vec<_> = status.iter().map(|r| r.entity_name.as_str()).collect();
        assert_eq!(names, vec!["produtos", "pessoas", "operadores"]);
        assert!(status.iter().all(|r| r.status == SyncStatus::Pending && r.record_count == 0));
    }
}
