//! 存储模块 - 本地 SQLite
//!
//! - SyncDatabase: 打开/初始化数据库，持有共享连接
//! - DAO Layer: 每张表一个模块
//! - Entities: 行结构

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{ErpSyncError, Result};

pub mod dao;
pub mod entities;
pub mod migrate;

pub use dao::{DaoFactory, TransactionManager};
pub use entities::*;

/// 共享数据库句柄（单连接，同步调用在锁内完成）
#[derive(Debug, Clone)]
pub struct SyncDatabase {
    path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl SyncDatabase {
    /// 打开（必要时创建）数据库文件并执行 migrations
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await
                    .map_err(|e| ErpSyncError::IO(format!("创建数据库目录失败: {}", e)))?;
            }
        }

        let mut conn = Connection::open(path)
            .map_err(|e| ErpSyncError::Database(format!("打开数据库失败 {}: {}", path.display(), e)))?;
        migrate::init_db(&mut conn)?;

        tracing::info!("数据库初始化完成: {}", path.display());

        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 内存数据库（测试、演示）
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrate::init_db(&mut conn)?;
        Ok(Self {
            path: None,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_creates_parent_dirs_and_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sync.db");
        let db = SyncDatabase::open(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));

        let conn = db.connection();
        let conn = conn.lock().await;
        assert_eq!(dao::count_rows(&conn, "sync_control").unwrap(), 0);
    }

    #[tokio::test]
    async fn reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync.db");
        {
            let db = SyncDatabase::open(&path).await.unwrap();
            let conn = db.connection();
            let conn = conn.lock().await;
            DaoFactory::sync_control_dao(&conn).insert_if_absent("produtos", chrono::Utc::now()).unwrap();
        }
        let db = SyncDatabase::open(&path).await.unwrap();
        let conn = db.connection();
        let conn = conn.lock().await;
        assert!(DaoFactory::sync_control_dao(&conn).get("produtos").unwrap().is_some());
    }
}
