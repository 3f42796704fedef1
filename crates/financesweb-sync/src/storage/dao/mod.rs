//! 数据访问层 (DAO) - 每张表一个模块，借用 `&Connection`

pub mod sync_control;
pub mod product;
pub mod party;
pub mod operator;
pub mod order;
pub mod audit_log;

pub use sync_control::SyncControlDao;
pub use product::ProductDao;
pub use party::PartyDao;
pub use operator::OperatorDao;
pub use order::OrderDao;
pub use audit_log::AuditLogDao;

use rusqlite::Connection;
use crate::error::{ErpSyncError, Result};

/// DAO 工厂
pub struct DaoFactory;

impl DaoFactory {
    pub fn sync_control_dao(conn: &Connection) -> SyncControlDao<'_> {
        SyncControlDao::new(conn)
    }

    pub fn product_dao(conn: &Connection) -> ProductDao<'_> {
        ProductDao::new(conn)
    }

    pub fn party_dao(conn: &Connection) -> PartyDao<'_> {
        PartyDao::new(conn)
    }

    pub fn operator_dao(conn: &Connection) -> OperatorDao<'_> {
        OperatorDao::new(conn)
    }

    pub fn order_dao(conn: &Connection) -> OrderDao<'_> {
        OrderDao::new(conn)
    }

    pub fn audit_log_dao(conn: &Connection) -> AuditLogDao<'_> {
        AuditLogDao::new(conn)
    }
}

/// 事务管理器 - 一个 chunk 一个事务
pub struct TransactionManager<'a> {
    conn: &'a Connection,
}

impl<'a> TransactionManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 在事务中执行 f；f 返回 Err 时回滚
    pub fn execute<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let tx = self.conn.unchecked_transaction()
            .map_err(|e| ErpSyncError::Database(format!("开始事务失败: {}", e)))?;

        let result = f(self.conn)?;

        tx.commit()
            .map_err(|e| ErpSyncError::Database(format!("提交事务失败: {}", e)))?;

        Ok(result)
    }
}

/// 统计表行数（测试与状态展示用）
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ErpSyncError::InvalidArgument(format!("非法表名: {}", table)));
    }
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
    Ok(count)
}
