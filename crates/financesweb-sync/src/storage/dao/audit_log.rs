//! 审计日志 DAO - sync_audit_log 表

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::storage::entities::AuditLogRow;

pub struct AuditLogDao<'a> {
    conn: &'a Connection,
}

impl<'a> AuditLogDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, row: &AuditLogRow) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sync_audit_log (run_id, entity, phase, is_incremental, total_records, inserted,
                                         updated, errors, duration_ms, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                row.run_id,
                row.entity_name,
                row.phase,
                row.is_incremental as i32,
                row.total_records,
                row.inserted,
                row.updated,
                row.errors,
                row.duration_ms,
                row.message,
                row.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// 某实体最近的审计记录（新 → 旧）
    pub fn recent(&self, entity: &str, limit: u32) -> Result<Vec<AuditLogRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, entity, phase, is_incremental, total_records, inserted, updated, errors,
                    duration_ms, message, created_at
             FROM sync_audit_log WHERE entity = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![entity, limit], |row| {
            Ok(AuditLogRow {
                run_id: row.get(0)?,
                entity_name: row.get(1)?,
                phase: row.get(2)?,
                is_incremental: row.get::<_, i32>(3)? != 0,
                total_records: row.get(4)?,
                inserted: row.get(5)?,
                updated: row.get(6)?,
                errors: row.get(7)?,
                duration_ms: row.get(8)?,
                message: row.get(9)?,
                created_at: row.get(10)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
