//! 同步控制 DAO - sync_control 表（每实体一行）

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;

use crate::error::Result;
use crate::storage::entities::{SyncControlRecord, SyncStatus};

const SELECT_COLUMNS: &str =
    "SELECT entity, last_sync_date, last_record_date, record_count, status, last_error FROM sync_control";

pub struct SyncControlDao<'a> {
    conn: &'a Connection,
}

impl<'a> SyncControlDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 不存在则插入 pending 行；返回是否新插入
    pub fn insert_if_absent(&self, entity: &str, now: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO sync_control (entity, status, record_count, updated_at) VALUES (?1, 'pending', 0, ?2)
             ON CONFLICT(entity) DO NOTHING",
            params![entity, now],
        )?;
        Ok(changed > 0)
    }

    pub fn get(&self, entity: &str) -> Result<Option<SyncControlRecord>> {
        let sql = format!("{} WHERE entity = ?1", SELECT_COLUMNS);
        let record = self
            .conn
            .query_row(&sql, params![entity], row_to_record)
            .optional()?;
        Ok(record)
    }

    pub fn list(&self) -> Result<Vec<SyncControlRecord>> {
        let sql = format!("{} ORDER BY id ASC", SELECT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_record)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_last_sync_at(&self, entity: &str) -> Result<Option<DateTime<Utc>>> {
        let value: Option<Option<DateTime<Utc>>> = self
            .conn
            .query_row(
                "SELECT last_sync_date FROM sync_control WHERE entity = ?1",
                params![entity],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    /// 返回受影响行数（0 表示实体不存在）
    pub fn set_status(&self, entity: &str, status: SyncStatus, now: DateTime<Utc>) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE sync_control SET status = ?1, updated_at = ?2 WHERE entity = ?3",
            params![status.as_str(), now, entity],
        )?;
        Ok(changed)
    }

    pub fn record_completion(&self, entity: &str, delta: i64, now: DateTime<Utc>) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE sync_control
             SET last_sync_date = ?1,
                 last_record_date = ?1,
                 record_count = record_count + ?2,
                 last_error = NULL,
                 status = 'completed',
                 updated_at = ?1
             WHERE entity = ?3",
            params![now, delta, entity],
        )?;
        Ok(changed)
    }

    pub fn set_error(&self, entity: &str, message: &str, now: DateTime<Utc>) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE sync_control SET status = 'error', last_error = ?1, updated_at = ?2 WHERE entity = ?3",
            params![message, now, entity],
        )?;
        Ok(changed)
    }

    /// 原地清回 pending：清空时间、计数与错误，保留 id 与行序
    pub fn reset_to_pending(&self, entity: &str, now: DateTime<Utc>) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE sync_control
             SET status = 'pending',
                 last_sync_date = NULL,
                 last_record_date = NULL,
                 record_count = 0,
                 last_error = NULL,
                 updated_at = ?1
             WHERE entity = ?2",
            params![now, entity],
        )?;
        Ok(changed)
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<SyncControlRecord> {
    let status_text: String = row.get(4)?;
    let status = SyncStatus::from_str(&status_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(SyncControlRecord {
        entity_name: row.get(0)?,
        last_sync_at: row.get(1)?,
        last_record_at: row.get(2)?,
        record_count: row.get(3)?,
        status,
        last_error: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::dao::test_support::open_db;

    #[test]
    fn insert_if_absent_is_idempotent() {
        let conn = open_db();
        let dao = SyncControlDao::new(&conn);
        assert!(dao.insert_if_absent("produtos", Utc::now()).unwrap());
        assert!(!dao.insert_if_absent("produtos", Utc::now()).unwrap());
        let list = dao.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].status, SyncStatus::Pending);
        assert_eq!(list[0].record_count, 0);
        assert!(list[0].last_sync_at.is_none());
    }

    #[test]
    fn completion_accumulates_count_and_clears_error() {
        let conn = open_db();
        let dao = SyncControlDao::new(&conn);
        dao.insert_if_absent("pedidos", Utc::now()).unwrap();
        let now = Utc::now();
        dao.set_error("pedidos", "boom", now).unwrap();
        assert_eq!(dao.get("pedidos").unwrap().unwrap().last_error.as_deref(), Some("boom"));

        dao.record_completion("pedidos", 5, now).unwrap();
        dao.record_completion("pedidos", 2, now).unwrap();
        let record = dao.get("pedidos").unwrap().unwrap();
        assert_eq!(record.record_count, 7);
        assert_eq!(record.status, SyncStatus::Completed);
        assert!(record.last_error.is_none());
        assert_eq!(
            record.last_sync_at.unwrap().timestamp_millis(),
            now.timestamp_millis()
        );
        assert_eq!(record.last_sync_at, record.last_record_at);
    }

    #[test]
    fn updates_on_unknown_entity_touch_nothing() {
        let conn = open_db();
        let dao = SyncControlDao::new(&conn);
        assert_eq!(dao.set_status("nope", SyncStatus::Running, Utc::now()).unwrap(), 0);
        assert!(dao.get_last_sync_at("nope").unwrap().is_none());
    }

    #[test]
    fn reset_to_pending_keeps_row_position() {
        let conn = open_db();
        let dao = SyncControlDao::new(&conn);
        for entity in ["produtos", "pessoas", "operadores"] {
            dao.insert_if_absent(entity, Utc::now()).unwrap();
        }
        dao.record_completion("produtos", 4, Utc::now()).unwrap();
        dao.set_error("pessoas", "boom", Utc::now()).unwrap();

        assert_eq!(dao.reset_to_pending("produtos", Utc::now()).unwrap(), 1);
        assert_eq!(dao.reset_to_pending("pessoas", Utc::now()).unwrap(), 1);
        assert_eq!(dao.reset_to_pending("boletos", Utc::now()).unwrap(), 0);

        let list = dao.list().unwrap();
        let names: Vec<_> = list.iter().map(|r| r.entity_name.as_str()).collect();
        assert_eq!(names, vec!["produtos", "pessoas", "operadores"]);
        for record in &list[..2] {
            assert_eq!(record.status, SyncStatus::Pending);
            assert_eq!(record.record_count, 0);
            assert!(record.last_sync_at.is_none() && record.last_record_at.is_none());
            assert!(record.last_error.is_none());
        }
    }

    #[test]
    fn updated_at_has_one_format_for_default_and_dao_writes() {
        let conn = open_db();
        let dao = SyncControlDao::new(&conn);
        dao.insert_if_absent("produtos", Utc::now()).unwrap();
        dao.insert_if_absent("pessoas", Utc::now()).unwrap();
        dao.set_status("pessoas", SyncStatus::Running, Utc::now()).unwrap();
        conn.execute("INSERT INTO sync_control (entity) VALUES ('pedidos')", []).unwrap();

        let mut stmt = conn.prepare("SELECT updated_at FROM sync_control ORDER BY id").unwrap();
        let texts: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(texts.len(), 3);
        for text in &texts {
            assert_eq!(text.as_bytes()[10], b' ', "{}", text);
            assert!(text.ends_with("+00:00"), "{}", text);
        }

        let parsed: Vec<DateTime<Utc>> = conn
            .prepare("SELECT updated_at FROM sync_control ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(parsed.len(), 3);
    }
}
