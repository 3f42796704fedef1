//! 操作员 DAO - operators 表

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::storage::entities::{Operator, UpsertOutcome};

pub struct OperatorDao<'a> {
    conn: &'a Connection,
}

impl<'a> OperatorDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn upsert(&self, o: &Operator, synced_at: DateTime<Utc>) -> Result<UpsertOutcome> {
        let sql = r#"
            INSERT INTO operators (external_id, name, login, email, phone, role, status, source_updated_at, synced_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(external_id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                role = excluded.role,
                status = excluded.status,
                source_updated_at = excluded.source_updated_at,
                synced_at = excluded.synced_at,
                sync_update_count = operators.sync_update_count + 1
            RETURNING sync_update_count
        "#;
        let count: i64 = self.conn.query_row(
            sql,
            params![
                o.external_id,
                o.name,
                o.login,
                o.email,
                o.phone,
                o.role,
                o.status,
                o.source_updated_at,
                synced_at,
            ],
            |row| row.get(0),
        )?;
        Ok(UpsertOutcome::from_update_count(count))
    }

    pub fn get_by_id(&self, external_id: &str) -> Result<Option<Operator>> {
        let sql = r#"SELECT external_id, name, login, email, phone, role, status, source_updated_at
                     FROM operators WHERE external_id = ?1"#;
        let operator = self
            .conn
            .query_row(sql, params![external_id], |row| {
                Ok(Operator {
                    external_id: row.get(0)?,
                    name: row.get(1)?,
                    login: row.get(2)?,
                    email: row.get(3)?,
                    phone: row.get(4)?,
                    role: row.get(5)?,
                    status: row.get(6)?,
                    source_updated_at: row.get(7)?,
                })
            })
            .optional()?;
        Ok(operator)
    }
}
