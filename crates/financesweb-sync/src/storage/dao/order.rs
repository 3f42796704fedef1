//! 订单 DAO - orders 表（订单项粒度）

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::storage::entities::{Order, UpsertOutcome};

pub struct OrderDao<'a> {
    conn: &'a Connection,
}

impl<'a> OrderDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 已存在时只改状态、修改时间、数量与金额
    pub fn upsert(&self, o: &Order, synced_at: DateTime<Utc>) -> Result<UpsertOutcome> {
        let sql = r#"
            INSERT INTO orders (external_id, order_number, party_id, operator_id, product_id, situation,
                                issued_at, modified_at, quantity, delivered_quantity, unit_price, item_total,
                                notes, synced_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(external_id) DO UPDATE SET
                situation = excluded.situation,
                modified_at = excluded.modified_at,
                quantity = excluded.quantity,
                delivered_quantity = excluded.delivered_quantity,
                unit_price = excluded.unit_price,
                item_total = excluded.item_total,
                synced_at = excluded.synced_at,
                sync_update_count = orders.sync_update_count + 1
            RETURNING sync_update_count
        "#;
        let count: i64 = self.conn.query_row(
            sql,
            params![
                o.external_id,
                o.order_number,
                o.party_id,
                o.operator_id,
                o.product_id,
                o.situation,
                o.issued_at,
                o.modified_at,
                o.quantity,
                o.delivered_quantity,
                o.unit_price,
                o.item_total,
                o.notes,
                synced_at,
            ],
            |row| row.get(0),
        )?;
        Ok(UpsertOutcome::from_update_count(count))
    }

    pub fn get_by_id(&self, external_id: &str) -> Result<Option<Order>> {
        let sql = r#"SELECT external_id, order_number, party_id, operator_id, product_id, situation, issued_at,
                            modified_at, quantity, delivered_quantity, unit_price, item_total, notes
                     FROM orders WHERE external_id = ?1"#;
        let order = self
            .conn
            .query_row(sql, params![external_id], |row| {
                Ok(Order {
                    external_id: row.get(0)?,
                    order_number: row.get(1)?,
                    party_id: row.get(2)?,
                    operator_id: row.get(3)?,
                    product_id: row.get(4)?,
                    situation: row.get(5)?,
                    issued_at: row.get(6)?,
                    modified_at: row.get(7)?,
                    quantity: row.get(8)?,
                    delivered_quantity: row.get(9)?,
                    unit_price: row.get(10)?,
                    item_total: row.get(11)?,
                    notes: row.get(12)?,
                })
            })
            .optional()?;
        Ok(order)
    }
}
