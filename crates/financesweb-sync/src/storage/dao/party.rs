//! 往来单位 DAO - parties 表（客户/供应商共用）

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::storage::entities::{Party, UpsertOutcome};

pub struct PartyDao<'a> {
    conn: &'a Connection,
}

impl<'a> PartyDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 已存在时更新全部联系方式/地址/状态字段，document 与 person_type 保持首次写入值
    pub fn upsert(&self, p: &Party, synced_at: DateTime<Utc>) -> Result<UpsertOutcome> {
        let sql = r#"
            INSERT INTO parties (external_id, name, trade_name, document, person_type, is_customer, is_supplier,
                                 email, phone, mobile, street, number, complement, district, city, state,
                                 zip_code, status, source_updated_at, synced_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
            ON CONFLICT(external_id) DO UPDATE SET
                name = excluded.name,
                trade_name = excluded.trade_name,
                is_customer = excluded.is_customer,
                is_supplier = excluded.is_supplier,
                email = excluded.email,
                phone = excluded.phone,
                mobile = excluded.mobile,
                street = excluded.street,
                number = excluded.number,
                complement = excluded.complement,
                district = excluded.district,
                city = excluded.city,
                state = excluded.state,
                zip_code = excluded.zip_code,
                status = excluded.status,
                source_updated_at = excluded.source_updated_at,
                synced_at = excluded.synced_at,
                sync_update_count = parties.sync_update_count + 1
            RETURNING sync_update_count
        "#;
        let count: i64 = self.conn.query_row(
            sql,
            params![
                p.external_id,
                p.name,
                p.trade_name,
                p.document,
                p.person_type,
                p.is_customer as i32,
                p.is_supplier as i32,
                p.email,
                p.phone,
                p.mobile,
                p.street,
                p.number,
                p.complement,
                p.district,
                p.city,
                p.state,
                p.zip_code,
                p.status,
                p.source_updated_at,
                synced_at,
            ],
            |row| row.get(0),
        )?;
        Ok(UpsertOutcome::from_update_count(count))
    }

    pub fn get_by_id(&self, external_id: &str) -> Result<Option<Party>> {
        let sql = r#"SELECT external_id, name, trade_name, document, person_type, is_customer, is_supplier,
                            email, phone, mobile, street, number, complement, district, city, state,
                            zip_code, status, source_updated_at
                     FROM parties WHERE external_id = ?1"#;
        let party = self
            .conn
            .query_row(sql, params![external_id], |row| {
                Ok(Party {
                    external_id: row.get(0)?,
                    name: row.get(1)?,
                    trade_name: row.get(2)?,
                    document: row.get(3)?,
                    person_type: row.get(4)?,
                    is_customer: row.get::<_, i32>(5)? != 0,
                    is_supplier: row.get::<_, i32>(6)? != 0,
                    email: row.get(7)?,
                    phone: row.get(8)?,
                    mobile: row.get(9)?,
                    street: row.get(10)?,
                    number: row.get(11)?,
                    complement: row.get(12)?,
                    district: row.get(13)?,
                    city: row.get(14)?,
                    state: row.get(15)?,
                    zip_code: row.get(16)?,
                    status: row.get(17)?,
                    source_updated_at: row.get(18)?,
                })
            })
            .optional()?;
        Ok(party)
    }
}
