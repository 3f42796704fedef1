//! 商品 DAO - products 表

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::storage::entities::{Product, UpsertOutcome};

pub struct ProductDao<'a> {
    conn: &'a Connection,
}

impl<'a> ProductDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 新行写入全部字段；已存在只改价格/库存/状态
    pub fn upsert(&self, p: &Product, synced_at: DateTime<Utc>) -> Result<UpsertOutcome> {
        let sql = r#"
            INSERT INTO products (external_id, code, description, unit, barcode, group_name, brand,
                                  cost_price, price, current_stock, minimum_stock, status,
                                  source_updated_at, synced_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(external_id) DO UPDATE SET
                status = excluded.status,
                price = excluded.price,
                current_stock = excluded.current_stock,
                minimum_stock = excluded.minimum_stock,
                source_updated_at = excluded.source_updated_at,
                synced_at = excluded.synced_at,
                sync_update_count = products.sync_update_count + 1
            RETURNING sync_update_count
        "#;
        let count: i64 = self.conn.query_row(
            sql,
            params![
                p.external_id,
                p.code,
                p.description,
                p.unit,
                p.barcode,
                p.group_name,
                p.brand,
                p.cost_price,
                p.price,
                p.current_stock,
                p.minimum_stock,
                p.status,
                p.source_updated_at,
                synced_at,
            ],
            |row| row.get(0),
        )?;
        Ok(UpsertOutcome::from_update_count(count))
    }

    pub fn get_by_id(&self, external_id: &str) -> Result<Option<Product>> {
        let sql = r#"SELECT external_id, code, description, unit, barcode, group_name, brand, cost_price,
                            price, current_stock, minimum_stock, status, source_updated_at
                     FROM products WHERE external_id = ?1"#;
        let product = self
            .conn
            .query_row(sql, params![external_id], |row| {
                Ok(Product {
                    external_id: row.get(0)?,
                    code: row.get(1)?,
                    description: row.get(2)?,
                    unit: row.get(3)?,
                    barcode: row.get(4)?,
                    group_name: row.get(5)?,
                    brand: row.get(6)?,
                    cost_price: row.get(7)?,
                    price: row.get(8)?,
                    current_stock: row.get(9)?,
                    minimum_stock: row.get(10)?,
                    status: row.get(11)?,
                    source_updated_at: row.get(12)?,
                })
            })
            .optional()?;
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::dao::test_support::open_db;

    fn product(id: &str, price: f64) -> Product {
        Product {
            external_id: id.to_string(),
            code: Some(format!("P{}", id)),
            description: "Parafuso".to_string(),
            unit: Some("UN".to_string()),
            barcode: None,
            group_name: None,
            brand: None,
            cost_price: Some(1.0),
            price,
            current_stock: 10.0,
            minimum_stock: 2.0,
            status: Some("A".to_string()),
            source_updated_at: None,
        }
    }

    #[test]
    fn upsert_rewrites_only_volatile_fields() {
        let conn = open_db();
        let dao = ProductDao::new(&conn);
        assert_eq!(dao.upsert(&product("1", 10.0), Utc::now()).unwrap(), UpsertOutcome::Inserted);

        let mut changed = product("1", 12.5);
        changed.description = "Renamed".to_string();
        changed.current_stock = 3.0;
        assert_eq!(dao.upsert(&changed, Utc::now()).unwrap(), UpsertOutcome::Updated);

        let stored = dao.get_by_id("1").unwrap().unwrap();
        assert_eq!(stored.price, 12.5);
        assert_eq!(stored.current_stock, 3.0);
        assert_eq!(stored.description, "Parafuso");
    }
}
