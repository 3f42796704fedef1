//! 订单策略：已存在时刷新状态、修改时间、数量、单价与小计

use rusqlite::Connection;

use super::fields::{as_object, external_id, opt_number, opt_string};
use super::{apply_each, ChunkOutcome, UpsertStrategy};
use crate::error::Result;
use crate::fetch::SourceRecord;
use crate::storage::dao::OrderDao;
use crate::storage::entities::Order;
use crate::sync::entity::EntityKind;

pub struct OrderStrategy;

impl UpsertStrategy for OrderStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Orders
    }

    fn target_table(&self) -> &'static str {
        "orders"
    }

    fn apply(&self, conn: &Connection, chunk: &[SourceRecord]) -> Result<ChunkOutcome> {
        apply_each(conn, self.kind(), chunk, map_order, |conn, order, synced_at| {
            OrderDao::new(conn).upsert(order, synced_at)
        })
    }
}

pub(crate) fn map_order(record: &SourceRecord) -> Result<Order> {
    let obj = as_object(record)?;
    let quantity = opt_number(obj, &["quantidade", "quantity"])?.unwrap_or(0.0);
    let unit_price = opt_number(obj, &["valor_unitario", "preco_unitario", "unit_price"])?.unwrap_or(0.0);
    // 小计缺失时按数量 × 单价补齐
    let item_total = opt_number(obj, &["valor_total", "total_item", "item_total"])?
        .unwrap_or(quantity * unit_price);
    Ok(Order {
        external_id: external_id(obj, &["id", "id_item", "id_pedido_item"])?,
        order_number: opt_string(obj, &["numero_pedido", "pedido", "order_number"]),
        party_id: opt_string(obj, &["id_pessoa", "cliente_id", "party_id"]),
        operator_id: opt_string(obj, &["id_operador", "operator_id"]),
        product_id: opt_string(obj, &["id_produto", "product_id"]),
        situation: opt_string(obj, &["situacao", "status", "situation"]),
        issued_at: opt_string(obj, &["data_emissao", "issued_at"]),
        modified_at: opt_string(obj, &["modified_at", "data_alteracao", "updated_at"]),
        quantity,
        delivered_quantity: opt_number(obj, &["quantidade_entregue", "delivered_quantity"])?.unwrap_or(0.0),
        unit_price,
        item_total,
        notes: opt_string(obj, &["observacao", "notes"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::dao::test_support::open_db;
    use serde_json::json;

    #[test]
    fn item_total_defaults_to_quantity_times_price() {
        let order = map_order(&json!({"id": 1, "quantidade": 3, "valor_unitario": "2,50"})).unwrap();
        assert_eq!(order.item_total, 7.5);
    }

    #[test]
    fn constraint_violation_counts_as_one_failure() {
        let conn = open_db();
        let chunk = vec![
            json!({"id": 1, "numero_pedido": "P-1", "quantidade": 2, "valor_unitario": 10, "situacao": "aberto"}),
            json!({"id": 2, "numero_pedido": "P-1", "quantidade": -1, "valor_unitario": 10}),
        ];
        let outcome = OrderStrategy.apply(&conn, &chunk).unwrap();
        assert_eq!(outcome, ChunkOutcome { inserted: 1, updated: 0, failed: 1 });
        assert!(OrderDao::new(&conn).get_by_id("2").unwrap().is_none());
    }

    #[test]
    fn update_keeps_order_number_and_refreshes_situation() {
        let conn = open_db();
        OrderStrategy
            .apply(&conn, &[json!({"id": 1, "numero_pedido": "P-1", "quantidade": 2, "valor_unitario": 10, "situacao": "aberto"})])
            .unwrap();
        OrderStrategy
            .apply(&conn, &[json!({"id": 1, "numero_pedido": "P-9", "quantidade": 2, "quantidade_entregue": 2,
                                   "valor_unitario": 10, "situacao": "faturado", "modified_at": "2024-02-01T10:00:00Z"})])
            .unwrap();
        let stored = OrderDao::new(&conn).get_by_id("1").unwrap().unwrap();
        assert_eq!(stored.situation.as_deref(), Some("faturado"));
        assert_eq!(stored.delivered_quantity, 2.0);
        assert_eq!(stored.order_number.as_deref(), Some("P-1"));
        assert_eq!(stored.modified_at.as_deref(), Some("2024-02-01T10:00:00Z"));
    }
}
