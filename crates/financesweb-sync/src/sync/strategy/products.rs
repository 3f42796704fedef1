//! 商品策略：已存在时只刷新状态、价格、当前库存、最低库存

use rusqlite::Connection;

use super::fields::{as_object, external_id, opt_number, opt_string};
use super::{apply_each, ChunkOutcome, UpsertStrategy};
use crate::error::Result;
use crate::fetch::SourceRecord;
use crate::storage::dao::ProductDao;
use crate::storage::entities::Product;
use crate::sync::entity::EntityKind;

pub struct ProductStrategy;

impl UpsertStrategy for ProductStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Products
    }

    fn target_table(&self) -> &'static str {
        "products"
    }

    fn apply(&self, conn: &Connection, chunk: &[SourceRecord]) -> Result<ChunkOutcome> {
        apply_each(conn, self.kind(), chunk, map_product, |conn, product, synced_at| {
            ProductDao::new(conn).upsert(product, synced_at)
        })
    }
}

pub(crate) fn map_product(record: &SourceRecord) -> Result<Product> {
    let obj = as_object(record)?;
    Ok(Product {
        external_id: external_id(obj, &["id", "id_produto", "codigo"])?,
        code: opt_string(obj, &["codigo", "code", "referencia"]),
        description: opt_string(obj, &["descricao", "description", "nome"]).unwrap_or_default(),
        unit: opt_string(obj, &["unidade", "unit"]),
        barcode: opt_string(obj, &["codigo_barras", "ean", "barcode"]),
        group_name: opt_string(obj, &["grupo", "group_name"]),
        brand: opt_string(obj, &["marca", "brand"]),
        cost_price: opt_number(obj, &["preco_custo", "cost_price"])?,
        price: opt_number(obj, &["preco", "preco_venda", "price"])?.unwrap_or(0.0),
        current_stock: opt_number(obj, &["estoque", "estoque_atual", "current_stock"])?.unwrap_or(0.0),
        minimum_stock: opt_number(obj, &["estoque_minimo", "minimum_stock"])?.unwrap_or(0.0),
        status: opt_string(obj, &["status", "situacao"]),
        source_updated_at: opt_string(obj, &["updated_at", "data_alteracao"]),
    })
}
