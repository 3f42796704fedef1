//! 操作员策略：已存在时刷新联系方式、角色与状态

use rusqlite::Connection;

use super::fields::{as_object, external_id, opt_string, required_string};
use super::{apply_each, ChunkOutcome, UpsertStrategy};
use crate::error::Result;
use crate::fetch::SourceRecord;
use crate::storage::dao::OperatorDao;
use crate::storage::entities::Operator;
use crate::sync::entity::EntityKind;

pub struct OperatorStrategy;

impl UpsertStrategy for OperatorStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Operators
    }

    fn target_table(&self) -> &'static str {
        "operators"
    }

    fn apply(&self, conn: &Connection, chunk: &[SourceRecord]) -> Result<ChunkOutcome> {
        apply_each(conn, self.kind(), chunk, map_operator, |conn, operator, synced_at| {
            OperatorDao::new(conn).upsert(operator, synced_at)
        })
    }
}

pub(crate) fn map_operator(record: &SourceRecord) -> Result<Operator> {
    let obj = as_object(record)?;
    Ok(Operator {
        external_id: external_id(obj, &["id", "id_operador", "codigo"])?,
        name: required_string(obj, &["nome", "name"])?,
        login: opt_string(obj, &["login", "usuario"]),
        email: opt_string(obj, &["email"]),
        phone: opt_string(obj, &["telefone", "fone", "phone"]),
        role: opt_string(obj, &["perfil", "funcao", "role"]),
        status: opt_string(obj, &["status", "situacao"]),
        source_updated_at: opt_string(obj, &["updated_at", "data_alteracao"]),
    })
}
