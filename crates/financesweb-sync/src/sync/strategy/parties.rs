//! 往来单位策略（客户/供应商）：已存在时刷新全部联系方式、地址与状态

use rusqlite::Connection;

use super::fields::{as_object, external_id, opt_bool, opt_string, required_string};
use super::{apply_each, ChunkOutcome, UpsertStrategy};
use crate::error::Result;
use crate::fetch::SourceRecord;
use crate::storage::dao::PartyDao;
use crate::storage::entities::Party;
use crate::sync::entity::EntityKind;

pub struct PartyStrategy;

impl UpsertStrategy for PartyStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Parties
    }

    fn target_table(&self) -> &'static str {
        "parties"
    }

    fn apply(&self, conn: &Connection, chunk: &[SourceRecord]) -> Result<ChunkOutcome> {
        apply_each(conn, self.kind(), chunk, map_party, |conn, party, synced_at| {
            PartyDao::new(conn).upsert(party, synced_at)
        })
    }
}

pub(crate) fn map_party(record: &SourceRecord) -> Result<Party> {
    let obj = as_object(record)?;
    Ok(Party {
        external_id: external_id(obj, &["id", "id_pessoa", "codigo"])?,
        name: required_string(obj, &["nome", "razao_social", "name"])?,
        trade_name: opt_string(obj, &["fantasia", "nome_fantasia", "trade_name"]),
        document: opt_string(obj, &["cpf_cnpj", "documento", "cnpj", "cpf", "document"]),
        person_type: opt_string(obj, &["tipo_pessoa", "person_type"]),
        is_customer: opt_bool(obj, &["cliente", "is_customer"]).unwrap_or(false),
        is_supplier: opt_bool(obj, &["fornecedor", "is_supplier"]).unwrap_or(false),
        email: opt_string(obj, &["email"]),
        phone: opt_string(obj, &["telefone", "fone", "phone"]),
        mobile: opt_string(obj, &["celular", "mobile"]),
        street: opt_string(obj, &["endereco", "logradouro", "street"]),
        number: opt_string(obj, &["numero", "number"]),
        complement: opt_string(obj, &["complemento", "complement"]),
        district: opt_string(obj, &["bairro", "district"]),
        city: opt_string(obj, &["cidade", "municipio", "city"]),
        state: opt_string(obj, &["uf", "estado", "state"]),
        zip_code: opt_string(obj, &["cep", "zip_code"]),
        status: opt_string(obj, &["status", "situacao"]),
        source_updated_at: opt_string(obj, &["updated_at", "data_alteracao"]),
    })
}
