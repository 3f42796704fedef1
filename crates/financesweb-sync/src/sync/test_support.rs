//! 测试用内存记录源

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{ErpSyncError, Result};
use crate::fetch::{parse_filter, FilterOp, RecordSource, SourceRecord};

/// 按表返回记录，支持 `gt` / `eq` 子句，记下每次拉取的过滤串
#[derive(Default)]
pub(crate) struct FakeSource {
    tables: Mutex<HashMap<String, Vec<SourceRecord>>>,
    failing: Mutex<Vec<String>>,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeSource {
    pub(crate) fn set_table(&self, table: &str, records: Vec<SourceRecord>) {
        self.tables.lock().unwrap().insert(table.to_string(), records);
    }

    pub(crate) fn fail_table(&self, table: &str) {
        self.failing.lock().unwrap().push(table.to_string());
    }

    pub(crate) fn fetched(&self, table: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|(t, _)| t == table).count()
    }

    pub(crate) fn last_filter(&self, table: &str) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _)| t == table)
            .and_then(|(_, f)| f.clone())
    }
}

fn field_text(record: &SourceRecord, field: &str) -> Option<String> {
    match record.get(field)? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl RecordSource for FakeSource {
    async fn fetch_records(&self, table: &str, filter: Option<&str>) -> Result<Vec<SourceRecord>> {
        self.requests
            .lock()
            .unwrap()
            .push((table.to_string(), filter.map(str::to_string)));
        if self.failing.lock().unwrap().iter().any(|t| t == table) {
            return Err(ErpSyncError::Http { status: 503, body: "busy".to_string() });
        }

        let clauses = match filter {
            Some(f) => parse_filter(f).ok_or_else(|| ErpSyncError::InvalidArgument(f.to_string()))?,
            None => Vec::new(),
        };
        let records = self.tables.lock().unwrap().get(table).cloned().unwrap_or_default();
        Ok(records
            .into_iter()
            .filter(|record| {
                clauses.iter().all(|c| match (c.op, field_text(record, &c.field)) {
                    (FilterOp::Gt, Some(v)) => v > c.value,
                    (FilterOp::Eq, Some(v)) => v == c.value,
                    _ => false,
                })
            })
            .collect())
    }
}

pub(crate) fn product(id: i64, price: f64) -> SourceRecord {
    json!({
        "id": id,
        "descricao": format!("Produto {}", id),
        "price": price,
        "updated_at": "2023-06-01T00:00:00.000Z"
    })
}
