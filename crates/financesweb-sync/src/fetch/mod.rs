//! 远端拉取 - FinancesWeb 通用查询端点

pub mod client;
pub mod filter;

pub use client::{normalize_response, FetchRequest, FinancesWebClient};
pub use filter::{format_timestamp, incremental_filter, parse_filter, split_clauses, FilterClause, FilterExpr, FilterOp};

use async_trait::async_trait;

use crate::error::Result;

/// 远端返回的一条原始记录（逐字段 JSON 对象），只在一次拉取 + upsert 周期内存在
pub type SourceRecord = serde_json::Value;

/// 记录来源；编排器只依赖此 trait
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// 拉取 `table` 中满足 `filter` 的全部记录，按远端顺序返回
    async fn fetch_records(&self, table: &str, filter: Option<&str>) -> Result<Vec<SourceRecord>>;
}
