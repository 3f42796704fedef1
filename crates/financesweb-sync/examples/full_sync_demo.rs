//! 全量 + 增量同步演示
//!
//! 连接真实 FinancesWeb：
//! ```text
//! FINANCESWEB_API_URL=https://erp.example.com/api/query \
//! FINANCESWEB_API_KEY=... cargo run --example full_sync_demo
//! ```
//! 未设置 FINANCESWEB_API_URL 时使用内存数据源离线演示。

use async_trait::async_trait;
use financesweb_sync::{
    ErpSyncService, RecordSource, Result, SourceRecord, SyncConfig, SyncDatabase, SyncResult,
};
use serde_json::json;
use std::sync::Arc;

/// 离线演示用的固定数据源
struct StaticSource;

#[async_trait]
impl RecordSource for StaticSource {
    async fn fetch_records(&self, table: &str, filter: Option<&str>) -> Result<Vec<SourceRecord>> {
        // 增量过滤下不再返回任何变化
        if filter.is_some_and(|f| f.contains("=gt.")) {
            return Ok(Vec::new());
        }
        let records = match table {
            "produtos" => vec![
                json!({"id": 1, "codigo": "P-001", "descricao": "Parafuso 6mm", "preco": "0,35", "estoque": 1200}),
                json!({"id": 2, "codigo": "P-002", "descricao": "Porca 6mm", "preco": "0,20", "estoque": 900}),
            ],
            "pessoas" => vec![
                json!({"id": 10, "nome": "Ferragens Silva", "cpf_cnpj": "12.345.678/0001-90", "tipo_pessoa": "J", "cliente": "S"}),
            ],
            "operadores" => vec![json!({"id": 3, "nome": "Ana", "email": "ana@example.com"})],
            "pedidos" => vec![
                json!({"id": 100, "id_produto": 1, "id_pessoa": 10, "quantidade": 50, "preco_unitario": 0.35}),
            ],
            _ => Vec::new(),
        };
        Ok(records)
    }
}

fn print_results(title: &str, results: &[SyncResult]) {
    println!("\n📊 {}", title);
    for r in results {
        println!(
            "  {:<12} total={:<4} inserted={:<4} updated={:<4} errors={:<4} {}ms",
            r.entity_name, r.total_records, r.inserted, r.updated, r.errors, r.duration_ms
        );
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let service = if std::env::var("FINANCESWEB_API_URL").is_ok() {
        let config = SyncConfig::default().from_env();
        ErpSyncService::initialize(config).await?
    } else {
        println!("💡 未设置 FINANCESWEB_API_URL，使用内存数据源");
        let config = SyncConfig::builder()
            .api_url("http://offline.invalid")
            .api_key("demo")
            .build();
        let db = SyncDatabase::open_in_memory()?;
        Arc::new(ErpSyncService::with_source(config, db, Arc::new(StaticSource)).await?)
    };

    let mut audit = service.subscribe_audit();
    tokio::spawn(async move {
        while let Ok(event) = audit.recv().await {
            println!("  📣 [{}] {} {}", event.phase.as_str(), event.entity_name, event.message.unwrap_or_default());
        }
    });

    let full = service.perform_full_sync(None).await?;
    print_results("全量同步", &full);

    let incremental = service.perform_incremental_sync(None).await?;
    print_results("增量同步", &incremental);

    println!("\n📋 同步控制状态");
    for status in service.get_sync_status(None).await? {
        println!(
            "  {:<12} {:<10} count={:<6} last_sync={:?} error={:?}",
            status.entity_name, status.status, status.record_count, status.last_sync_at, status.last_error
        );
    }

    Ok(())
}
