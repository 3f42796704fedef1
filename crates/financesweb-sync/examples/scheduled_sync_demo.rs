//! 定时同步演示
//!
//! ```text
//! FINANCESWEB_API_URL=... FINANCESWEB_API_KEY=... cargo run --example scheduled_sync_demo
//! ```
//! Ctrl+C 停止。

use financesweb_sync::{spawn_periodic_sync, ErpSyncService, ScheduleConfig, SyncConfig};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = SyncConfig::default().from_env();
    let schedule = ScheduleConfig {
        incremental_interval_secs: 60,
        full_interval_secs: Some(60 * 60),
    };

    let service = ErpSyncService::initialize(config).await?;
    let handle = spawn_periodic_sync(service.clone(), schedule);

    println!("⏰ 定时同步运行中，Ctrl+C 停止");
    tokio::signal::ctrl_c().await?;

    handle.shutdown().await;
    for status in service.get_sync_status(None).await? {
        println!("{:<12} {:<10} count={}", status.entity_name, status.status, status.record_count);
    }
    Ok(())
}
