//! 定时同步
//!
//! 后台任务：每 `incremental_interval_secs` 一次增量，配置了 `full_interval_secs` 时再定期全量。
//! 增量启动即执行一次；全量等满一个周期后才第一次执行。
//! 运行经服务的运行锁串行化，错误只记日志。

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ScheduleConfig;
use crate::service::ErpSyncService;

/// 后台定时任务句柄
pub struct SchedulerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// 停止调度并等待当前运行结束
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!("❌ 定时同步任务异常退出: {}", e);
        }
        info!("定时同步已停止");
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub fn spawn_periodic_sync(service: Arc<ErpSyncService>, schedule: ScheduleConfig) -> SchedulerHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let incremental_period = Duration::from_secs(schedule.incremental_interval_secs.max(1));
        let mut incremental = interval(incremental_period);
        incremental.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut full = schedule.full_interval_secs.map(|secs| {
            let period = Duration::from_secs(secs.max(1));
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        info!(
            "⏰ 定时同步已启动: 增量每 {}s, 全量 {:?}",
            incremental_period.as_secs(),
            schedule.full_interval_secs
        );

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = next_tick(&mut full) => {
                    if let Err(e) = service.perform_full_sync(None).await {
                        warn!("⚠️ 定时全量同步失败: {}", e);
                    }
                }
                _ = incremental.tick() => {
                    if let Err(e) = service.perform_incremental_sync(None).await {
                        warn!("⚠️ 定时增量同步失败: {}", e);
                    }
                }
            }
        }
    });

    SchedulerHandle { cancel, task }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::storage::SyncDatabase;
    use crate::sync::test_support::{product, FakeSource};
    use crate::sync::AuditPhase;

    #[tokio::test]
    async fn runs_incremental_immediately_and_stops_on_shutdown() {
        let source = Arc::new(FakeSource::default());
        source.set_table("produtos", vec![product(1, 5.0)]);
        let config = SyncConfig::builder().api_url("http://erp.invalid").api_key("k").build();
        let db = SyncDatabase::open_in_memory().unwrap();
        let service = Arc::new(ErpSyncService::with_source(config, db, source.clone()).await.unwrap());
        let mut rx = service.subscribe_audit();

        let handle = spawn_periodic_sync(
            service.clone(),
            ScheduleConfig { incremental_interval_secs: 3600, full_interval_secs: None },
        );

        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("scheduler did not run")
            .unwrap();
        assert_eq!(first.phase, AuditPhase::Start);
        assert!(first.is_incremental);

        // shutdown 等当前一轮跑完
        handle.shutdown().await;
        assert_eq!(source.fetched("produtos"), 1);
        assert_eq!(source.fetched("operadores"), 0);
    }
}
