//! 实体 upsert 策略
//!
//! 每种实体一个策略：逐条映射源记录 → 行结构 → 原子 upsert。
//! 插入写全部字段；冲突时只改该实体的"易变"字段。单条失败只计数，不中断 chunk。

mod fields;
mod operators;
mod orders;
mod parties;
mod products;

pub use operators::OperatorStrategy;
pub use orders::OrderStrategy;
pub use parties::PartyStrategy;
pub use products::ProductStrategy;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::{ErpSyncError, Result};
use crate::fetch::SourceRecord;
use crate::storage::dao::TransactionManager;
use crate::storage::entities::UpsertOutcome;
use crate::sync::entity::{EntityKind, EntitySyncConfig};

/// 单个 chunk 的处理结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub inserted: usize,
    pub updated: usize,
    /// 映射或写库失败的记录数
    pub failed: usize,
}

impl ChunkOutcome {
    pub fn processed(&self) -> usize {
        self.inserted + self.updated
    }
}

/// upsert 策略
pub trait UpsertStrategy: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// 写入的本地表名
    fn target_table(&self) -> &'static str;

    /// 处理一个 chunk；返回 Err 表示整个 chunk 失败（如事务无法提交）
    fn apply(&self, conn: &Connection, chunk: &[SourceRecord]) -> Result<ChunkOutcome>;
}

/// 按种类构造默认策略
pub fn strategy_for_kind(kind: EntityKind) -> Arc<dyn UpsertStrategy> {
    match kind {
        EntityKind::Products => Arc::new(ProductStrategy),
        EntityKind::Parties => Arc::new(PartyStrategy),
        EntityKind::Operators => Arc::new(OperatorStrategy),
        EntityKind::Orders => Arc::new(OrderStrategy),
    }
}

/// 实体名 → 策略
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn UpsertStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 配置加载时一次性解析每个实体的策略；目标表与策略不符时拒绝
    pub fn from_configs(configs: &[EntitySyncConfig]) -> Result<Self> {
        let mut registry = Self::new();
        for config in configs {
            let strategy = strategy_for_kind(config.kind);
            ensure_target_table(config, strategy.as_ref())?;
            registry.register(config.entity_name.clone(), strategy);
        }
        Ok(registry)
    }

    /// 注册（覆盖同名）
    pub fn register(&mut self, entity_name: impl Into<String>, strategy: Arc<dyn UpsertStrategy>) {
        self.strategies.insert(entity_name.into(), strategy);
    }

    pub fn get(&self, entity_name: &str) -> Option<Arc<dyn UpsertStrategy>> {
        self.strategies.get(entity_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// 配置的目标表必须是策略实际写入的表
pub fn ensure_target_table(config: &EntitySyncConfig, strategy: &dyn UpsertStrategy) -> Result<()> {
    if config.target_table != strategy.target_table() {
        return Err(ErpSyncError::Config(format!(
            "实体 {} 的目标表 {} 与 {} 策略写入的表 {} 不一致",
            config.entity_name,
            config.target_table,
            strategy.kind().as_str(),
            strategy.target_table()
        )));
    }
    Ok(())
}

/// 通用 chunk 处理：一个事务，逐条 map + upsert，单条错误计入 failed
pub(crate) fn apply_each<T, M, U>(
    conn: &Connection,
    kind: EntityKind,
    chunk: &[SourceRecord],
    map: M,
    upsert: U,
) -> Result<ChunkOutcome>
where
    M: Fn(&SourceRecord) -> Result<T>,
    U: Fn(&Connection, &T, DateTime<Utc>) -> Result<UpsertOutcome>,
{
    let synced_at = Utc::now();
    TransactionManager::new(conn).execute(|conn| {
        let mut outcome = ChunkOutcome::default();
        for (index, record) in chunk.iter().enumerate() {
            match map(record).and_then(|row| upsert(conn, &row, synced_at)) {
                Ok(UpsertOutcome::Inserted) => outcome.inserted += 1,
                Ok(UpsertOutcome::Updated) => outcome.updated += 1,
                Err(e) => {
                    outcome.failed += 1;
                    warn!("⚠️ {} 记录 #{} 同步失败: {}", kind.as_str(), index, e);
                }
            }
        }
        Ok(outcome)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::entity::default_entity_configs;

    #[test]
    fn registry_resolves_every_configured_entity() {
        let configs = default_entity_configs();
        let registry = StrategyRegistry::from_configs(&configs).unwrap();
        assert_eq!(registry.len(), configs.len());
        for config in &configs {
            let strategy = registry.get(&config.entity_name).unwrap();
            assert_eq!(strategy.kind(), config.kind);
            assert_eq!(strategy.target_table(), config.target_table);
        }
        assert!(registry.get("boletos").is_none());
    }

    #[test]
    fn register_overrides_existing_entry() {
        let mut registry = StrategyRegistry::from_configs(&default_entity_configs()).unwrap();
        registry.register("produtos", Arc::new(OrderStrategy));
        assert_eq!(registry.get("produtos").unwrap().kind(), EntityKind::Orders);
    }

    #[test]
    fn from_configs_rejects_mismatched_target_table() {
        let mut configs = default_entity_configs();
        configs[0].target_table = "produtos_legado".to_string();
        assert!(matches!(StrategyRegistry::from_configs(&configs), Err(ErpSyncError::Config(_))));
    }
}
