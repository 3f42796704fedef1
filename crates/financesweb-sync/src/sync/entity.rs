//! 实体种类与静态同步配置
//!
//! 实体集合固定、手工配置；进程生命周期内不可变。新增实体 = 新增 EntityKind + 注册策略。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 默认分块大小
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// 实体种类（决定使用哪个 upsert 策略）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Products,
    Parties,
    Operators,
    Orders,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Products,
        EntityKind::Parties,
        EntityKind::Operators,
        EntityKind::Orders,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Parties => "parties",
            Self::Operators => "operators",
            Self::Orders => "orders",
        }
    }
}

impl FromStr for EntityKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" | "produtos" => Ok(Self::Products),
            "parties" | "pessoas" => Ok(Self::Parties),
            "operators" | "operadores" => Ok(Self::Operators),
            "orders" | "pedidos" => Ok(Self::Orders),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// 单个实体的同步配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySyncConfig {
    /// 实体名（控制表主键，也是触发接口的过滤键）
    pub entity_name: String,
    pub kind: EntityKind,
    /// 本地目标表
    pub target_table: String,
    /// FinancesWeb 表名（请求体 `tabela`）
    pub source_endpoint: String,
    /// 增量字段；None 表示该实体不参与增量同步
    #[serde(default)]
    pub incremental_field: Option<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// 固定过滤条件（`field=op.value`，逗号分隔）
    #[serde(default)]
    pub static_filter: Option<String>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl EntitySyncConfig {
    pub fn new(entity_name: impl Into<String>, kind: EntityKind, source_endpoint: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            kind,
            target_table: kind.as_str().to_string(),
            source_endpoint: source_endpoint.into(),
            incremental_field: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            static_filter: None,
        }
    }

    pub fn with_incremental_field(mut self, field: impl Into<String>) -> Self {
        self.incremental_field = Some(field.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_static_filter(mut self, filter: impl Into<String>) -> Self {
        self.static_filter = Some(filter.into());
        self
    }

    pub fn supports_incremental(&self) -> bool {
        self.incremental_field.as_deref().is_some_and(|f| !f.is_empty())
    }
}

/// 默认实体集合（按此顺序同步）
pub fn default_entity_configs() -> Vec<EntitySyncConfig> {
    vec![
        EntitySyncConfig::new("produtos", EntityKind::Products, "produtos")
            .with_incremental_field("updated_at"),
        EntitySyncConfig::new("pessoas", EntityKind::Parties, "pessoas")
            .with_incremental_field("updated_at"),
        // 操作员表没有可靠的修改时间字段，只做全量
        EntitySyncConfig::new("operadores", EntityKind::Operators, "operadores"),
        EntitySyncConfig::new("pedidos", EntityKind::Orders, "pedidos")
            .with_incremental_field("modified_at"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_parses_english_and_erp_names() {
        assert_eq!(EntityKind::from_str("products").unwrap(), EntityKind::Products);
        assert_eq!(EntityKind::from_str("pedidos").unwrap(), EntityKind::Orders);
        assert_eq!(EntityKind::Parties.to_string(), "parties");
        assert!(EntityKind::from_str("invoices").is_err());
    }

    #[test]
    fn default_configs_cover_every_kind_once() {
        let configs = default_entity_configs();
        for kind in EntityKind::ALL {
            assert_eq!(configs.iter().filter(|c| c.kind == kind).count(), 1);
        }
        let operators = configs.iter().find(|c| c.kind == EntityKind::Operators).unwrap();
        assert!(!operators.supports_incremental());
        assert!(configs.iter().all(|c| c.chunk_size == DEFAULT_CHUNK_SIZE));
    }

    #[test]
    fn chunk_size_defaults_when_missing_in_json() {
        let json = r#"{"entity_name":"produtos","kind":"products","target_table":"products","source_endpoint":"produtos"}"#;
        let cfg: EntitySyncConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(cfg.incremental_field.is_none());
    }
}
