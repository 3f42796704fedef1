//! 同步引擎配置
//!
//! 来源优先级：builder / JSON 文件 → 环境变量覆盖（`from_env`）。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{ErpSyncError, Result};
use crate::fetch::parse_filter;
use crate::sync::entity::{default_entity_configs, EntitySyncConfig, DEFAULT_CHUNK_SIZE};

pub const ENV_API_URL: &str = "FINANCESWEB_API_URL";
pub const ENV_API_KEY: &str = "FINANCESWEB_API_KEY";
pub const ENV_DATA_DIR: &str = "FINANCESWEB_DATA_DIR";

/// HTTP 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// 连接超时（秒）
    pub connect_timeout_secs: Option<u64>,
    /// 请求超时（秒）
    pub request_timeout_secs: Option<u64>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: Some(10),
            request_timeout_secs: Some(120), // 全量拉取大表时响应较慢
        }
    }
}

/// 定时同步配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// 增量同步间隔（秒）
    pub incremental_interval_secs: u64,
    /// 全量同步间隔（秒）；None 表示不定时全量
    pub full_interval_secs: Option<u64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            incremental_interval_secs: 15 * 60,
            full_interval_secs: Some(24 * 60 * 60),
        }
    }
}

/// 同步引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// 数据目录（默认数据库位于 data_dir/financesweb.db）
    pub data_dir: PathBuf,
    /// 数据库路径覆盖
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// FinancesWeb 查询端点
    pub api_url: String,
    pub api_key: String,
    #[serde(default)]
    pub http_client_config: HttpClientConfig,
    /// 远端分页大小；None 表示一次请求拉全表
    #[serde(default)]
    pub page_size: Option<u32>,
    /// 实体未显式配置 chunk_size 时使用
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: usize,
    #[serde(default = "default_entity_configs")]
    pub entities: Vec<EntitySyncConfig>,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: get_default_data_dir(),
            database_path: None,
            api_url: String::new(),
            api_key: String::new(),
            http_client_config: HttpClientConfig::default(),
            page_size: None,
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            entities: default_entity_configs(),
            schedule: ScheduleConfig::default(),
        }
    }
}

/// 默认数据目录 ~/.financesweb-sync/
fn get_default_data_dir() -> PathBuf {
    if let Some(home_dir) = std::env::var("HOME").ok().map(PathBuf::from) {
        home_dir.join(".financesweb-sync")
    } else if let Some(home_dir) = std::env::var("USERPROFILE").ok().map(PathBuf::from) {
        home_dir.join(".financesweb-sync")
    } else {
        PathBuf::from("./financesweb_data")
    }
}

impl SyncConfig {
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::new()
    }

    /// 从 JSON 文件加载
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ErpSyncError::Config(format!("读取配置文件失败 {}: {}", path.display(), e)))?;
        let config: SyncConfig = serde_json::from_str(&raw)
            .map_err(|e| ErpSyncError::Config(format!("解析配置文件失败 {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// 用环境变量覆盖 api_url / api_key / data_dir
    pub fn from_env(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            self.api_url = url;
        }
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("financesweb.db"))
    }

    /// 实体配置中 chunk_size 为 0 的，回落到 default_chunk_size
    pub fn resolved_entities(&self) -> Vec<EntitySyncConfig> {
        self.entities
            .iter()
            .cloned()
            .map(|mut e| {
                if e.chunk_size == 0 {
                    e.chunk_size = self.default_chunk_size;
                }
                e
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(ErpSyncError::Config("api_url 不能为空".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(ErpSyncError::Config("api_key 不能为空".to_string()));
        }
        if self.default_chunk_size == 0 {
            return Err(ErpSyncError::Config("default_chunk_size 必须大于 0".to_string()));
        }
        if self.page_size == Some(0) {
            return Err(ErpSyncError::Config("page_size 必须大于 0".to_string()));
        }
        if self.entities.is_empty() {
            return Err(ErpSyncError::Config("至少需要配置一个实体".to_string()));
        }
        let mut seen = HashSet::new();
        for entity in &self.entities {
            if entity.entity_name.trim().is_empty() {
                return Err(ErpSyncError::Config("实体名不能为空".to_string()));
            }
            if !seen.insert(entity.entity_name.as_str()) {
                return Err(ErpSyncError::Config(format!("实体名重复: {}", entity.entity_name)));
            }
            if entity.target_table != entity.kind.as_str() {
                return Err(ErpSyncError::Config(format!(
                    "实体 {} 的目标表 {} 与种类 {} 不一致",
                    entity.entity_name,
                    entity.target_table,
                    entity.kind.as_str()
                )));
            }
            if let Some(filter) = entity.static_filter.as_deref() {
                if parse_filter(filter).is_none() {
                    return Err(ErpSyncError::Config(format!(
                        "实体 {} 的固定过滤条件非法: {}",
                        entity.entity_name, filter
                    )));
                }
            }
        }
        if self.schedule.incremental_interval_secs == 0 || self.schedule.full_interval_secs == Some(0) {
            return Err(ErpSyncError::Config("定时同步间隔必须大于 0".to_string()));
        }
        Ok(())
    }
}

/// SyncConfig 构建器
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.data_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn database_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn api_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.api_url = url.into();
        self
    }

    pub fn api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn http_client_config(mut self, config: HttpClientConfig) -> Self {
        self.config.http_client_config = config;
        self
    }

    pub fn page_size(mut self, page_size: Option<u32>) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn default_chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.default_chunk_size = chunk_size;
        self
    }

    pub fn entities(mut self, entities: Vec<EntitySyncConfig>) -> Self {
        self.config.entities = entities;
        self
    }

    pub fn schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.config.schedule = schedule;
        self
    }

    pub fn build(self) -> SyncConfig {
        self.config
    }
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::entity::EntityKind;
    use tempfile::TempDir;

    fn valid() -> SyncConfig {
        SyncConfig::builder()
            .api_url("https://erp.example.com/api/query")
            .api_key("secret")
            .data_dir("/tmp/fw")
            .build()
    }

    #[test]
    fn builder_defaults_validate() {
        let config = valid();
        config.validate().unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/fw/financesweb.db"));
        assert_eq!(config.entities.len(), 4);
    }

    #[test]
    fn validate_rejects_missing_credentials_and_duplicates() {
        let mut config = valid();
        config.api_key = " ".to_string();
        assert!(matches!(config.validate(), Err(ErpSyncError::Config(_))));

        let mut config = valid();
        config
            .entities
            .push(EntitySyncConfig::new("produtos", EntityKind::Products, "produtos"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_static_filter_and_zero_interval() {
        let mut config = valid();
        config.entities[0].static_filter = Some("situacao=eq.A,ativo".to_string());
        assert!(matches!(config.validate(), Err(ErpSyncError::Config(_))));

        let mut config = valid();
        config.schedule.incremental_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_target_table_of_another_kind() {
        let mut config = valid();
        config.entities[0].target_table = "orders".to_string();
        assert!(matches!(config.validate(), Err(ErpSyncError::Config(_))));
    }

    #[test]
    fn zero_chunk_size_falls_back_to_default() {
        let config = SyncConfig::builder()
            .default_chunk_size(50)
            .entities(vec![EntitySyncConfig::new("produtos", EntityKind::Products, "produtos").with_chunk_size(0)])
            .build();
        assert_eq!(config.resolved_entities()[0].chunk_size, 50);
    }

    #[test]
    fn loads_from_json_file_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync.json");
        std::fs::write(
            &path,
            r#"{"data_dir":"/var/lib/fw","api_url":"http://erp","api_key":"k","page_size":500}"#,
        )
        .unwrap();
        let config = SyncConfig::from_json_file(&path).unwrap();
        assert_eq!(config.page_size, Some(500));
        assert_eq!(config.entities.len(), 4);
        assert_eq!(config.schedule.incremental_interval_secs, 900);
        config.validate().unwrap();
    }

    #[test]
    fn missing_json_file_is_config_error() {
        let err = SyncConfig::from_json_file("/nonexistent/sync.json").unwrap_err();
        assert!(matches!(err, ErpSyncError::Config(_)));
    }
}
