//! FinancesWeb HTTP 客户端
//!
//! 每次调用一个 POST，请求体 `{ api_key, tabela, filtro?, limit?, offset? }`。
//! 配置了 page_size 时按 limit/offset 分页，直到返回不足一页或空页；page_size 为 0 时拒绝创建。

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{RecordSource, SourceRecord};
use crate::config::SyncConfig;
use crate::error::{ErpSyncError, Result};

/// 请求体
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FetchRequest<'a> {
    pub api_key: &'a str,
    pub tabela: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtro: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

pub struct FinancesWebClient {
    client: Client,
    api_url: String,
    api_key: String,
    page_size: Option<u32>,
}

impl FinancesWebClient {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        if config.page_size == Some(0) {
            return Err(ErpSyncError::Config("page_size 必须大于 0".to_string()));
        }

        let mut builder = Client::builder();

        if let Some(timeout) = config.http_client_config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(timeout));
        }

        if let Some(timeout) = config.http_client_config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| ErpSyncError::Config(format!("创建 HTTP 客户端失败: {}", e)))?;

        info!("✅ FinancesWeb 客户端已创建 (api_url: {})", config.api_url);

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            page_size: config.page_size,
        })
    }

    /// 发送一次查询请求并归一化为记录数组
    pub async fn fetch_page(
        &self,
        table: &str,
        filter: Option<&str>,
        limit: Option<u32>,
        offset: Option<u64>,
    ) -> Result<Vec<SourceRecord>> {
        let request = FetchRequest {
            api_key: &self.api_key,
            tabela: table,
            filtro: filter,
            limit,
            offset,
        };
        debug!("FinancesWeb 请求: tabela={}, filtro={:?}, limit={:?}, offset={:?}", table, filter, limit, offset);

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ErpSyncError::Transport(format!("请求 FinancesWeb 失败 ({}): {}", table, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "无法读取错误信息".to_string());
            error!("❌ FinancesWeb 返回错误 tabela={}, HTTP 状态码: {}, 错误: {}", table, status, body);
            return Err(ErpSyncError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ErpSyncError::Transport(format!("读取 FinancesWeb 响应失败 ({}): {}", table, e)))?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ErpSyncError::InvalidData(format!("解析 FinancesWeb 响应失败 ({}): {}", table, e)))?;

        normalize_response(table, value)
    }
}

#[async_trait]
impl RecordSource for FinancesWebClient {
    async fn fetch_records(&self, table: &str, filter: Option<&str>) -> Result<Vec<SourceRecord>> {
        let Some(page_size) = self.page_size else {
            return self.fetch_page(table, filter, None, None).await;
        };

        let mut all = Vec::new();
        let mut offset: u64 = 0;
        loop {
            let page = self.fetch_page(table, filter, Some(page_size), Some(offset)).await?;
            let len = page.len();
            all.extend(page);
            debug!("FinancesWeb {} 分页: offset={}, 本页 {} 条，累计 {}", table, offset, len, all.len());
            if len == 0 || len < page_size as usize {
                break;
            }
            offset += len as u64;
        }
        Ok(all)
    }
}

/// 响应归一化：裸数组；或对象中 `tabela` / `data` / `records` 下的数组；
/// 否则取唯一一个数组类型的属性。
pub fn normalize_response(table: &str, value: Value) -> Result<Vec<SourceRecord>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in [table, "data", "records"] {
                if matches!(map.get(key), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove(key) {
                        return Ok(items);
                    }
                }
            }

            let array_keys: Vec<String> = map
                .iter()
                .filter(|(_, v)| v.is_array())
                .map(|(k, _)| k.clone())
                .collect();
            match array_keys.as_slice() {
                [only] => match map.remove(only) {
                    Some(Value::Array(items)) => Ok(items),
                    _ => Err(ErpSyncError::InvalidData(format!("FinancesWeb 响应 ({}) 结构异常", table))),
                },
                [] => Err(ErpSyncError::InvalidData(format!(
                    "FinancesWeb 响应 ({}) 中没有记录数组", table
                ))),
                many => Err(ErpSyncError::InvalidData(format!(
                    "FinancesWeb 响应 ({}) 中有多个数组属性: {}", table, many.join(", ")
                ))),
            }
        }
        other => Err(ErpSyncError::InvalidData(format!(
            "FinancesWeb 响应 ({}) 既不是数组也不是对象: {}", table, other
        ))),
    }
}
