//! 本地表行结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 实体同步状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            other => Err(format!("未知同步状态: {}", other)),
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// sync_control 表一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncControlRecord {
    pub entity_name: String,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_record_at: Option<DateTime<Utc>>,
    pub record_count: i64,
    pub status: SyncStatus,
    pub last_error: Option<String>,
}

/// products 表
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub external_id: String,
    pub code: Option<String>,
    pub description: String,
    pub unit: Option<String>,
    pub barcode: Option<String>,
    pub group_name: Option<String>,
    pub brand: Option<String>,
    pub cost_price: Option<f64>,
    pub price: f64,
    pub current_stock: f64,
    pub minimum_stock: f64,
    pub status: Option<String>,
    pub source_updated_at: Option<String>,
}

/// parties 表（客户 / 供应商）
#[derive(Debug, Clone, PartialEq)]
pub struct Party {
    pub external_id: String,
    pub name: String,
    pub trade_name: Option<String>,
    /// CPF / CNPJ
    pub document: Option<String>,
    pub person_type: Option<String>,
    pub is_customer: bool,
    pub is_supplier: bool,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub status: Option<String>,
    pub source_updated_at: Option<String>,
}

/// operators 表
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub external_id: String,
    pub name: String,
    pub login: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub source_updated_at: Option<String>,
}

/// orders 表（一行 = 一个订单项）
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub external_id: String,
    pub order_number: Option<String>,
    pub party_id: Option<String>,
    pub operator_id: Option<String>,
    pub product_id: Option<String>,
    pub situation: Option<String>,
    pub issued_at: Option<String>,
    pub modified_at: Option<String>,
    pub quantity: f64,
    pub delivered_quantity: f64,
    pub unit_price: f64,
    pub item_total: f64,
    pub notes: Option<String>,
}

/// sync_audit_log 表一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogRow {
    pub run_id: String,
    pub entity_name: String,
    pub phase: String,
    pub is_incremental: bool,
    pub total_records: Option<i64>,
    pub inserted: Option<i64>,
    pub updated: Option<i64>,
    pub errors: Option<i64>,
    pub duration_ms: Option<i64>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// upsert 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl UpsertOutcome {
    /// 由 RETURNING sync_update_count 推断：插入分支为 0，冲突更新分支 >= 1
    pub fn from_update_count(count: i64) -> Self {
        if count == 0 {
            Self::Inserted
        } else {
            Self::Updated
        }
    }
}
