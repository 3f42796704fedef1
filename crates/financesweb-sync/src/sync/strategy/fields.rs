//! 源记录字段读取：按别名列表取第一个非 null 值
//!
//! FinancesWeb 不同表/版本的字段名不统一（如 `preco` / `price`），映射时列出全部别名。

use serde_json::{Map, Value};

use crate::error::{ErpSyncError, Result};
use crate::fetch::SourceRecord;

pub(crate) fn as_object(record: &SourceRecord) -> Result<&Map<String, Value>> {
    record
        .as_object()
        .ok_or_else(|| ErpSyncError::InvalidData(format!("记录不是 JSON 对象: {}", record)))
}

fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// 外部主键：数字或非空字符串
pub(crate) fn external_id(obj: &Map<String, Value>, keys: &[&str]) -> Result<String> {
    match first(obj, keys) {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(other) => Err(ErpSyncError::InvalidData(format!("外部 ID 类型无效: {}", other))),
        None => Err(ErpSyncError::InvalidData(format!("缺少外部 ID 字段 ({})", keys.join("/")))),
    }
}

pub(crate) fn opt_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match first(obj, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn required_string(obj: &Map<String, Value>, keys: &[&str]) -> Result<String> {
    opt_string(obj, keys)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ErpSyncError::InvalidData(format!("缺少必填字段 ({})", keys.join("/"))))
}

/// 数字字段；接受数字或数字字符串（含 `10,50` 小数逗号）。非数字值视为映射错误。
pub(crate) fn opt_number(obj: &Map<String, Value>, keys: &[&str]) -> Result<Option<f64>> {
    match first(obj, keys) {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ErpSyncError::InvalidData(format!("字段 {} 不是数字: {}", keys[0], s))),
        Some(other) => Err(ErpSyncError::InvalidData(format!("字段 {} 不是数字: {}", keys[0], other))),
    }
}

/// 布尔字段：true/false、1/0、"S"/"N"、"true"/"false"
pub(crate) fn opt_bool(obj: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    match first(obj, keys)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        Value::String(s) => match s.trim().to_ascii_uppercase().as_str() {
            "S" | "SIM" | "Y" | "TRUE" | "1" => Some(true),
            "N" | "NAO" | "NÃO" | "FALSE" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn external_id_accepts_numbers_and_strings() {
        let rec = json!({"id": 42});
        assert_eq!(external_id(as_object(&rec).unwrap(), &["id"]).unwrap(), "42");
        let rec = json!({"codigo": " A-7 "});
        assert_eq!(external_id(as_object(&rec).unwrap(), &["id", "codigo"]).unwrap(), "A-7");
        let rec = json!({"id": null, "codigo": ""});
        assert!(external_id(as_object(&rec).unwrap(), &["id", "codigo"]).is_err());
    }

    #[test]
    fn numbers_accept_decimal_comma_and_reject_garbage() {
        let rec = json!({"preco": "10,50", "estoque": 3, "minimo": "", "lixo": "abc"});
        let obj = as_object(&rec).unwrap();
        assert_eq!(opt_number(obj, &["preco"]).unwrap(), Some(10.5));
        assert_eq!(opt_number(obj, &["estoque"]).unwrap(), Some(3.0));
        assert_eq!(opt_number(obj, &["minimo"]).unwrap(), None);
        assert_eq!(opt_number(obj, &["ausente"]).unwrap(), None);
        assert!(opt_number(obj, &["lixo"]).is_err());
    }

    #[test]
    fn booleans_understand_erp_flags() {
        let rec = json!({"cliente": "S", "fornecedor": 0, "ativo": true});
        let obj = as_object(&rec).unwrap();
        assert_eq!(opt_bool(obj, &["cliente"]), Some(true));
        assert_eq!(opt_bool(obj, &["fornecedor"]), Some(false));
        assert_eq!(opt_bool(obj, &["ativo"]), Some(true));
        assert_eq!(opt_bool(obj, &["nada"]), None);
    }

    #[test]
    fn non_object_record_is_rejected() {
        assert!(as_object(&json!([1, 2])).is_err());
    }
}
