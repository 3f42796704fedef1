//! FinancesWeb 过滤表达式
//!
//! 语法：`field=op.value`，多个子句用逗号连接，语义为 AND。
//! `in` 的值写作 `(a,b,c)`。

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    In,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::Ilike => "ilike",
            Self::In => "in",
        }
    }
}

impl FromStr for FilterOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(Self::Eq),
            "neq" => Ok(Self::Neq),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "like" => Ok(Self::Like),
            "ilike" => Ok(Self::Ilike),
            "in" => Ok(Self::In),
            _ => Err(()),
        }
    }
}

/// 单个过滤子句
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// 解析 `field=op.value`
    pub fn parse(raw: &str) -> Option<Self> {
        let (field, rest) = raw.trim().split_once('=')?;
        let (op, value) = rest.split_once('.')?;
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            op: FilterOp::from_str(op).ok()?,
            value: value.to_string(),
        })
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}.{}", self.field, self.op.as_str(), self.value)
    }
}

/// 过滤表达式构建器
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpr {
    parts: Vec<String>,
}

impl FilterExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clause(mut self, clause: FilterClause) -> Self {
        self.parts.push(clause.to_string());
        self
    }

    pub fn eq(self, field: &str, value: impl fmt::Display) -> Self {
        self.clause(FilterClause::new(field, FilterOp::Eq, value.to_string()))
    }

    pub fn neq(self, field: &str, value: impl fmt::Display) -> Self {
        self.clause(FilterClause::new(field, FilterOp::Neq, value.to_string()))
    }

    pub fn gt(self, field: &str, value: impl fmt::Display) -> Self {
        self.clause(FilterClause::new(field, FilterOp::Gt, value.to_string()))
    }

    pub fn gte(self, field: &str, value: impl fmt::Display) -> Self {
        self.clause(FilterClause::new(field, FilterOp::Gte, value.to_string()))
    }

    pub fn lt(self, field: &str, value: impl fmt::Display) -> Self {
        self.clause(FilterClause::new(field, FilterOp::Lt, value.to_string()))
    }

    pub fn lte(self, field: &str, value: impl fmt::Display) -> Self {
        self.clause(FilterClause::new(field, FilterOp::Lte, value.to_string()))
    }

    pub fn like(self, field: &str, pattern: &str) -> Self {
        self.clause(FilterClause::new(field, FilterOp::Like, pattern))
    }

    pub fn ilike(self, field: &str, pattern: &str) -> Self {
        self.clause(FilterClause::new(field, FilterOp::Ilike, pattern))
    }

    pub fn in_list<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        let joined = values.into_iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
        self.clause(FilterClause::new(field, FilterOp::In, format!("({})", joined)))
    }

    /// 追加已写好的过滤串（如实体配置里的 static_filter）
    pub fn and_raw(mut self, raw: Option<&str>) -> Self {
        if let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) {
            self.parts.push(raw.to_string());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// 空表达式返回 None（请求体省略 filtro）
    pub fn into_query(self) -> Option<String> {
        if self.parts.is_empty() {
            None
        } else {
            Some(self.parts.join(","))
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join(","))
    }
}

/// ISO-8601，毫秒精度，Z 结尾：2024-01-01T00:00:00.000Z
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 增量过滤：`<field>=gt.<last_sync_at>`，再 AND 上固定过滤
pub fn incremental_filter(
    field: &str,
    last_sync_at: Option<&DateTime<Utc>>,
    static_filter: Option<&str>,
) -> Option<String> {
    let expr = match last_sync_at {
        Some(ts) => FilterExpr::new().gt(field, format_timestamp(ts)),
        None => FilterExpr::new(),
    };
    expr.and_raw(static_filter).into_query()
}

/// 按顶层逗号拆分子句（括号内的逗号属于 in 列表）
pub fn split_clauses(filter: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in filter.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&filter[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&filter[start..]);
    out.into_iter().map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// 解析完整过滤串；任一子句非法返回 None
pub fn parse_filter(filter: &str) -> Option<Vec<FilterClause>> {
    split_clauses(filter).into_iter().map(FilterClause::parse).collect()
}
