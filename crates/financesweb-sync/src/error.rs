use thiserror::Error;

/// 同步引擎统一错误类型
#[derive(Debug, Error)]
pub enum ErpSyncError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    JsonError(String),
    /// 网络层失败（连接、超时、读取响应体）
    #[error("Transport error: {0}")]
    Transport(String),
    /// 远端返回非 2xx
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    IO(String),
    #[error("Other error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for ErpSyncError {
    fn from(error: serde_json::Error) -> Self {
        ErpSyncError::JsonError(error.to_string())
    }
}

impl From<std::io::Error> for ErpSyncError {
    fn from(error: std::io::Error) -> Self {
        ErpSyncError::IO(error.to_string())
    }
}

impl From<reqwest::Error> for ErpSyncError {
    fn from(error: reqwest::Error) -> Self {
        ErpSyncError::Transport(error.to_string())
    }
}

impl ErpSyncError {
    /// 远端 HTTP 状态码（仅 Http 变体）
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ErpSyncError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 是否为拉取阶段（网络/远端）错误
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, ErpSyncError::Transport(_) | ErpSyncError::Http { .. })
    }
}

pub type Result<T> = std::result::Result<T, ErpSyncError>;
