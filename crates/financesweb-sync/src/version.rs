//! 版本与构建元信息
//!
//! - **Crate Version** → Cargo.toml
//! - **Schema Version** → migrations/ 文件（由 refinery 管理，build.rs 取最大版本号）
//! - **Build Metadata** → vergen

/// crate semver，来自 Cargo.toml
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// git commit（由 vergen 在 build.rs 中生成）
pub const GIT_SHA: &str = env!("VERGEN_GIT_SHA");

/// 构建时间（由 vergen 在 build.rs 中生成）
pub const BUILD_TIME: &str = env!("VERGEN_BUILD_TIMESTAMP");

/// 当前代码支持的最高 schema 版本（refinery_schema_history.version 的上限）。
/// 打开数据库时若库内版本更高则拒绝，避免旧版本程序写坏新 schema。
pub const DB_VERSION: i64 = parse_db_version(env!("SYNC_DB_VERSION"));

const fn parse_db_version(s: &str) -> i64 {
    let b = s.as_bytes();
    let mut v = 0i64;
    let mut i = 0usize;
    while i < b.len() {
        if b[i] >= b'0' && b[i] <= b'9' {
            v = v * 10 + (b[i] - b'0') as i64;
        }
        i += 1;
    }
    v
}

/// 单行版本描述，用于启动日志
pub fn version_line() -> String {
    format!(
        "financesweb-sync {} (git {}, built {}, schema v{})",
        CRATE_VERSION, GIT_SHA, BUILD_TIME, DB_VERSION
    )
}
