//! 数据库迁移与初始化 - 由 refinery 管理
//!
//! - 版本 = migrations/ 下 V{n}__{name}.sql 文件顺序，编译期嵌入。
//! - 统一入口 `init_db`：pragmas → migrate → 版本校验。

mod embedded {
    use refinery::embed_migrations;

    embed_migrations!("./migrations");
}

use rusqlite::Connection;

use crate::error::{ErpSyncError, Result};
use crate::version::DB_VERSION;

const REFINERY_TABLE: &str = "refinery_schema_history";

/// 同步写入场景：WAL、NORMAL 同步、内存临时表。
const SYNC_PRAGMAS: &str = "
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;
PRAGMA foreign_keys=ON;
PRAGMA temp_store=MEMORY;
PRAGMA busy_timeout=5000;
";

pub fn enable_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(SYNC_PRAGMAS.trim())
        .map_err(|e| ErpSyncError::Database(format!("设置 PRAGMA 失败: {}", e)))?;
    Ok(())
}

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| ErpSyncError::Database(format!("执行 migration 失败: {}", e)))?;
    for migration in report.applied_migrations() {
        tracing::info!("已应用 migration: {}", migration);
    }
    Ok(())
}

/// 当前库内 migration 版本；无表或空表返回 None
pub fn current_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
        [REFINERY_TABLE],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(None);
    }

    let version: Option<i64> = conn.query_row(
        &format!("SELECT MAX(version) FROM {}", REFINERY_TABLE),
        [],
        |row| row.get::<_, Option<i64>>(0),
    )?;
    Ok(version.filter(|&v| v > 0))
}

/// 库内版本高于当前代码支持的版本时拒绝打开
fn check_db_version(conn: &Connection) -> Result<()> {
    let Some(v) = current_schema_version(conn)? else { return Ok(()); };
    if v > DB_VERSION {
        return Err(ErpSyncError::Database(format!(
            "数据库 schema 版本 {} 高于当前程序支持的最高版本 {}，请升级后再打开",
            v, DB_VERSION
        )));
    }
    Ok(())
}

pub fn init_db(conn: &mut Connection) -> Result<()> {
    enable_pragmas(conn)?;
    run_migrations(conn)?;
    check_db_version(conn)?;
    Ok(())
}
