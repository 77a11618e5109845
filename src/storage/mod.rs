//! SQLite 本地存储模块
//!
//! 为本地数据提供者提供持久化能力：
//! - 单词（分类字段反规范化在单词记录上）
//! - 完成记录（随单词级联删除）
//! - 全局设置（单行记录）

// ============================================================
// 子模块声明
// ============================================================

pub mod completion;
pub mod migrations;
pub mod settings;
pub mod word;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use completion::CompletionRepository;
pub use migrations::run_migrations;
pub use settings::SettingsRepository;
pub use word::{WordRecord, WordRepository};

// ============================================================
// 依赖导入
// ============================================================

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("数据库错误: {0}")]
    Database(rusqlite::Error),

    #[error("迁移错误: {0}")]
    Migration(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("数据未找到: {0}")]
    NotFound(String),

    #[error("数据已存在: {0}")]
    Duplicate(String),

    #[error("锁获取失败: {0}")]
    LockError(String),

    #[error("后台任务失败: {0}")]
    Task(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// 列值无法解析为领域类型时归为序列化错误
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..) => Self::Serialization(err.to_string()),
            other => Self::Database(other),
        }
    }
}

// ============================================================
// Storage - 数据库连接句柄
// ============================================================

/// 数据库连接句柄
///
/// 显式构造并传入本地数据提供者，不存在全局单例。
/// 克隆只复制内部 `Arc`，所有克隆共享同一个连接。
#[derive(Clone)]
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Storage {
    /// 打开（或创建）数据库文件
    ///
    /// 自动启用 WAL 模式、外键约束，并运行数据库迁移。
    ///
    /// # Arguments
    /// * `db_path` - 数据库文件路径，父目录不存在时自动创建
    pub fn open<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let connection = Connection::open(path)?;

        // 启用 WAL 模式以提高并发性能
        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA cache_size=-64000;",
        )?;

        Self::from_connection(connection, path.to_string_lossy().to_string())
    }

    /// 创建内存数据库（用于测试）
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;

        connection.execute_batch(
            "PRAGMA foreign_keys=ON;
             PRAGMA cache_size=-64000;",
        )?;

        Self::from_connection(connection, ":memory:".to_string())
    }

    fn from_connection(connection: Connection, db_path: String) -> StorageResult<Self> {
        migrations::run_migrations(&connection)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(connection)),
            db_path,
        })
    }

    /// 获取数据库路径
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// 获取数据库连接的锁
    pub fn get_connection(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// 当前 schema 版本
    pub fn schema_version(&self) -> StorageResult<i32> {
        let conn = self.get_connection()?;
        Ok(migrations::get_current_version(&conn))
    }

    /// 执行事务
    ///
    /// 闭包返回错误时事务自动回滚，返回成功时整体提交。
    ///
    /// # Example
    /// ```ignore
    /// let count = storage.transaction(|conn| {
    ///     WordRepository::new(conn).delete_by_category(CategoryType::Travel)
    /// })?;
    /// ```
    pub fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let mut conn = self.get_connection()?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }

    /// 在阻塞线程池中执行事务
    ///
    /// rusqlite 是同步 API，异步调用方通过此方法避免阻塞运行时。
    pub async fn transaction_blocking<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || storage.transaction(f))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

// ============================================================
// 时间格式工具
// ============================================================

/// 解析数据库中的时间字符串
pub(crate) fn parse_datetime(s: &str) -> StorageResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
    }

    Err(StorageError::Serialization(format!("无法解析时间: {}", s)))
}

/// 格式化时间用于存储
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_in_memory() {
        let storage = Storage::in_memory().expect("Failed to create in-memory storage");
        assert_eq!(storage.db_path(), ":memory:");
        assert_eq!(
            storage.schema_version().unwrap(),
            migrations::CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn test_transaction_commits() {
        let storage = Storage::in_memory().expect("Failed to create in-memory storage");

        let result = storage.transaction(|_conn| Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let storage = Storage::in_memory().expect("Failed to create in-memory storage");

        let result: StorageResult<()> = storage.transaction(|conn| {
            conn.execute(
                "INSERT INTO app_settings (id, current_language, updated_at) VALUES (1, 'fr', '2025-01-01T00:00:00Z')",
                [],
            )?;
            Err(StorageError::NotFound("故意失败".to_string()))
        });
        assert!(result.is_err());

        let conn = storage.get_connection().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM app_settings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_open_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vocab.db");

        let storage = Storage::open(&path).expect("Failed to open file storage");
        assert!(path.exists());
        assert!(storage.db_path().ends_with("vocab.db"));
    }

    #[tokio::test]
    async fn test_transaction_blocking() {
        let storage = Storage::in_memory().unwrap();
        let value = storage
            .transaction_blocking(|conn| {
                let v: i32 = conn.query_row("SELECT 7", [], |row| row.get(0))?;
                Ok(v)
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_datetime_roundtrip() {
        let now = Utc::now();
        let parsed = parse_datetime(&format_datetime(now)).unwrap();
        assert_eq!(parsed.timestamp(), now.timestamp());

        let legacy = parse_datetime("2025-01-01 08:30:00").unwrap();
        assert_eq!(legacy.to_rfc3339(), "2025-01-01T08:30:00+00:00");

        assert!(parse_datetime("not-a-date").is_err());
    }
}
