//! 单词表数据库操作
//!
//! 分类信息反规范化存储在每条单词记录的 `category` 字段上，
//! 因此所有写操作都必须显式给出分类。

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;

use crate::models::{CategoryType, Language, VocabularyWord};
use crate::storage::{format_datetime, StorageError, StorageResult};

const WORD_COLUMNS: &str = "id, word, definition, example, pronunciation, language, translation_language, category";

/// 带分类的单词记录
#[derive(Debug, Clone)]
pub struct WordRecord {
    pub category: CategoryType,
    pub word: VocabularyWord,
}

fn parse_column<T: std::str::FromStr<Err = String>>(
    row: &Row,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => raw.parse::<T>().map(Some).map_err(|msg| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
        }),
        None => Ok(None),
    }
}

impl WordRecord {
    /// 从数据库行解析（列顺序与 `WORD_COLUMNS` 一致）
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let category = parse_column::<CategoryType>(row, 7)?.ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                7,
                rusqlite::types::Type::Null,
                "单词缺少分类".into(),
            )
        })?;

        Ok(Self {
            category,
            word: VocabularyWord {
                id: row.get(0)?,
                word: row.get(1)?,
                definition: row.get(2)?,
                example: row.get(3)?,
                pronunciation: row.get(4)?,
                language: parse_column::<Language>(row, 5)?,
                translation_language: parse_column::<Language>(row, 6)?,
            },
        })
    }
}

/// 借用连接的单词仓库
///
/// 只持有 `&Connection`，由调用方在 `Storage::transaction` 中构造，
/// 多个仓库的操作因此落在同一个事务里。
pub struct WordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> WordRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ============================================================
    // 查询
    // ============================================================

    /// 根据 ID 获取单词及其分类
    pub fn get(&self, id: &str) -> StorageResult<Option<WordRecord>> {
        let sql = format!("SELECT {} FROM word WHERE id = ?1", WORD_COLUMNS);
        let record = self
            .conn
            .query_row(&sql, params![id], WordRecord::from_row)
            .optional()?;

        Ok(record)
    }

    pub fn exists(&self, id: &str) -> StorageResult<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM word WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;

        Ok(exists)
    }

    /// 获取分类下的全部单词（按插入顺序）
    pub fn list_by_category(&self, category: CategoryType) -> StorageResult<Vec<VocabularyWord>> {
        let sql = format!(
            "SELECT {} FROM word WHERE category = ?1 ORDER BY rowid",
            WORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let words = stmt
            .query_map(params![category.as_str()], WordRecord::from_row)?
            .map(|r| r.map(|record| record.word))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(words)
    }

    /// 获取全部单词（按插入顺序，未按分类排序）
    pub fn list_all(&self) -> StorageResult<Vec<WordRecord>> {
        let sql = format!("SELECT {} FROM word ORDER BY rowid", WORD_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], WordRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// 分类下的单词 ID
    pub fn ids_by_category(&self, category: CategoryType) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM word WHERE category = ?1 ORDER BY rowid")?;
        let ids = stmt
            .query_map(params![category.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(ids)
    }

    pub fn count(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM word", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ============================================================
    // 写入
    // ============================================================

    /// 插入单个单词，ID 已存在时返回 `Duplicate`
    pub fn insert(&self, word: &VocabularyWord, category: CategoryType) -> StorageResult<()> {
        if self.exists(&word.id)? {
            return Err(StorageError::Duplicate(format!("单词 {}", word.id)));
        }

        let now = format_datetime(Utc::now());
        self.conn.execute(
            r#"
            INSERT INTO word (
                id, word, definition, example, pronunciation,
                language, translation_language, category, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                word.id,
                word.word,
                word.definition,
                word.example,
                word.pronunciation,
                word.language.map(|l| l.code()),
                word.translation_language.map(|l| l.code()),
                category.as_str(),
                now,
            ],
        )?;

        Ok(())
    }

    /// 批量插入
    ///
    /// 批次内重复或与已有单词重复时整体失败；调用方在事务中执行以保证原子性。
    pub fn insert_batch(&self, words: &[VocabularyWord], category: CategoryType) -> StorageResult<()> {
        let mut seen = HashSet::with_capacity(words.len());
        for word in words {
            if !seen.insert(word.id.as_str()) {
                return Err(StorageError::Duplicate(format!("批次内重复的单词 {}", word.id)));
            }
        }

        for word in words {
            self.insert(word, category)?;
        }

        Ok(())
    }

    /// 更新单词内容与分类，ID 不存在时返回 `NotFound`
    pub fn update(&self, word: &VocabularyWord, category: CategoryType) -> StorageResult<()> {
        let affected = self.conn.execute(
            r#"
            UPDATE word SET
                word = ?2, definition = ?3, example = ?4, pronunciation = ?5,
                language = ?6, translation_language = ?7, category = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                word.id,
                word.word,
                word.definition,
                word.example,
                word.pronunciation,
                word.language.map(|l| l.code()),
                word.translation_language.map(|l| l.code()),
                category.as_str(),
                format_datetime(Utc::now()),
            ],
        )?;

        if affected == 0 {
            return Err(StorageError::NotFound(format!("单词 {}", word.id)));
        }

        Ok(())
    }

    // ============================================================
    // 删除
    // ============================================================

    /// 删除单个单词，返回删除的行数（不存在时为 0）
    pub fn delete(&self, id: &str) -> StorageResult<usize> {
        let affected = self
            .conn
            .execute("DELETE FROM word WHERE id = ?1", params![id])?;
        Ok(affected)
    }

    pub fn delete_many(&self, ids: &[String]) -> StorageResult<usize> {
        let mut stmt = self.conn.prepare("DELETE FROM word WHERE id = ?1")?;
        let mut affected = 0;
        for id in ids {
            affected += stmt.execute(params![id])?;
        }
        Ok(affected)
    }

    pub fn delete_by_category(&self, category: CategoryType) -> StorageResult<usize> {
        let affected = self
            .conn
            .execute("DELETE FROM word WHERE category = ?1", params![category.as_str()])?;
        Ok(affected)
    }

    pub fn delete_all(&self) -> StorageResult<usize> {
        let affected = self.conn.execute("DELETE FROM word", [])?;
        Ok(affected)
    }
}
