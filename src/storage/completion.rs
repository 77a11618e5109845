//! 完成记录数据库操作
//!
//! 完成记录的存在即表示单词已掌握。`completed_word.word_id` 通过外键
//! 级联删除，删除单词的同一事务内也会显式清理完成记录。

use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashSet;

use crate::storage::{format_datetime, StorageError, StorageResult};

pub struct CompletionRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CompletionRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 标记单词已完成
    ///
    /// 单词不存在时返回 `NotFound`；重复标记保持原有完成时间。
    pub fn mark(&self, word_id: &str) -> StorageResult<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM word WHERE id = ?1)",
            params![word_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::NotFound(format!("单词 {}", word_id)));
        }

        self.conn.execute(
            "INSERT OR IGNORE INTO completed_word (word_id, completed_at) VALUES (?1, ?2)",
            params![word_id, format_datetime(Utc::now())],
        )?;

        Ok(())
    }

    /// 取消完成标记，返回是否确实删除了记录
    pub fn unmark(&self, word_id: &str) -> StorageResult<bool> {
        let affected = self.conn.execute(
            "DELETE FROM completed_word WHERE word_id = ?1",
            params![word_id],
        )?;
        Ok(affected > 0)
    }

    pub fn is_completed(&self, word_id: &str) -> StorageResult<bool> {
        let completed = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM completed_word WHERE word_id = ?1)",
            params![word_id],
            |row| row.get(0),
        )?;
        Ok(completed)
    }

    pub fn completed_ids(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT word_id FROM completed_word")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(ids)
    }

    // ============================================================
    // 级联清理
    // ============================================================

    pub fn delete_for_words(&self, word_ids: &[String]) -> StorageResult<usize> {
        let mut stmt = self
            .conn
            .prepare("DELETE FROM completed_word WHERE word_id = ?1")?;
        let mut affected = 0;
        for id in word_ids {
            affected += stmt.execute(params![id])?;
        }
        Ok(affected)
    }

    pub fn delete_for_category(&self, category: &str) -> StorageResult<usize> {
        let affected = self.conn.execute(
            "DELETE FROM completed_word WHERE word_id IN (SELECT id FROM word WHERE category = ?1)",
            params![category],
        )?;
        Ok(affected)
    }

    pub fn clear(&self) -> StorageResult<usize> {
        let affected = self.conn.execute("DELETE FROM completed_word", [])?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryType, VocabularyWord};
    use crate::storage::{Storage, WordRepository};

    fn seeded() -> Storage {
        let storage = Storage::in_memory().unwrap();
        storage
            .transaction(|conn| {
                let words = WordRepository::new(conn);
                words.insert(&VocabularyWord::new("a", "d", "").with_id("w-1"), CategoryType::Business)?;
                words.insert(&VocabularyWord::new("b", "d", "").with_id("w-2"), CategoryType::Travel)?;
                Ok(())
            })
            .unwrap();
        storage
    }

    #[test]
    fn test_mark_is_idempotent() {
        let storage = seeded();
        let conn = storage.get_connection().unwrap();
        let repo = CompletionRepository::new(&conn);

        repo.mark("w-1").unwrap();
        repo.mark("w-1").unwrap();

        assert!(repo.is_completed("w-1").unwrap());
        assert_eq!(repo.completed_ids().unwrap().len(), 1);
    }

    #[test]
    fn test_mark_unknown_word_fails() {
        let storage = seeded();
        let conn = storage.get_connection().unwrap();
        let result = CompletionRepository::new(&conn).mark("ghost");
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_unmark() {
        let storage = seeded();
        let conn = storage.get_connection().unwrap();
        let repo = CompletionRepository::new(&conn);

        repo.mark("w-2").unwrap();
        assert!(repo.unmark("w-2").unwrap());
        // 未完成的单词取消标记不报错
        assert!(!repo.unmark("w-2").unwrap());
        assert!(!repo.unmark("ghost").unwrap());
    }

    #[test]
    fn test_foreign_key_cascade() {
        let storage = seeded();
        let conn = storage.get_connection().unwrap();
        let repo = CompletionRepository::new(&conn);
        repo.mark("w-1").unwrap();

        // 只删单词，依赖外键级联
        WordRepository::new(&conn).delete("w-1").unwrap();
        assert!(!repo.is_completed("w-1").unwrap());
    }

    #[test]
    fn test_delete_for_category() {
        let storage = seeded();
        let conn = storage.get_connection().unwrap();
        let repo = CompletionRepository::new(&conn);
        repo.mark("w-1").unwrap();
        repo.mark("w-2").unwrap();

        assert_eq!(repo.delete_for_category("travel").unwrap(), 1);
        let remaining = repo.completed_ids().unwrap();
        assert!(remaining.contains("w-1"));
        assert!(!remaining.contains("w-2"));

        assert_eq!(repo.clear().unwrap(), 1);
    }
}
