//! 本地 SQLite 数据提供者
//!
//! 每个操作在阻塞线程池中以单个事务执行；删除单词与清理完成记录在同一事务内提交。

use std::collections::HashSet;

use async_trait::async_trait;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{DataProviderError, ProviderResult};
use crate::models::{AppSettings, CategoryType, Language, Progress, VocabularyWord};
use crate::provider::{VocabularyDataProvider, VocabularyExport};
use crate::storage::{
    CompletionRepository, SettingsRepository, Storage, StorageResult, WordRepository,
};

pub struct LocalVocabularyProvider {
    storage: Storage,
}

impl LocalVocabularyProvider {
    /// 使用已打开的存储句柄创建
    pub fn new(storage: Storage) -> Self {
        info!(db_path = storage.db_path(), "本地数据提供者已创建");
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    async fn run<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.storage.transaction_blocking(f).await
    }
}

/// 删除单词并级联清理完成记录
fn delete_words_cascade(conn: &Connection, ids: &[String]) -> StorageResult<usize> {
    CompletionRepository::new(conn).delete_for_words(ids)?;
    WordRepository::new(conn).delete_many(ids)
}

fn delete_category_cascade(conn: &Connection, category: CategoryType) -> StorageResult<usize> {
    CompletionRepository::new(conn).delete_for_category(category.as_str())?;
    WordRepository::new(conn).delete_by_category(category)
}

#[async_trait]
impl VocabularyDataProvider for LocalVocabularyProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    // ============================================================
    // 单词查询
    // ============================================================

    async fn fetch_words(&self, category: CategoryType) -> ProviderResult<Vec<VocabularyWord>> {
        let words = self
            .run(move |conn| WordRepository::new(conn).list_by_category(category))
            .await?;
        Ok(words)
    }

    async fn fetch_all_words(&self) -> ProviderResult<Vec<VocabularyWord>> {
        let mut records = self
            .run(|conn| WordRepository::new(conn).list_all())
            .await?;

        // 稳定排序：分类之间按 CategoryType::ALL 顺序，分类内保持插入顺序
        records.sort_by_key(|record| record.category);
        Ok(records.into_iter().map(|record| record.word).collect())
    }

    async fn fetch_words_for_language(
        &self,
        category: CategoryType,
        language: Language,
    ) -> ProviderResult<Vec<VocabularyWord>> {
        let words = self.fetch_words(category).await?;
        Ok(crate::models::filter_by_language(words, language))
    }

    async fn fetch_word(&self, id: &str) -> ProviderResult<VocabularyWord> {
        let owned = id.to_string();
        let record = self
            .run(move |conn| WordRepository::new(conn).get(&owned))
            .await?;

        record
            .map(|record| record.word)
            .ok_or_else(|| DataProviderError::word_not_found(id))
    }

    // ============================================================
    // 单词写入
    // ============================================================

    async fn create_word(
        &self,
        word: VocabularyWord,
        category: CategoryType,
    ) -> ProviderResult<VocabularyWord> {
        let stored = word.clone();
        self.run(move |conn| WordRepository::new(conn).insert(&stored, category))
            .await
            .map_err(DataProviderError::from_save)?;

        debug!(word_id = %word.id, category = %category, "创建单词");
        Ok(word)
    }

    async fn create_words(
        &self,
        words: Vec<VocabularyWord>,
        category: CategoryType,
    ) -> ProviderResult<Vec<VocabularyWord>> {
        let stored = words.clone();
        self.run(move |conn| WordRepository::new(conn).insert_batch(&stored, category))
            .await
            .map_err(DataProviderError::from_save)?;

        debug!(category = %category, count = words.len(), "批量创建单词");
        Ok(words)
    }

    async fn update_word(
        &self,
        word: VocabularyWord,
        category: CategoryType,
    ) -> ProviderResult<VocabularyWord> {
        let stored = word.clone();
        self.run(move |conn| WordRepository::new(conn).update(&stored, category))
            .await
            .map_err(DataProviderError::from_save)?;

        Ok(word)
    }

    async fn delete_word(&self, id: &str) -> ProviderResult<()> {
        let ids = vec![id.to_string()];
        self.run(move |conn| delete_words_cascade(conn, &ids))
            .await
            .map_err(DataProviderError::from_delete)?;
        Ok(())
    }

    async fn delete_words(&self, ids: &[String]) -> ProviderResult<()> {
        let ids = ids.to_vec();
        let deleted = self
            .run(move |conn| delete_words_cascade(conn, &ids))
            .await
            .map_err(DataProviderError::from_delete)?;

        debug!(count = deleted, "批量删除单词");
        Ok(())
    }

    async fn delete_all_words(&self, category: CategoryType) -> ProviderResult<()> {
        let deleted = self
            .run(move |conn| delete_category_cascade(conn, category))
            .await
            .map_err(DataProviderError::from_delete)?;

        info!(category = %category, count = deleted, "清空分类单词");
        Ok(())
    }

    // ============================================================
    // 学习进度
    // ============================================================

    async fn mark_word_completed(&self, id: &str) -> ProviderResult<()> {
        let owned = id.to_string();
        self.run(move |conn| CompletionRepository::new(conn).mark(&owned))
            .await
            .map_err(DataProviderError::from_save)
    }

    async fn mark_word_incomplete(&self, id: &str) -> ProviderResult<()> {
        let owned = id.to_string();
        self.run(move |conn| CompletionRepository::new(conn).unmark(&owned))
            .await
            .map_err(DataProviderError::from_delete)?;
        Ok(())
    }

    async fn is_word_completed(&self, id: &str) -> ProviderResult<bool> {
        let owned = id.to_string();
        let completed = self
            .run(move |conn| CompletionRepository::new(conn).is_completed(&owned))
            .await?;
        Ok(completed)
    }

    async fn fetch_completed_word_ids(&self) -> ProviderResult<HashSet<String>> {
        let ids = self
            .run(|conn| CompletionRepository::new(conn).completed_ids())
            .await?;
        Ok(ids)
    }

    async fn fetch_progress(
        &self,
        category: CategoryType,
        language: Language,
    ) -> ProviderResult<Progress> {
        let (words, completed) = self
            .run(move |conn| {
                let words = WordRepository::new(conn).list_by_category(category)?;
                let completed = CompletionRepository::new(conn).completed_ids()?;
                Ok((words, completed))
            })
            .await?;

        let matching: Vec<_> = words
            .iter()
            .filter(|word| word.matches_language(language))
            .collect();
        let done = matching
            .iter()
            .filter(|word| completed.contains(&word.id))
            .count();

        Ok(Progress::new(done, matching.len()))
    }

    // ============================================================
    // 设置
    // ============================================================

    async fn get_settings(&self) -> ProviderResult<AppSettings> {
        let settings = self
            .run(|conn| SettingsRepository::new(conn).load_or_init())
            .await?;
        Ok(settings)
    }

    async fn update_settings(&self, settings: AppSettings) -> ProviderResult<()> {
        self.run(move |conn| SettingsRepository::new(conn).save(&settings))
            .await
            .map_err(DataProviderError::from_save)
    }

    // ============================================================
    // 导入导出与重置
    // ============================================================

    async fn import_vocabulary(
        &self,
        words: Vec<VocabularyWord>,
        category: CategoryType,
        replace_existing: bool,
    ) -> ProviderResult<()> {
        let count = words.len();
        self.run(move |conn| {
            if replace_existing {
                delete_category_cascade(conn, category)?;
            }
            WordRepository::new(conn).insert_batch(&words, category)
        })
        .await
        .map_err(DataProviderError::from_save)?;

        info!(category = %category, count, replace_existing, "导入单词");
        Ok(())
    }

    async fn export_vocabulary(&self) -> ProviderResult<VocabularyExport> {
        let records = self
            .run(|conn| WordRepository::new(conn).list_all())
            .await?;

        let mut export: VocabularyExport = CategoryType::ALL
            .into_iter()
            .map(|category| (category, Vec::new()))
            .collect();
        for record in records {
            export.entry(record.category).or_default().push(record.word);
        }
        Ok(export)
    }

    async fn reset_all_data(&self) -> ProviderResult<()> {
        self.run(|conn| {
            CompletionRepository::new(conn).clear()?;
            WordRepository::new(conn).delete_all()?;
            SettingsRepository::new(conn).clear()
        })
        .await
        .map_err(DataProviderError::from_delete)?;

        info!("本地数据已重置");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> LocalVocabularyProvider {
        LocalVocabularyProvider::new(Storage::in_memory().expect("内存数据库创建失败"))
    }

    fn word(id: &str) -> VocabularyWord {
        VocabularyWord::new(id, "释义", "例句").with_id(id)
    }

    #[tokio::test]
    async fn test_fetch_all_orders_by_category() {
        let provider = provider();
        provider.create_word(word("t-1"), CategoryType::Travel).await.unwrap();
        provider.create_word(word("b-1"), CategoryType::Business).await.unwrap();
        provider.create_word(word("t-2"), CategoryType::Travel).await.unwrap();
        provider.create_word(word("a-1"), CategoryType::Academic).await.unwrap();

        let ids: Vec<String> = provider
            .fetch_all_words()
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec!["b-1", "t-1", "t-2", "a-1"]);
    }

    #[tokio::test]
    async fn test_unparseable_row_is_invalid_data() {
        let provider = provider();
        provider
            .storage()
            .get_connection()
            .unwrap()
            .execute(
                "INSERT INTO word (id, word, definition, example, category, created_at, updated_at)
                 VALUES ('bad', 'w', 'd', '', 'nowhere', 'now', 'now')",
                [],
            )
            .unwrap();

        assert!(matches!(
            provider.fetch_word("bad").await,
            Err(DataProviderError::InvalidData(_))
        ));
        assert!(matches!(
            provider.fetch_all_words().await,
            Err(DataProviderError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_create_maps_to_save_failed() {
        let provider = provider();
        provider.create_word(word("w"), CategoryType::Daily).await.unwrap();

        let err = provider
            .create_word(word("w"), CategoryType::Daily)
            .await
            .unwrap_err();
        assert!(matches!(err, DataProviderError::SaveFailed(_)));
    }

    #[tokio::test]
    async fn test_bulk_create_rolls_back() {
        let provider = provider();
        provider.create_word(word("x"), CategoryType::Daily).await.unwrap();

        let err = provider
            .create_words(vec![word("y"), word("x")], CategoryType::Travel)
            .await
            .unwrap_err();
        assert!(matches!(err, DataProviderError::SaveFailed(_)));
        assert!(provider.fetch_words(CategoryType::Travel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let provider = provider();
        let err = provider
            .update_word(word("ghost"), CategoryType::Daily)
            .await
            .unwrap_err();
        assert!(matches!(err, DataProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_mark_unknown_word_is_not_found() {
        let provider = provider();
        let err = provider.mark_word_completed("ghost").await.unwrap_err();
        assert!(matches!(err, DataProviderError::NotFound(_)));

        // 取消标记不存在的单词是空操作
        provider.mark_word_incomplete("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_all_words_cascades() {
        let provider = provider();
        provider
            .create_words(vec![word("a"), word("b")], CategoryType::Business)
            .await
            .unwrap();
        provider.create_word(word("c"), CategoryType::Travel).await.unwrap();
        for id in ["a", "b", "c"] {
            provider.mark_word_completed(id).await.unwrap();
        }

        provider.delete_all_words(CategoryType::Business).await.unwrap();

        let completed = provider.fetch_completed_word_ids().await.unwrap();
        assert_eq!(completed, HashSet::from(["c".to_string()]));
    }

    #[tokio::test]
    async fn test_settings_lazy_init_and_update() {
        let provider = provider();
        assert_eq!(provider.get_settings().await.unwrap(), AppSettings::default());

        let settings = AppSettings {
            current_language: Language::Es,
            last_sync_date: None,
            user_id: Some("u-1".into()),
        };
        provider.update_settings(settings.clone()).await.unwrap();
        assert_eq!(provider.get_settings().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_import_replace_clears_completions() {
        let provider = provider();
        provider.create_word(word("old"), CategoryType::Daily).await.unwrap();
        provider.mark_word_completed("old").await.unwrap();

        provider
            .import_vocabulary(vec![word("new")], CategoryType::Daily, true)
            .await
            .unwrap();

        let ids: Vec<String> = provider
            .fetch_words(CategoryType::Daily)
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec!["new"]);
        assert!(provider.fetch_completed_word_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_includes_every_category() {
        let provider = provider();
        provider.create_word(word("a"), CategoryType::Academic).await.unwrap();

        let export = provider.export_vocabulary().await.unwrap();
        assert_eq!(export.len(), CategoryType::ALL.len());
        assert_eq!(export[&CategoryType::Academic].len(), 1);
        assert!(export[&CategoryType::Business].is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.db");

        {
            let provider = LocalVocabularyProvider::new(Storage::open(&path).unwrap());
            provider.create_word(word("keep"), CategoryType::Travel).await.unwrap();
            provider.mark_word_completed("keep").await.unwrap();
            provider.set_current_language(Language::Pt).await.unwrap();
        }

        let provider = LocalVocabularyProvider::new(Storage::open(&path).unwrap());
        assert_eq!(provider.fetch_word("keep").await.unwrap().id, "keep");
        assert!(provider.is_word_completed("keep").await.unwrap());
        assert_eq!(provider.get_current_language().await.unwrap(), Language::Pt);
    }
}
