//! 占位数据提供者
//!
//! 可以被配置选中，但每个操作都立即返回 `NotImplemented`。不是生产路径。

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{DataProviderError, ProviderResult};
use crate::models::{AppSettings, CategoryType, Language, Progress, VocabularyWord};
use crate::provider::{VocabularyDataProvider, VocabularyExport};

pub struct UnimplementedVocabularyProvider;

impl UnimplementedVocabularyProvider {
    pub fn new() -> Self {
        warn!("选择了尚未实现的数据提供者，所有操作都会失败");
        Self
    }
}

impl Default for UnimplementedVocabularyProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn not_implemented<T>(operation: &'static str) -> ProviderResult<T> {
    Err(DataProviderError::NotImplemented(operation))
}

#[async_trait]
impl VocabularyDataProvider for UnimplementedVocabularyProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn fetch_words(&self, _category: CategoryType) -> ProviderResult<Vec<VocabularyWord>> {
        not_implemented("fetch_words")
    }

    async fn fetch_all_words(&self) -> ProviderResult<Vec<VocabularyWord>> {
        not_implemented("fetch_all_words")
    }

    async fn fetch_words_for_language(
        &self,
        _category: CategoryType,
        _language: Language,
    ) -> ProviderResult<Vec<VocabularyWord>> {
        not_implemented("fetch_words_for_language")
    }

    async fn fetch_word(&self, _id: &str) -> ProviderResult<VocabularyWord> {
        not_implemented("fetch_word")
    }

    async fn create_word(
        &self,
        _word: VocabularyWord,
        _category: CategoryType,
    ) -> ProviderResult<VocabularyWord> {
        not_implemented("create_word")
    }

    async fn create_words(
        &self,
        _words: Vec<VocabularyWord>,
        _category: CategoryType,
    ) -> ProviderResult<Vec<VocabularyWord>> {
        not_implemented("create_words")
    }

    async fn update_word(
        &self,
        _word: VocabularyWord,
        _category: CategoryType,
    ) -> ProviderResult<VocabularyWord> {
        not_implemented("update_word")
    }

    async fn delete_word(&self, _id: &str) -> ProviderResult<()> {
        not_implemented("delete_word")
    }

    async fn delete_words(&self, _ids: &[String]) -> ProviderResult<()> {
        not_implemented("delete_words")
    }

    async fn delete_all_words(&self, _category: CategoryType) -> ProviderResult<()> {
        not_implemented("delete_all_words")
    }

    async fn mark_word_completed(&self, _id: &str) -> ProviderResult<()> {
        not_implemented("mark_word_completed")
    }

    async fn mark_word_incomplete(&self, _id: &str) -> ProviderResult<()> {
        not_implemented("mark_word_incomplete")
    }

    async fn is_word_completed(&self, _id: &str) -> ProviderResult<bool> {
        not_implemented("is_word_completed")
    }

    async fn fetch_completed_word_ids(&self) -> ProviderResult<HashSet<String>> {
        not_implemented("fetch_completed_word_ids")
    }

    async fn fetch_progress(
        &self,
        _category: CategoryType,
        _language: Language,
    ) -> ProviderResult<Progress> {
        not_implemented("fetch_progress")
    }

    async fn get_settings(&self) -> ProviderResult<AppSettings> {
        not_implemented("get_settings")
    }

    async fn update_settings(&self, _settings: AppSettings) -> ProviderResult<()> {
        not_implemented("update_settings")
    }

    async fn import_vocabulary(
        &self,
        _words: Vec<VocabularyWord>,
        _category: CategoryType,
        _replace_existing: bool,
    ) -> ProviderResult<()> {
        not_implemented("import_vocabulary")
    }

    async fn export_vocabulary(&self) -> ProviderResult<VocabularyExport> {
        not_implemented("export_vocabulary")
    }

    async fn reset_all_data(&self) -> ProviderResult<()> {
        not_implemented("reset_all_data")
    }
}
