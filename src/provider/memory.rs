//! 内存数据提供者
//!
//! 状态只存在于进程生命周期内，构造时用默认词库填充。每个操作都带有
//! 人为延迟（单条操作较快，批量操作较慢），用来检验调用方是否正确处理异步完成。

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{DataProviderError, ProviderResult};
use crate::models::{AppSettings, CategoryType, Language, Progress, VocabularyWord};
use crate::provider::{VocabularyDataProvider, VocabularyExport};
use crate::seed;

// ============================================================
// Latency - 延迟配置
// ============================================================

/// 各类操作的人为延迟
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub settings: Duration,
    pub progress: Duration,
    pub single: Duration,
    pub bulk_delete: Duration,
    pub bulk_write: Duration,
    pub import: Duration,
}

impl Default for Latency {
    fn default() -> Self {
        Self {
            settings: Duration::from_millis(30),
            progress: Duration::from_millis(50),
            single: Duration::from_millis(100),
            bulk_delete: Duration::from_millis(150),
            bulk_write: Duration::from_millis(200),
            import: Duration::from_millis(300),
        }
    }
}

impl Latency {
    /// 无延迟
    pub fn none() -> Self {
        Self {
            settings: Duration::ZERO,
            progress: Duration::ZERO,
            single: Duration::ZERO,
            bulk_delete: Duration::ZERO,
            bulk_write: Duration::ZERO,
            import: Duration::ZERO,
        }
    }
}

// ============================================================
// 内部状态
// ============================================================

#[derive(Debug, Default)]
struct MemoryState {
    words: BTreeMap<CategoryType, Vec<VocabularyWord>>,
    completed: HashSet<String>,
    settings: Option<AppSettings>,
}

impl MemoryState {
    fn contains(&self, id: &str) -> bool {
        self.words.values().flatten().any(|w| w.id == id)
    }

    fn find(&self, id: &str) -> Option<&VocabularyWord> {
        self.words.values().flatten().find(|w| w.id == id)
    }

    fn category_words(&self, category: CategoryType) -> &[VocabularyWord] {
        self.words.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    /// 校验新单词的 ID：批次内不重复且与已有单词不冲突
    fn check_new_ids(&self, words: &[VocabularyWord], skip: Option<CategoryType>) -> ProviderResult<()> {
        let mut seen = HashSet::with_capacity(words.len());
        for word in words {
            if !seen.insert(word.id.as_str()) {
                return Err(DataProviderError::SaveFailed(format!(
                    "批次内重复的单词 {}",
                    word.id
                )));
            }
            let conflict = self
                .words
                .iter()
                .filter(|(category, _)| Some(**category) != skip)
                .flat_map(|(_, list)| list.iter())
                .any(|w| w.id == word.id);
            if conflict {
                return Err(DataProviderError::SaveFailed(format!("单词 {} 已存在", word.id)));
            }
        }
        Ok(())
    }

    fn remove_ids(&mut self, ids: &HashSet<&str>) {
        for list in self.words.values_mut() {
            list.retain(|w| !ids.contains(w.id.as_str()));
        }
        self.completed.retain(|id| !ids.contains(id.as_str()));
    }

    fn clear_category(&mut self, category: CategoryType) {
        if let Some(list) = self.words.remove(&category) {
            for word in list {
                self.completed.remove(&word.id);
            }
        }
    }
}

// ============================================================
// InMemoryVocabularyProvider
// ============================================================

pub struct InMemoryVocabularyProvider {
    state: RwLock<MemoryState>,
    latency: Latency,
}

impl InMemoryVocabularyProvider {
    /// 使用默认词库和默认延迟创建
    pub fn new() -> Self {
        let words = seed::default_categories()
            .into_iter()
            .map(|category| (category.category_type, category.words))
            .collect();

        Self {
            state: RwLock::new(MemoryState {
                words,
                ..Default::default()
            }),
            latency: Latency::default(),
        }
    }

    /// 不含任何单词
    pub fn empty() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            latency: Latency::default(),
        }
    }

    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    async fn delay(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

impl Default for InMemoryVocabularyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VocabularyDataProvider for InMemoryVocabularyProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_words(&self, category: CategoryType) -> ProviderResult<Vec<VocabularyWord>> {
        self.delay(self.latency.single).await;
        Ok(self.state.read().await.category_words(category).to_vec())
    }

    async fn fetch_all_words(&self) -> ProviderResult<Vec<VocabularyWord>> {
        self.delay(self.latency.single).await;
        let state = self.state.read().await;
        Ok(CategoryType::ALL
            .into_iter()
            .flat_map(|category| state.category_words(category).to_vec())
            .collect())
    }

    async fn fetch_words_for_language(
        &self,
        category: CategoryType,
        language: Language,
    ) -> ProviderResult<Vec<VocabularyWord>> {
        self.delay(self.latency.single).await;
        let state = self.state.read().await;
        Ok(state
            .category_words(category)
            .iter()
            .filter(|w| w.matches_language(language))
            .cloned()
            .collect())
    }

    async fn fetch_word(&self, id: &str) -> ProviderResult<VocabularyWord> {
        self.delay(self.latency.single).await;
        self.state
            .read()
            .await
            .find(id)
            .cloned()
            .ok_or_else(|| DataProviderError::word_not_found(id))
    }

    async fn create_word(
        &self,
        word: VocabularyWord,
        category: CategoryType,
    ) -> ProviderResult<VocabularyWord> {
        self.delay(self.latency.single).await;
        let mut state = self.state.write().await;
        state.check_new_ids(std::slice::from_ref(&word), None)?;
        state.words.entry(category).or_default().push(word.clone());
        Ok(word)
    }

    async fn create_words(
        &self,
        words: Vec<VocabularyWord>,
        category: CategoryType,
    ) -> ProviderResult<Vec<VocabularyWord>> {
        self.delay(self.latency.bulk_write).await;
        let mut state = self.state.write().await;
        state.check_new_ids(&words, None)?;
        state
            .words
            .entry(category)
            .or_default()
            .extend(words.iter().cloned());
        debug!(category = %category, count = words.len(), "批量创建单词");
        Ok(words)
    }

    async fn update_word(
        &self,
        word: VocabularyWord,
        category: CategoryType,
    ) -> ProviderResult<VocabularyWord> {
        self.delay(self.latency.single).await;
        let mut state = self.state.write().await;

        let current = state
            .words
            .iter()
            .find_map(|(cat, list)| list.iter().position(|w| w.id == word.id).map(|idx| (*cat, idx)));

        match current {
            Some((cat, idx)) if cat == category => {
                if let Some(list) = state.words.get_mut(&cat) {
                    list[idx] = word.clone();
                }
            }
            Some((cat, idx)) => {
                if let Some(list) = state.words.get_mut(&cat) {
                    list.remove(idx);
                }
                state.words.entry(category).or_default().push(word.clone());
            }
            None => return Err(DataProviderError::word_not_found(&word.id)),
        }

        Ok(word)
    }

    async fn delete_word(&self, id: &str) -> ProviderResult<()> {
        self.delay(self.latency.single).await;
        let ids = HashSet::from([id]);
        self.state.write().await.remove_ids(&ids);
        Ok(())
    }

    async fn delete_words(&self, ids: &[String]) -> ProviderResult<()> {
        self.delay(self.latency.bulk_delete).await;
        let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.state.write().await.remove_ids(&ids);
        Ok(())
    }

    async fn delete_all_words(&self, category: CategoryType) -> ProviderResult<()> {
        self.delay(self.latency.single).await;
        self.state.write().await.clear_category(category);
        Ok(())
    }

    async fn mark_word_completed(&self, id: &str) -> ProviderResult<()> {
        self.delay(self.latency.progress).await;
        let mut state = self.state.write().await;
        if !state.contains(id) {
            return Err(DataProviderError::word_not_found(id));
        }
        state.completed.insert(id.to_string());
        Ok(())
    }

    async fn mark_word_incomplete(&self, id: &str) -> ProviderResult<()> {
        self.delay(self.latency.progress).await;
        self.state.write().await.completed.remove(id);
        Ok(())
    }

    async fn is_word_completed(&self, id: &str) -> ProviderResult<bool> {
        self.delay(self.latency.progress).await;
        Ok(self.state.read().await.completed.contains(id))
    }

    async fn fetch_completed_word_ids(&self) -> ProviderResult<HashSet<String>> {
        self.delay(self.latency.progress).await;
        Ok(self.state.read().await.completed.clone())
    }

    async fn fetch_progress(
        &self,
        category: CategoryType,
        language: Language,
    ) -> ProviderResult<Progress> {
        self.delay(self.latency.progress).await;
        let state = self.state.read().await;
        let (completed, total) = state
            .category_words(category)
            .iter()
            .filter(|w| w.matches_language(language))
            .fold((0, 0), |(done, total), w| {
                (done + usize::from(state.completed.contains(&w.id)), total + 1)
            });
        Ok(Progress::new(completed, total))
    }

    async fn get_settings(&self) -> ProviderResult<AppSettings> {
        self.delay(self.latency.settings).await;
        Ok(self.state.read().await.settings.clone().unwrap_or_default())
    }

    async fn update_settings(&self, settings: AppSettings) -> ProviderResult<()> {
        self.delay(self.latency.settings).await;
        self.state.write().await.settings = Some(settings);
        Ok(())
    }

    async fn import_vocabulary(
        &self,
        words: Vec<VocabularyWord>,
        category: CategoryType,
        replace_existing: bool,
    ) -> ProviderResult<()> {
        self.delay(self.latency.import).await;
        let mut state = self.state.write().await;

        // 先校验再修改，失败时状态保持不变
        let skip = replace_existing.then_some(category);
        state.check_new_ids(&words, skip)?;

        if replace_existing {
            state.clear_category(category);
        }
        let count = words.len();
        state.words.entry(category).or_default().extend(words);
        debug!(category = %category, count, replace_existing, "导入单词");
        Ok(())
    }

    async fn export_vocabulary(&self) -> ProviderResult<VocabularyExport> {
        self.delay(self.latency.bulk_write).await;
        let state = self.state.read().await;
        Ok(CategoryType::ALL
            .into_iter()
            .map(|category| (category, state.category_words(category).to_vec()))
            .collect())
    }

    async fn reset_all_data(&self) -> ProviderResult<()> {
        self.delay(self.latency.single).await;
        *self.state.write().await = MemoryState::default();
        Ok(())
    }
}
