//! 会话状态
//!
//! 面向界面层的轻量状态持有者：缓存数据提供者的读取结果供展示使用，
//! 所有修改都委托给数据提供者后再刷新。错误只保留最近一个，展示后由调用方清除。

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;

use tracing::{info, warn};

use crate::models::{Category, CategoryType, Language, Progress, VocabularyWord};
use crate::provider::{VocabularyDataProvider, VocabularyExport};
use crate::seed;

pub struct VocabularySession {
    provider: Arc<dyn VocabularyDataProvider>,
    categories: Vec<Category>,
    completed: HashSet<String>,
    current_language: Language,
    is_loading: bool,
    is_syncing: bool,
    current_error: Option<String>,
    auto_seed: bool,
}

impl VocabularySession {
    pub fn new(provider: Arc<dyn VocabularyDataProvider>) -> Self {
        Self {
            provider,
            categories: Vec::new(),
            completed: HashSet::new(),
            current_language: Language::default(),
            is_loading: false,
            is_syncing: false,
            current_error: None,
            auto_seed: true,
        }
    }

    /// 数据为空时是否自动写入默认词库
    pub fn with_auto_seed(mut self, auto_seed: bool) -> Self {
        self.auto_seed = auto_seed;
        self
    }

    // ============================================================
    // 状态访问
    // ============================================================

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn completed_ids(&self) -> &HashSet<String> {
        &self.completed
    }

    pub fn current_language(&self) -> Language {
        self.current_language
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing
    }

    pub fn current_error(&self) -> Option<&str> {
        self.current_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.current_error = None;
    }

    pub fn supports_syncing(&self) -> bool {
        self.provider.supports_syncing()
    }

    fn set_error(&mut self, context: &str, err: impl Display) {
        warn!(error = %err, "{}", context);
        self.current_error = Some(format!("{}: {}", context, err));
    }

    // ============================================================
    // 加载
    // ============================================================

    /// 加载设置、单词与进度；全部为空且开启自动初始化时写入默认词库
    pub async fn load(&mut self) {
        self.is_loading = true;
        self.current_error = None;

        match self.provider.get_settings().await {
            Ok(settings) => {
                self.current_language = settings.current_language;
                self.reload_vocabulary().await;
                self.reload_progress().await;

                let empty = self.categories.iter().all(|c| c.words.is_empty());
                if empty && self.auto_seed {
                    match seed::initialize_default_data(self.provider.as_ref()).await {
                        Ok(true) => self.reload_vocabulary().await,
                        Ok(false) => {}
                        Err(err) => warn!(error = %err, "初始化默认词库失败"),
                    }
                }
            }
            Err(err) => self.set_error("加载数据失败", err),
        }

        self.is_loading = false;
    }

    /// 刷新单词列表，失败时保留原有数据
    pub async fn reload_vocabulary(&mut self) {
        let mut loaded = Vec::with_capacity(CategoryType::ALL.len());
        for category in CategoryType::ALL {
            match self.provider.fetch_words(category).await {
                Ok(words) => loaded.push(Category::new(category, words)),
                Err(err) => {
                    warn!(category = %category, error = %err, "刷新单词失败");
                    return;
                }
            }
        }
        self.categories = loaded;
    }

    /// 刷新完成记录，失败时保留原有数据
    pub async fn reload_progress(&mut self) {
        match self.provider.fetch_completed_word_ids().await {
            Ok(completed) => self.completed = completed,
            Err(err) => warn!(error = %err, "刷新学习进度失败"),
        }
    }

    // ============================================================
    // 读取辅助
    // ============================================================

    pub fn category(&self, category: CategoryType) -> Option<&Category> {
        self.categories.iter().find(|c| c.category_type == category)
    }

    pub fn category_words(&self, category: CategoryType, language: Language) -> Vec<VocabularyWord> {
        self.category(category)
            .map(|c| crate::models::filter_by_language(c.words.clone(), language))
            .unwrap_or_default()
    }

    /// 在指定语言下至少有一个单词的分类
    pub fn available_categories(&self, language: Language) -> Vec<CategoryType> {
        self.categories
            .iter()
            .filter(|c| c.words.iter().any(|w| w.matches_language(language)))
            .map(|c| c.category_type)
            .collect()
    }

    pub fn progress(&self, category: CategoryType) -> Progress {
        let words = self.category_words(category, self.current_language);
        let completed = words.iter().filter(|w| self.completed.contains(&w.id)).count();
        Progress::new(completed, words.len())
    }

    pub fn overall_progress(&self) -> Progress {
        CategoryType::ALL
            .into_iter()
            .map(|category| self.progress(category))
            .fold(Progress::default(), |acc, p| acc + p)
    }

    // ============================================================
    // 修改
    // ============================================================

    pub async fn add_word(&mut self, word: VocabularyWord, category: CategoryType) {
        match self.provider.create_word(word, category).await {
            Ok(_) => self.reload_vocabulary().await,
            Err(err) => self.set_error("添加单词失败", err),
        }
    }

    pub async fn add_words(&mut self, words: Vec<VocabularyWord>, category: CategoryType) {
        match self.provider.create_words(words, category).await {
            Ok(_) => self.reload_vocabulary().await,
            Err(err) => self.set_error("批量添加单词失败", err),
        }
    }

    pub async fn update_word(&mut self, word: VocabularyWord, category: CategoryType) {
        match self.provider.update_word(word, category).await {
            Ok(_) => self.reload_vocabulary().await,
            Err(err) => self.set_error("更新单词失败", err),
        }
    }

    pub async fn delete_words(&mut self, ids: &[String]) {
        match self.provider.delete_words(ids).await {
            Ok(()) => {
                self.reload_vocabulary().await;
                self.reload_progress().await;
            }
            Err(err) => self.set_error("删除单词失败", err),
        }
    }

    /// 切换单词完成状态
    pub async fn toggle_completion(&mut self, word_id: &str) {
        let result = if self.completed.contains(word_id) {
            self.provider.mark_word_incomplete(word_id).await
        } else {
            self.provider.mark_word_completed(word_id).await
        };

        match result {
            Ok(()) => {
                if !self.completed.remove(word_id) {
                    self.completed.insert(word_id.to_string());
                }
            }
            Err(err) => self.set_error("更新学习进度失败", err),
        }
    }

    pub async fn clear_progress(&mut self) {
        match self.provider.clear_all_progress().await {
            Ok(()) => self.completed.clear(),
            Err(err) => self.set_error("清除学习进度失败", err),
        }
    }

    pub async fn set_language(&mut self, language: Language) {
        match self.provider.set_current_language(language).await {
            Ok(()) => self.current_language = language,
            Err(err) => self.set_error("切换语言失败", err),
        }
    }

    pub async fn import(
        &mut self,
        words: Vec<VocabularyWord>,
        category: CategoryType,
        replace_existing: bool,
    ) {
        match self
            .provider
            .import_vocabulary(words, category, replace_existing)
            .await
        {
            Ok(()) => {
                self.reload_vocabulary().await;
                self.reload_progress().await;
            }
            Err(err) => self.set_error("导入单词失败", err),
        }
    }

    pub async fn export(&mut self) -> Option<VocabularyExport> {
        match self.provider.export_vocabulary().await {
            Ok(export) => Some(export),
            Err(err) => {
                self.set_error("导出单词失败", err);
                None
            }
        }
    }

    /// 同步并重新加载；数据提供者不支持同步时不做任何事
    pub async fn sync(&mut self) {
        if !self.provider.supports_syncing() {
            info!(provider = self.provider.name(), "数据提供者不支持同步");
            return;
        }

        self.is_syncing = true;
        match self.provider.sync_data().await {
            Ok(()) => self.load().await,
            Err(err) => self.set_error("同步失败", err),
        }
        self.is_syncing = false;
    }

    /// 清空全部数据，开启自动初始化时重新写入默认词库
    pub async fn reset(&mut self) {
        match self.provider.reset_all_data().await {
            Ok(()) => {
                self.categories.clear();
                self.completed.clear();
                self.current_language = Language::default();
                if self.auto_seed {
                    if let Err(err) = seed::initialize_default_data(self.provider.as_ref()).await {
                        warn!(error = %err, "初始化默认词库失败");
                    }
                }
                self.reload_vocabulary().await;
            }
            Err(err) => self.set_error("重置数据失败", err),
        }
    }
}
