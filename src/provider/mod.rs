//! 词汇数据提供者
//!
//! 所有后端（本地 SQLite、远程 HTTP、内存）实现同一个 [`VocabularyDataProvider`] trait，
//! 启动时由 [`factory`] 选择具体实现，之后的读写全部经过该 trait。

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::models::{AppSettings, CategoryType, Language, Progress, VocabularyWord};

pub mod factory;
pub mod local;
pub mod memory;
pub mod remote;
pub mod unimplemented;

pub use factory::{create_configured_provider, create_provider, ProviderType};
pub use local::LocalVocabularyProvider;
pub use memory::{InMemoryVocabularyProvider, Latency};
pub use remote::RemoteVocabularyProvider;
pub use unimplemented::UnimplementedVocabularyProvider;

/// 导出快照：分类 → 单词列表
pub type VocabularyExport = BTreeMap<CategoryType, Vec<VocabularyWord>>;

/// 词汇数据提供者
///
/// 语义在所有后端间保持一致：
/// - 语言筛选：未设置语言的单词匹配任意语言
/// - 删除单词会级联删除其完成记录，删除不存在的 ID 不报错
/// - 标记完成是幂等的，标记不存在的单词返回 `NotFound`
/// - 创建已存在的 ID 返回 `SaveFailed`，批量创建在支持事务的后端上整体成功或整体失败
/// - 同一分类内保持插入顺序，`fetch_all_words` 按 `CategoryType::ALL` 顺序拼接
#[async_trait]
pub trait VocabularyDataProvider: Send + Sync {
    /// 后端名称，用于日志
    fn name(&self) -> &'static str;

    // ============================================================
    // 单词查询
    // ============================================================

    async fn fetch_words(&self, category: CategoryType) -> ProviderResult<Vec<VocabularyWord>>;

    async fn fetch_all_words(&self) -> ProviderResult<Vec<VocabularyWord>>;

    async fn fetch_words_for_language(
        &self,
        category: CategoryType,
        language: Language,
    ) -> ProviderResult<Vec<VocabularyWord>>;

    /// 获取单个单词，不存在时返回 `NotFound`
    async fn fetch_word(&self, id: &str) -> ProviderResult<VocabularyWord>;

    // ============================================================
    // 单词写入
    // ============================================================

    async fn create_word(
        &self,
        word: VocabularyWord,
        category: CategoryType,
    ) -> ProviderResult<VocabularyWord>;

    async fn create_words(
        &self,
        words: Vec<VocabularyWord>,
        category: CategoryType,
    ) -> ProviderResult<Vec<VocabularyWord>>;

    /// 更新单词内容，可同时变更分类；ID 不存在时返回 `NotFound`
    async fn update_word(
        &self,
        word: VocabularyWord,
        category: CategoryType,
    ) -> ProviderResult<VocabularyWord>;

    async fn delete_word(&self, id: &str) -> ProviderResult<()>;

    async fn delete_words(&self, ids: &[String]) -> ProviderResult<()>;

    async fn delete_all_words(&self, category: CategoryType) -> ProviderResult<()>;

    // ============================================================
    // 学习进度
    // ============================================================

    async fn mark_word_completed(&self, id: &str) -> ProviderResult<()>;

    async fn mark_word_incomplete(&self, id: &str) -> ProviderResult<()>;

    async fn is_word_completed(&self, id: &str) -> ProviderResult<bool>;

    async fn fetch_completed_word_ids(&self) -> ProviderResult<HashSet<String>>;

    /// 分类在指定语言下的完成进度
    async fn fetch_progress(
        &self,
        category: CategoryType,
        language: Language,
    ) -> ProviderResult<Progress>;

    /// 所有分类的进度之和
    async fn fetch_overall_progress(&self, language: Language) -> ProviderResult<Progress> {
        let mut overall = Progress::default();
        for category in CategoryType::ALL {
            overall = overall + self.fetch_progress(category, language).await?;
        }
        Ok(overall)
    }

    /// 清空全部完成记录
    async fn clear_all_progress(&self) -> ProviderResult<()> {
        for id in self.fetch_completed_word_ids().await? {
            self.mark_word_incomplete(&id).await?;
        }
        Ok(())
    }

    // ============================================================
    // 设置
    // ============================================================

    /// 读取设置，未初始化时返回默认值
    async fn get_settings(&self) -> ProviderResult<AppSettings>;

    async fn update_settings(&self, settings: AppSettings) -> ProviderResult<()>;

    async fn get_current_language(&self) -> ProviderResult<Language> {
        Ok(self.get_settings().await?.current_language)
    }

    async fn set_current_language(&self, language: Language) -> ProviderResult<()> {
        let mut settings = self.get_settings().await?;
        settings.current_language = language;
        self.update_settings(settings).await
    }

    // ============================================================
    // 导入导出与重置
    // ============================================================

    /// 导入单词；`replace_existing` 为真时先清空该分类（含完成记录）
    async fn import_vocabulary(
        &self,
        words: Vec<VocabularyWord>,
        category: CategoryType,
        replace_existing: bool,
    ) -> ProviderResult<()>;

    /// 全量导出（不包含完成记录）
    async fn export_vocabulary(&self) -> ProviderResult<VocabularyExport>;

    /// 清空单词、完成记录和设置
    async fn reset_all_data(&self) -> ProviderResult<()>;

    // ============================================================
    // 同步
    // ============================================================

    async fn sync_data(&self) -> ProviderResult<()> {
        Ok(())
    }

    fn supports_syncing(&self) -> bool {
        false
    }
}
