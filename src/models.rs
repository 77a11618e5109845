//! 数据模型定义
//!
//! 所有数据提供者共享的实体：语言、分类、单词、应用设置与进度统计。

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Add;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================
// Language - 学习语言
// ============================================================

/// 学习 / 显示语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Fr,
    De,
    Ja,
    Zh,
    Ko,
    Ar,
    Ru,
    Pt,
}

impl Language {
    /// 全部可选语言
    pub const ALL: [Language; 10] = [
        Language::En,
        Language::Es,
        Language::Fr,
        Language::De,
        Language::Ja,
        Language::Zh,
        Language::Ko,
        Language::Ar,
        Language::Ru,
        Language::Pt,
    ];

    /// 两位语言代码，同时也是存储与传输格式
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::Ja => "ja",
            Language::Zh => "zh",
            Language::Ko => "ko",
            Language::Ar => "ar",
            Language::Ru => "ru",
            Language::Pt => "pt",
        }
    }

    /// 英文名称
    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::De => "German",
            Language::Ja => "Japanese",
            Language::Zh => "Chinese",
            Language::Ko => "Korean",
            Language::Ar => "Arabic",
            Language::Ru => "Russian",
            Language::Pt => "Portuguese",
        }
    }

    /// 本地语言名称
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Español",
            Language::Fr => "Français",
            Language::De => "Deutsch",
            Language::Ja => "日本語",
            Language::Zh => "中文",
            Language::Ko => "한국어",
            Language::Ar => "العربية",
            Language::Ru => "Русский",
            Language::Pt => "Português",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::En
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == normalized)
            .ok_or_else(|| format!("未知的语言代码: {}", s))
    }
}

// ============================================================
// CategoryType - 固定的主题分类
// ============================================================

/// 单词主题分类（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Business,
    Travel,
    Daily,
    Academic,
}

impl CategoryType {
    /// 全部分类，顺序即展示与汇总顺序
    pub const ALL: [CategoryType; 4] = [
        CategoryType::Business,
        CategoryType::Travel,
        CategoryType::Daily,
        CategoryType::Academic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Business => "business",
            CategoryType::Travel => "travel",
            CategoryType::Daily => "daily",
            CategoryType::Academic => "academic",
        }
    }

    /// 展示名称
    pub fn name(&self) -> &'static str {
        match self {
            CategoryType::Business => "Business English",
            CategoryType::Travel => "Travel & Tourism",
            CategoryType::Daily => "Daily Conversation",
            CategoryType::Academic => "Academic Terms",
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        CategoryType::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| format!("未知的分类: {}", s))
    }
}

// ============================================================
// VocabularyWord - 单词
// ============================================================

/// 单词
///
/// 相等性与哈希只看 `id`，内容不同但 ID 相同的两个单词视为同一个单词。
/// 未设置 `language` 的单词与任意语言筛选条件匹配。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyWord {
    /// 单词唯一标识，创建后不可变
    pub id: String,
    /// 单词拼写
    pub word: String,
    /// 释义
    pub definition: String,
    /// 例句
    #[serde(default)]
    pub example: String,
    /// 音标
    #[serde(default)]
    pub pronunciation: Option<String>,
    /// 来源语言
    #[serde(default)]
    pub language: Option<Language>,
    /// 目标 / 翻译语言
    #[serde(default)]
    pub translation_language: Option<Language>,
}

impl VocabularyWord {
    /// 创建新单词，自动分配 UUID
    pub fn new(
        word: impl Into<String>,
        definition: impl Into<String>,
        example: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            word: word.into(),
            definition: definition.into(),
            example: example.into(),
            pronunciation: None,
            language: None,
            translation_language: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_pronunciation(mut self, pronunciation: impl Into<String>) -> Self {
        self.pronunciation = Some(pronunciation.into());
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_translation_language(mut self, language: Language) -> Self {
        self.translation_language = Some(language);
        self
    }

    /// 语言筛选：未设置语言或语言一致
    pub fn matches_language(&self, language: Language) -> bool {
        self.language.map_or(true, |lang| lang == language)
    }

    /// 字段级比较（包括 ID），用于导入导出一致性校验
    pub fn same_content(&self, other: &VocabularyWord) -> bool {
        self.id == other.id
            && self.word == other.word
            && self.definition == other.definition
            && self.example == other.example
            && self.pronunciation == other.pronunciation
            && self.language == other.language
            && self.translation_language == other.translation_language
    }
}

impl PartialEq for VocabularyWord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VocabularyWord {}

impl Hash for VocabularyWord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// 按语言筛选单词列表
pub fn filter_by_language(words: Vec<VocabularyWord>, language: Language) -> Vec<VocabularyWord> {
    words
        .into_iter()
        .filter(|word| word.matches_language(language))
        .collect()
}

// ============================================================
// Category - 分类及其单词
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub category_type: CategoryType,
    pub words: Vec<VocabularyWord>,
}

impl Category {
    pub fn new(category_type: CategoryType, words: Vec<VocabularyWord>) -> Self {
        Self {
            id: category_type.as_str().to_string(),
            category_type,
            words,
        }
    }

    pub fn name(&self) -> &'static str {
        self.category_type.name()
    }
}

// ============================================================
// AppSettings - 全局设置
// ============================================================

/// 应用设置（每个安装只有一份，缺失时使用默认值）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// 当前学习语言
    pub current_language: Language,
    /// 上次同步时间
    #[serde(default)]
    pub last_sync_date: Option<DateTime<Utc>>,
    /// 用户 / 账号标识
    #[serde(default)]
    pub user_id: Option<String>,
}

impl AppSettings {
    pub fn with_language(current_language: Language) -> Self {
        Self {
            current_language,
            ..Default::default()
        }
    }
}

// ============================================================
// Progress - 完成进度
// ============================================================

/// 完成进度（已完成数 / 总数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// 完成比例，总数为 0 时返回 0
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

impl Add for Progress {
    type Output = Progress;

    fn add(self, rhs: Progress) -> Progress {
        Progress {
            completed: self.completed + rhs.completed,
            total: self.total + rhs.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_equality_is_identity_based() {
        let a = VocabularyWord::new("Negotiate", "to discuss", "example").with_id("w-1");
        let mut b = a.clone();
        b.definition = "something else".to_string();

        assert_eq!(a, b);
        assert!(!a.same_content(&b));

        let c = VocabularyWord::new("Negotiate", "to discuss", "example");
        assert_ne!(a, c);
    }

    #[test]
    fn test_language_filter() {
        let untagged = VocabularyWord::new("hola", "hello", "");
        let french = VocabularyWord::new("bonjour", "hello", "").with_language(Language::Fr);

        for lang in Language::ALL {
            assert!(untagged.matches_language(lang));
        }
        assert!(french.matches_language(Language::Fr));
        assert!(!french.matches_language(Language::En));
    }

    #[test]
    fn test_word_json_uses_camel_case() {
        let word = VocabularyWord::new("Itinerary", "route", "review it")
            .with_id("w-2")
            .with_language(Language::En)
            .with_translation_language(Language::Zh);

        let json = serde_json::to_value(&word).unwrap();
        assert_eq!(json["translationLanguage"], "zh");
        assert_eq!(json["language"], "en");

        // 缺失的可选字段可以正常解析
        let parsed: VocabularyWord =
            serde_json::from_str(r#"{"id":"x","word":"w","definition":"d"}"#).unwrap();
        assert_eq!(parsed.example, "");
        assert!(parsed.language.is_none());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("FR".parse::<Language>().unwrap(), Language::Fr);
        assert!("xx".parse::<Language>().is_err());
        assert_eq!(" travel ".parse::<CategoryType>().unwrap(), CategoryType::Travel);
        assert!("sports".parse::<CategoryType>().is_err());
    }

    #[test]
    fn test_progress_sum_and_ratio() {
        let total = Progress::new(1, 4) + Progress::new(2, 4);
        assert_eq!(total, Progress::new(3, 8));
        assert!((total.ratio() - 0.375).abs() < f64::EPSILON);
        assert_eq!(Progress::default().ratio(), 0.0);
    }

    #[test]
    fn test_settings_default() {
        let settings = AppSettings::default();
        assert_eq!(settings.current_language, Language::En);
        assert!(settings.last_sync_date.is_none());
        assert!(settings.user_id.is_none());
    }
}
