//! 默认词库
//!
//! 首次安装时写入的四个分类、每类五个英文单词。

use tracing::info;

use crate::error::ProviderResult;
use crate::models::{Category, CategoryType, Language, VocabularyWord};
use crate::provider::VocabularyDataProvider;

/// (单词, 释义, 例句, 音标)
type SeedEntry = (&'static str, &'static str, &'static str, &'static str);

const BUSINESS: [SeedEntry; 5] = [
    (
        "Negotiate",
        "To discuss something in order to reach an agreement",
        "We need to negotiate the terms of the contract.",
        "/nɪˈɡoʊʃieɪt/",
    ),
    (
        "Stakeholder",
        "A person or group with an interest in a business",
        "All stakeholders were invited to the meeting.",
        "/ˈsteɪkhoʊldər/",
    ),
    (
        "Revenue",
        "Income generated from business activities",
        "The company reported increased revenue this quarter.",
        "/ˈrevənuː/",
    ),
    (
        "Collaborate",
        "To work jointly with others",
        "Teams collaborate to achieve common goals.",
        "/kəˈlæbəreɪt/",
    ),
    (
        "Leverage",
        "To use something to maximum advantage",
        "We can leverage our expertise to win this contract.",
        "/ˈlevərɪdʒ/",
    ),
];

const TRAVEL: [SeedEntry; 5] = [
    (
        "Itinerary",
        "A planned route or journey schedule",
        "Please review your travel itinerary carefully.",
        "/aɪˈtɪnəreri/",
    ),
    (
        "Accommodation",
        "A place where someone can live or stay",
        "We booked accommodation near the beach.",
        "/əˌkɒməˈdeɪʃən/",
    ),
    (
        "Departure",
        "The action of leaving a place",
        "The departure time is 8:00 AM.",
        "/dɪˈpɑːrtʃər/",
    ),
    (
        "Excursion",
        "A short journey for pleasure",
        "We went on a day excursion to the mountains.",
        "/ɪkˈskɜːrʒən/",
    ),
    (
        "Customs",
        "Government agency controlling imports/exports",
        "You must go through customs at the airport.",
        "/ˈkʌstəmz/",
    ),
];

const DAILY: [SeedEntry; 5] = [
    (
        "Appreciate",
        "To recognize the value of something",
        "I really appreciate your help with this.",
        "/əˈpriːʃieɪt/",
    ),
    (
        "Convince",
        "To persuade someone to do or believe something",
        "She tried to convince me to join the club.",
        "/kənˈvɪns/",
    ),
    (
        "Exhausted",
        "Extremely tired",
        "I was exhausted after the long day.",
        "/ɪɡˈzɔːstɪd/",
    ),
    (
        "Recommend",
        "To suggest something as good or suitable",
        "Can you recommend a good restaurant?",
        "/ˌrekəˈmend/",
    ),
    (
        "Hesitate",
        "To pause before doing something",
        "Don't hesitate to call if you need anything.",
        "/ˈhezɪteɪt/",
    ),
];

const ACADEMIC: [SeedEntry; 5] = [
    (
        "Hypothesis",
        "A proposed explanation based on limited evidence",
        "The scientist tested her hypothesis through experiments.",
        "/haɪˈpɒθəsɪs/",
    ),
    (
        "Analyze",
        "To examine something in detail",
        "Students must analyze the text carefully.",
        "/ˈænəlaɪz/",
    ),
    (
        "Synthesize",
        "To combine different ideas into a coherent whole",
        "The essay should synthesize multiple perspectives.",
        "/ˈsɪnθəsaɪz/",
    ),
    (
        "Methodology",
        "A system of methods used in a study",
        "The research methodology was clearly explained.",
        "/ˌmeθəˈdɒlədʒi/",
    ),
    (
        "Abstract",
        "A summary of a research paper or article",
        "Read the abstract before the full paper.",
        "/ˈæbstrækt/",
    ),
];

fn entries(category: CategoryType) -> &'static [SeedEntry] {
    match category {
        CategoryType::Business => &BUSINESS,
        CategoryType::Travel => &TRAVEL,
        CategoryType::Daily => &DAILY,
        CategoryType::Academic => &ACADEMIC,
    }
}

/// 默认分类及单词，每次调用生成新的 ID
pub fn default_categories() -> Vec<Category> {
    CategoryType::ALL
        .into_iter()
        .map(|category| {
            let words = entries(category)
                .iter()
                .map(|(word, definition, example, pronunciation)| {
                    VocabularyWord::new(*word, *definition, *example)
                        .with_pronunciation(*pronunciation)
                        .with_language(Language::En)
                        .with_translation_language(Language::En)
                })
                .collect();
            Category::new(category, words)
        })
        .collect()
}

/// 所有分类都为空时写入默认词库
///
/// # Returns
/// * `ProviderResult<bool>` - 是否执行了写入
pub async fn initialize_default_data(provider: &dyn VocabularyDataProvider) -> ProviderResult<bool> {
    for category in CategoryType::ALL {
        if !provider.fetch_words(category).await?.is_empty() {
            return Ok(false);
        }
    }

    for category in default_categories() {
        let count = category.words.len();
        provider
            .create_words(category.words, category.category_type)
            .await?;
        info!(provider = provider.name(), category = %category.category_type, count, "写入默认词库");
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{InMemoryVocabularyProvider, Latency};
    use std::collections::HashSet;

    #[test]
    fn test_default_categories_shape() {
        let categories = default_categories();
        assert_eq!(categories.len(), CategoryType::ALL.len());

        let mut ids = HashSet::new();
        for category in &categories {
            assert_eq!(category.words.len(), 5);
            for word in &category.words {
                assert!(ids.insert(word.id.clone()), "ID 应全局唯一");
                assert_eq!(word.language, Some(Language::En));
                assert!(word.pronunciation.is_some());
            }
        }
        assert_eq!(categories[0].words[0].word, "Negotiate");
    }

    #[test]
    fn test_fresh_ids_per_call() {
        let first = default_categories();
        let second = default_categories();
        assert_ne!(first[0].words[0].id, second[0].words[0].id);
    }

    #[tokio::test]
    async fn test_initialize_only_when_empty() {
        let provider = InMemoryVocabularyProvider::empty().with_latency(Latency::none());

        assert!(initialize_default_data(&provider).await.unwrap());
        assert_eq!(provider.fetch_all_words().await.unwrap().len(), 20);

        // 第二次调用不重复写入
        assert!(!initialize_default_data(&provider).await.unwrap());
        assert_eq!(provider.fetch_all_words().await.unwrap().len(), 20);
    }
}
