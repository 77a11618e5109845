//! 远程 HTTP 数据提供者
//!
//! 每个操作映射为对 `<base>/api/v1` 的一次 JSON 请求，并维护一份本地只读缓存：
//! - 单词列表按分类缓存，读取时缓存未命中才请求服务器
//! - 完成 ID 集合与设置各自缓存
//! - 写操作成功后同步更新缓存，后续读取不再往返服务器
//!
//! 读取未命中时先记下缓存代数再发请求，响应只在代数未变时回填；写操作修改缓存时推进代数，
//! 因此写操作完成后，期间发出的旧读取不会覆盖缓存。
//!
//! 批量操作在协议层面不是原子的：服务器可能只处理了部分单词。客户端不做补偿回滚，
//! 失败时使对应分类的缓存失效，下一次读取以服务器为准。

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, RwLockWriteGuard};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::RemoteConfig;
use crate::error::{DataProviderError, ProviderResult};
use crate::models::{AppSettings, CategoryType, Language, Progress, VocabularyWord};
use crate::provider::{VocabularyDataProvider, VocabularyExport};

const API_PREFIX: &str = "api/v1";
const API_KEY_HEADER: &str = "X-API-Key";

// ============================================================
// 请求 / 响应体
// ============================================================

#[derive(Debug, Serialize)]
struct WordPayload<'a> {
    word: &'a VocabularyWord,
    category: CategoryType,
}

#[derive(Debug, Serialize)]
struct WordsPayload<'a> {
    words: &'a [VocabularyWord],
    category: CategoryType,
}

#[derive(Debug, Serialize)]
struct IdsPayload<'a> {
    ids: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionPayload<'a> {
    word_id: &'a str,
    completed_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportPayload<'a> {
    words: &'a [VocabularyWord],
    category: CategoryType,
    replace_existing: bool,
}

#[derive(Debug, Deserialize)]
struct WordsEnvelope {
    #[serde(default)]
    words: Vec<VocabularyWord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletedIdsEnvelope {
    #[serde(default)]
    completed_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CompletedFlag {
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct ExportEnvelope {
    #[serde(default)]
    vocabulary: HashMap<String, Vec<VocabularyWord>>,
}

// ============================================================
// RemoteCache - 本地镜像
// ============================================================

#[derive(Debug, Default)]
struct RemoteCache {
    words: HashMap<CategoryType, Vec<VocabularyWord>>,
    /// None 表示尚未加载
    completed: Option<HashSet<String>>,
    settings: Option<AppSettings>,
    /// 写操作代数，每次写操作修改缓存时递增
    generation: u64,
}

impl RemoteCache {
    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// 整体替换缓存内容，代数继续递增
    fn reset_to(&mut self, next: RemoteCache) {
        let generation = self.generation.wrapping_add(1);
        *self = RemoteCache { generation, ..next };
    }

    fn find(&self, id: &str) -> Option<&VocabularyWord> {
        self.words.values().flatten().find(|w| w.id == id)
    }

    fn category_of(&self, id: &str) -> Option<CategoryType> {
        self.words
            .iter()
            .find(|(_, list)| list.iter().any(|w| w.id == id))
            .map(|(category, _)| *category)
    }

    /// 追加到已缓存的分类；未缓存的分类保持未加载状态
    fn append(&mut self, category: CategoryType, words: &[VocabularyWord]) {
        if let Some(list) = self.words.get_mut(&category) {
            list.extend(words.iter().cloned());
        }
    }

    fn replace_word(&mut self, word: &VocabularyWord, category: CategoryType) {
        match self.category_of(&word.id) {
            Some(current) if current == category => {
                if let Some(slot) = self
                    .words
                    .get_mut(&category)
                    .and_then(|list| list.iter_mut().find(|w| w.id == word.id))
                {
                    *slot = word.clone();
                }
            }
            Some(current) => {
                if let Some(list) = self.words.get_mut(&current) {
                    list.retain(|w| w.id != word.id);
                }
                self.append(category, std::slice::from_ref(word));
            }
            None => self.append(category, std::slice::from_ref(word)),
        }
    }

    fn remove_ids(&mut self, ids: &HashSet<&str>) {
        for list in self.words.values_mut() {
            list.retain(|w| !ids.contains(w.id.as_str()));
        }
        if let Some(completed) = self.completed.as_mut() {
            completed.retain(|id| !ids.contains(id.as_str()));
        }
    }

    /// 清空分类后的级联：分类未缓存时无法枚举受影响的 ID，只能让完成集合失效
    fn clear_category(&mut self, category: CategoryType) {
        match self.words.insert(category, Vec::new()) {
            Some(previous) => {
                if let Some(completed) = self.completed.as_mut() {
                    for word in previous {
                        completed.remove(&word.id);
                    }
                }
            }
            None => self.completed = None,
        }
    }

    fn invalidate_category(&mut self, category: CategoryType) {
        self.words.remove(&category);
    }
}

// ============================================================
// RemoteVocabularyProvider
// ============================================================

pub struct RemoteVocabularyProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    auth_token: RwLock<Option<String>>,
    max_retries: usize,
    retry_delay: Duration,
    cache: RwLock<RemoteCache>,
}

impl RemoteVocabularyProvider {
    pub fn new(config: RemoteConfig) -> ProviderResult<Self> {
        let base = format!("{}/{}/", config.base_url.trim_end_matches('/'), API_PREFIX);
        let base_url = Url::parse(&base)
            .map_err(|e| DataProviderError::InvalidData(format!("无效的服务地址 {}: {}", base, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DataProviderError::InvalidData(format!("无效的服务地址 {}", base)));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DataProviderError::NetworkError(e.to_string()))?;

        info!(base_url = %base_url, "远程数据提供者已创建");

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            auth_token: RwLock::new(config.auth_token),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            cache: RwLock::new(RemoteCache::default()),
        })
    }

    /// 替换会话令牌（登录 / 登出）
    pub async fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write().await = token;
    }

    /// 写操作路径使用的缓存写锁，获取时推进代数
    async fn cache_mut(&self) -> RwLockWriteGuard<'_, RemoteCache> {
        let mut cache = self.cache.write().await;
        cache.touch();
        cache
    }

    /// 读取回填：请求期间没有写操作修改缓存时才写入
    async fn fill_cache<F>(&self, generation: u64, fill: F)
    where
        F: FnOnce(&mut RemoteCache),
    {
        let mut cache = self.cache.write().await;
        if cache.generation == generation {
            fill(&mut *cache);
        } else {
            debug!(generation, current = cache.generation, "读取期间缓存已被写操作更新，跳过回填");
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // ============================================================
    // HTTP 请求与重试
    // ============================================================

    /// 发送请求并返回响应体文本
    ///
    /// 传输错误和 408 / 429 / 5xx 按指数退避重试，重试耗尽后返回最后一次的错误。
    async fn request<B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> ProviderResult<String>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.endpoint(segments);

        for retry in 0..=self.max_retries {
            let mut builder = self
                .client
                .request(method.clone(), url.clone())
                .header(CONTENT_TYPE, "application/json")
                .header(API_KEY_HEADER, &self.api_key);
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if let Some(token) = self.auth_token.read().await.as_deref() {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let backoff = self.backoff(retry);
            match builder.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .text()
                            .await
                            .map_err(|e| DataProviderError::NetworkError(e.to_string()));
                    }
                    if retry < self.max_retries && is_retryable(status) {
                        warn!(retry, ?status, %method, path = url.path(), "远程请求失败，准备重试");
                        sleep(backoff).await;
                        continue;
                    }
                    return Err(status_error(status, url.path()));
                }
                Err(e) => {
                    if retry < self.max_retries {
                        warn!(retry, error = %e, %method, path = url.path(), "远程请求异常，准备重试");
                        sleep(backoff).await;
                        continue;
                    }
                    return Err(DataProviderError::NetworkError(e.to_string()));
                }
            }
        }

        Err(DataProviderError::NetworkError("重试次数耗尽".to_string()))
    }

    fn backoff(&self, retry: usize) -> Duration {
        let factor = 1u32 << retry.min(16) as u32;
        self.retry_delay.saturating_mul(factor)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> ProviderResult<T> {
        let body = self.request::<()>(Method::GET, segments, query, None).await?;
        decode(&body)
    }

    /// 不关心响应内容的请求，空响应或 `{}` 都视为成功
    async fn execute<B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> ProviderResult<()>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.request(method, segments, query, body).await.map(|_| ())
    }

    async fn fetch_remote_words(&self, category: CategoryType) -> ProviderResult<Vec<VocabularyWord>> {
        let envelope: WordsEnvelope = self
            .get_json(&["words"], &[("category", category.as_str())])
            .await?;
        Ok(envelope.words)
    }

    async fn fetch_remote_completed(&self) -> ProviderResult<HashSet<String>> {
        let envelope: CompletedIdsEnvelope = self.get_json(&["progress"], &[]).await?;
        Ok(envelope.completed_ids.into_iter().collect())
    }

    /// 服务器没有设置记录（404）时使用默认值
    async fn fetch_remote_settings(&self) -> ProviderResult<AppSettings> {
        match self.get_json::<AppSettings>(&["settings"], &[]).await {
            Err(DataProviderError::NotFound(_)) => Ok(AppSettings::default()),
            other => other,
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> ProviderResult<T> {
    serde_json::from_str(body).map_err(|e| DataProviderError::InvalidData(e.to_string()))
}

/// 解析响应体；没有内容时使用请求中发送的值
fn decode_or<T: DeserializeOwned>(body: &str, fallback: T) -> ProviderResult<T> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "{}" {
        return Ok(fallback);
    }
    decode(trimmed)
}

fn status_error(status: StatusCode, path: &str) -> DataProviderError {
    match status {
        StatusCode::UNAUTHORIZED => DataProviderError::Unauthorized,
        StatusCode::NOT_FOUND => DataProviderError::NotFound(path.to_string()),
        other => DataProviderError::Unknown(format!("HTTP {}", other.as_u16())),
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[async_trait]
impl VocabularyDataProvider for RemoteVocabularyProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    // ============================================================
    // 单词查询（读穿缓存）
    // ============================================================

    async fn fetch_words(&self, category: CategoryType) -> ProviderResult<Vec<VocabularyWord>> {
        let generation = {
            let cache = self.cache.read().await;
            if let Some(words) = cache.words.get(&category) {
                return Ok(words.clone());
            }
            cache.generation
        };

        let words = self.fetch_remote_words(category).await?;
        self.fill_cache(generation, |cache| {
            cache.words.insert(category, words.clone());
            debug!(category = %category, count = words.len(), "分类单词已缓存");
        })
        .await;
        Ok(words)
    }

    async fn fetch_all_words(&self) -> ProviderResult<Vec<VocabularyWord>> {
        let mut all = Vec::new();
        for category in CategoryType::ALL {
            all.extend(self.fetch_words(category).await?);
        }
        Ok(all)
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
        if let Some(word) = self.cache.read().await.find(id) {
            return Ok(word.clone());
        }

        self.get_json(&["words", id], &[])
            .await
            .map_err(|err| match err {
                DataProviderError::NotFound(_) => DataProviderError::word_not_found(id),
                other => other,
            })
    }

    // ============================================================
    // 单词写入
    // ============================================================

    async fn create_word(
        &self,
        word: VocabularyWord,
        category: CategoryType,
    ) -> ProviderResult<VocabularyWord> {
        let payload = WordPayload {
            word: &word,
            category,
        };
        let body = self
            .request(Method::POST, &["words"], &[], Some(&payload))
            .await?;
        let created = decode_or(&body, word.clone())?;

        self.cache_mut()
            .await
            .append(category, std::slice::from_ref(&created));
        Ok(created)
    }

    async fn create_words(
        &self,
        words: Vec<VocabularyWord>,
        category: CategoryType,
    ) -> ProviderResult<Vec<VocabularyWord>> {
        let payload = WordsPayload {
            words: &words,
            category,
        };
        let body = match self
            .request(Method::POST, &["words", "batch"], &[], Some(&payload))
            .await
        {
            Ok(body) => body,
            Err(err) => {
                // 服务器可能已部分写入，缓存以服务器为准
                warn!(category = %category, error = %err, "批量创建失败，分类缓存失效");
                self.cache_mut().await.invalidate_category(category);
                return Err(err);
            }
        };

        let created = match decode_or(&body, WordsEnvelope { words: Vec::new() })? {
            envelope if envelope.words.is_empty() => words,
            envelope => envelope.words,
        };
        self.cache_mut().await.append(category, &created);
        Ok(created)
    }

    async fn update_word(
        &self,
        word: VocabularyWord,
        category: CategoryType,
    ) -> ProviderResult<VocabularyWord> {
        let payload = WordPayload {
            word: &word,
            category,
        };
        let body = self
            .request(Method::PUT, &["words", word.id.as_str()], &[], Some(&payload))
            .await
            .map_err(|err| match err {
                DataProviderError::NotFound(_) => DataProviderError::word_not_found(&word.id),
                other => other,
            })?;
        let updated = decode_or(&body, word.clone())?;

        self.cache_mut().await.replace_word(&updated, category);
        Ok(updated)
    }

    async fn delete_word(&self, id: &str) -> ProviderResult<()> {
        match self
            .execute::<()>(Method::DELETE, &["words", id], &[], None)
            .await
        {
            // 已经不存在的单词视为删除成功
            Ok(()) | Err(DataProviderError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }

        self.cache_mut().await.remove_ids(&HashSet::from([id]));
        Ok(())
    }

    async fn delete_words(&self, ids: &[String]) -> ProviderResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let payload = IdsPayload { ids };
        let result = self
            .execute(Method::DELETE, &["words", "batch"], &[], Some(&payload))
            .await;

        let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut cache = self.cache_mut().await;
        match result {
            Ok(()) => {
                cache.remove_ids(&id_set);
                debug!(count = ids.len(), "批量删除单词");
                Ok(())
            }
            Err(err) => {
                warn!(count = ids.len(), error = %err, "批量删除失败，相关缓存失效");
                let affected: Vec<CategoryType> = ids
                    .iter()
                    .filter_map(|id| cache.category_of(id))
                    .collect();
                for category in affected {
                    cache.invalidate_category(category);
                }
                cache.completed = None;
                Err(err)
            }
        }
    }

    async fn delete_all_words(&self, category: CategoryType) -> ProviderResult<()> {
        self.execute::<()>(
            Method::DELETE,
            &["words"],
            &[("category", category.as_str())],
            None,
        )
        .await?;

        self.cache_mut().await.clear_category(category);
        info!(category = %category, "清空分类单词");
        Ok(())
    }

    // ============================================================
    // 学习进度
    // ============================================================

    async fn mark_word_completed(&self, id: &str) -> ProviderResult<()> {
        let payload = CompletionPayload {
            word_id: id,
            completed_date: Utc::now(),
        };
        self.execute(Method::POST, &["progress"], &[], Some(&payload))
            .await
            .map_err(|err| match err {
                DataProviderError::NotFound(_) => DataProviderError::word_not_found(id),
                other => other,
            })?;

        if let Some(completed) = self.cache_mut().await.completed.as_mut() {
            completed.insert(id.to_string());
        }
        Ok(())
    }

    async fn mark_word_incomplete(&self, id: &str) -> ProviderResult<()> {
        match self
            .execute::<()>(Method::DELETE, &["progress", id], &[], None)
            .await
        {
            Ok(()) | Err(DataProviderError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }

        if let Some(completed) = self.cache_mut().await.completed.as_mut() {
            completed.remove(id);
        }
        Ok(())
    }

    async fn is_word_completed(&self, id: &str) -> ProviderResult<bool> {
        if let Some(completed) = self.cache.read().await.completed.as_ref() {
            return Ok(completed.contains(id));
        }

        match self.get_json::<CompletedFlag>(&["progress", id], &[]).await {
            Ok(flag) => Ok(flag.completed),
            Err(DataProviderError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn fetch_completed_word_ids(&self) -> ProviderResult<HashSet<String>> {
        let generation = {
            let cache = self.cache.read().await;
            if let Some(completed) = cache.completed.as_ref() {
                return Ok(completed.clone());
            }
            cache.generation
        };

        let completed = self.fetch_remote_completed().await?;
        self.fill_cache(generation, |cache| cache.completed = Some(completed.clone()))
            .await;
        Ok(completed)
    }

    async fn fetch_progress(
        &self,
        category: CategoryType,
        language: Language,
    ) -> ProviderResult<Progress> {
        self.get_json(
            &["progress", "stats"],
            &[("category", category.as_str()), ("language", language.code())],
        )
        .await
    }

    async fn fetch_overall_progress(&self, language: Language) -> ProviderResult<Progress> {
        self.get_json(&["progress", "stats"], &[("language", language.code())])
            .await
    }

    // ============================================================
    // 设置
    // ============================================================

    async fn get_settings(&self) -> ProviderResult<AppSettings> {
        let generation = {
            let cache = self.cache.read().await;
            if let Some(settings) = cache.settings.as_ref() {
                return Ok(settings.clone());
            }
            cache.generation
        };

        let settings = self.fetch_remote_settings().await?;
        self.fill_cache(generation, |cache| cache.settings = Some(settings.clone()))
            .await;
        Ok(settings)
    }

    async fn update_settings(&self, settings: AppSettings) -> ProviderResult<()> {
        let body = self
            .request(Method::PUT, &["settings"], &[], Some(&settings))
            .await?;
        let stored = decode_or(&body, settings)?;

        self.cache_mut().await.settings = Some(stored);
        Ok(())
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
        let payload = ImportPayload {
            words: &words,
            category,
            replace_existing,
        };
        let result = self
            .execute(Method::POST, &["import"], &[], Some(&payload))
            .await;

        let mut cache = self.cache_mut().await;
        if let Err(err) = result {
            warn!(category = %category, error = %err, "导入失败，分类缓存失效");
            cache.invalidate_category(category);
            if replace_existing {
                cache.completed = None;
            }
            return Err(err);
        }

        if replace_existing {
            cache.clear_category(category);
            cache.words.insert(category, words);
        } else {
            cache.append(category, &words);
        }
        info!(category = %category, replace_existing, "导入单词");
        Ok(())
    }

    async fn export_vocabulary(&self) -> ProviderResult<VocabularyExport> {
        let envelope: ExportEnvelope = self.get_json(&["export"], &[]).await?;

        let mut export = VocabularyExport::new();
        for (key, words) in envelope.vocabulary {
            match key.parse::<CategoryType>() {
                Ok(category) => {
                    export.insert(category, words);
                }
                Err(err) => warn!(key = %key, error = %err, "跳过未知分类"),
            }
        }
        Ok(export)
    }

    async fn reset_all_data(&self) -> ProviderResult<()> {
        self.execute::<()>(Method::POST, &["reset"], &[], None)
            .await?;

        self.cache.write().await.reset_to(RemoteCache {
            words: CategoryType::ALL
                .into_iter()
                .map(|category| (category, Vec::new()))
                .collect(),
            completed: Some(HashSet::new()),
            ..RemoteCache::default()
        });
        info!("远程数据已重置");
        Ok(())
    }

    // ============================================================
    // 同步：以服务器为准整体刷新
    // ============================================================

    async fn sync_data(&self) -> ProviderResult<()> {
        self.execute::<()>(Method::POST, &["sync"], &[], None)
            .await?;

        let generation = {
            let mut cache = self.cache.write().await;
            cache.reset_to(RemoteCache::default());
            cache.generation
        };

        let mut fresh = RemoteCache::default();
        for category in CategoryType::ALL {
            let words = self.fetch_remote_words(category).await?;
            fresh.words.insert(category, words);
        }
        fresh.completed = Some(self.fetch_remote_completed().await?);

        let mut settings = self.fetch_remote_settings().await?;
        settings.last_sync_date = Some(Utc::now());
        fresh.settings = Some(settings);

        let total: usize = fresh.words.values().map(Vec::len).sum();
        // 同步期间有写操作时保持清空状态，之后的读取直接请求服务器
        self.fill_cache(generation, |cache| cache.reset_to(fresh)).await;
        info!(count = total, "同步完成");
        Ok(())
    }

    fn supports_syncing(&self) -> bool {
        true
    }
}
