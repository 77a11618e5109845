//! 进程内假后端：实现远程数据提供者使用的 `/api/v1` 协议，并记录每个请求

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use danci_vocab::{AppSettings, CategoryType, Language, Progress, RemoteConfig, VocabularyWord};

pub const API_KEY: &str = "test-api-key";

#[derive(Debug, Default)]
pub struct ServerState {
    pub words: Vec<(CategoryType, VocabularyWord)>,
    pub completed: HashSet<String>,
    pub settings: Option<AppSettings>,
    /// "METHOD /path"，不含 `/api/v1` 前缀
    pub requests: Vec<String>,
    pub api_keys: Vec<String>,
    pub bearer_tokens: Vec<Option<String>>,
    /// 设置后，令牌不一致的请求返回 401
    pub required_token: Option<String>,
    /// 依次消耗的故障状态码，先于正常处理返回
    pub fail_with: VecDeque<u16>,
    /// `GET /words` 取得快照后延迟响应
    pub list_delay: Option<Duration>,
    /// `GET /words` 已取得的快照数
    pub list_snapshots: usize,
}

impl ServerState {
    pub fn seed(&mut self, category: CategoryType, words: &[VocabularyWord]) {
        self.words
            .extend(words.iter().cloned().map(|word| (category, word)));
    }

    pub fn count(&self, request: &str) -> usize {
        self.requests.iter().filter(|r| r.as_str() == request).count()
    }

    fn contains(&self, id: &str) -> bool {
        self.words.iter().any(|(_, w)| w.id == id)
    }

    fn remove(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.words.len();
        self.words.retain(|(_, w)| !ids.contains(&w.id));
        self.completed.retain(|id| !ids.contains(id));
        before - self.words.len()
    }

    fn category_ids(&self, category: CategoryType) -> HashSet<String> {
        self.words
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, w)| w.id.clone())
            .collect()
    }
}

#[derive(Clone)]
pub struct FakeServer {
    pub base_url: String,
    state: Arc<Mutex<ServerState>>,
}

impl FakeServer {
    pub fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().expect("假后端状态锁中毒")
    }

    /// 不重试、短超时的客户端配置
    pub fn config(&self) -> RemoteConfig {
        RemoteConfig::new(&self.base_url, API_KEY)
            .with_retries(0, Duration::from_millis(1))
            .with_timeout(Duration::from_secs(5))
    }
}

pub async fn spawn_fake_server() -> FakeServer {
    let state = Arc::new(Mutex::new(ServerState::default()));

    let api = Router::new()
        .route("/words", get(list_words).post(create_word).delete(delete_category))
        .route("/words/batch", post(create_batch).delete(delete_batch))
        .route("/words/:id", get(get_word).put(update_word).delete(delete_word))
        .route("/progress", get(completed_ids).post(mark_completed))
        .route("/progress/stats", get(progress_stats))
        .route("/progress/:id", get(completed_flag).delete(mark_incomplete))
        .route("/settings", get(get_settings).put(put_settings))
        .route("/import", post(import))
        .route("/export", get(export))
        .route("/reset", post(reset))
        .route("/sync", post(sync))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state.clone());

    let app = Router::new().nest("/api/v1", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("绑定端口失败");
    let addr = listener.local_addr().expect("读取监听地址失败");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("假后端退出");
    });

    FakeServer {
        base_url: format!("http://{}", addr),
        state,
    }
}

type Shared = Arc<Mutex<ServerState>>;

fn lock(state: &Shared) -> MutexGuard<'_, ServerState> {
    state.lock().expect("假后端状态锁中毒")
}

async fn record(State(state): State<Shared>, req: Request, next: Next) -> Response {
    {
        let mut s = lock(&state);
        let path = req.uri().path().trim_start_matches("/api/v1").to_string();
        s.requests.push(format!("{} {}", req.method(), path));

        let api_key = req
            .headers()
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        s.api_keys.push(api_key);

        let bearer = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        s.bearer_tokens.push(bearer.clone());

        if let Some(required) = s.required_token.as_deref() {
            if bearer.as_deref() != Some(required) {
                return StatusCode::UNAUTHORIZED.into_response();
            }
        }
        if let Some(code) = s.fail_with.pop_front() {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return status.into_response();
        }
    }
    next.run(req).await
}

// ============================================================
// 请求体
// ============================================================

#[derive(Deserialize)]
struct CategoryQuery {
    category: Option<CategoryType>,
    language: Option<Language>,
}

#[derive(Deserialize)]
struct WordBody {
    word: VocabularyWord,
    category: CategoryType,
}

#[derive(Deserialize)]
struct WordsBody {
    words: Vec<VocabularyWord>,
    category: CategoryType,
}

#[derive(Deserialize)]
struct IdsBody {
    ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionBody {
    word_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportBody {
    words: Vec<VocabularyWord>,
    category: CategoryType,
    replace_existing: bool,
}

// ============================================================
// 处理函数
// ============================================================

async fn list_words(State(state): State<Shared>, Query(q): Query<CategoryQuery>) -> Response {
    let (body, delay) = {
        let mut s = lock(&state);
        let words: Vec<VocabularyWord> = s
            .words
            .iter()
            .filter(|(c, _)| q.category.map_or(true, |category| *c == category))
            .map(|(_, w)| w.clone())
            .collect();
        s.list_snapshots += 1;
        (json!({ "words": words }), s.list_delay)
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    Json(body).into_response()
}

async fn get_word(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let s = lock(&state);
    match s.words.iter().find(|(_, w)| w.id == id) {
        Some((_, word)) => Json(word.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_word(State(state): State<Shared>, Json(body): Json<WordBody>) -> Response {
    let mut s = lock(&state);
    if s.contains(&body.word.id) {
        return StatusCode::CONFLICT.into_response();
    }
    s.words.push((body.category, body.word.clone()));
    Json(body.word).into_response()
}

async fn create_batch(State(state): State<Shared>, Json(body): Json<WordsBody>) -> Response {
    let mut s = lock(&state);
    if body.words.iter().any(|w| s.contains(&w.id)) {
        return StatusCode::CONFLICT.into_response();
    }
    s.seed(body.category, &body.words);
    Json(json!({ "words": body.words })).into_response()
}

async fn update_word(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<WordBody>,
) -> Response {
    let mut s = lock(&state);
    match s.words.iter_mut().find(|(_, w)| w.id == id) {
        Some(slot) => {
            *slot = (body.category, body.word.clone());
            Json(body.word).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_word(State(state): State<Shared>, Path(id): Path<String>) -> StatusCode {
    let mut s = lock(&state);
    if s.remove(&HashSet::from([id])) == 0 {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn delete_batch(State(state): State<Shared>, Json(body): Json<IdsBody>) -> StatusCode {
    lock(&state).remove(&body.ids.into_iter().collect());
    StatusCode::NO_CONTENT
}

async fn delete_category(State(state): State<Shared>, Query(q): Query<CategoryQuery>) -> StatusCode {
    let Some(category) = q.category else {
        return StatusCode::BAD_REQUEST;
    };
    let mut s = lock(&state);
    let ids = s.category_ids(category);
    s.remove(&ids);
    StatusCode::NO_CONTENT
}

async fn mark_completed(State(state): State<Shared>, Json(body): Json<CompletionBody>) -> Response {
    let mut s = lock(&state);
    if !s.contains(&body.word_id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    s.completed.insert(body.word_id);
    Json(json!({})).into_response()
}

async fn mark_incomplete(State(state): State<Shared>, Path(id): Path<String>) -> StatusCode {
    if lock(&state).completed.remove(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn completed_flag(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let completed = lock(&state).completed.contains(&id);
    Json(json!({ "completed": completed })).into_response()
}

async fn completed_ids(State(state): State<Shared>) -> Response {
    let s = lock(&state);
    let ids: Vec<&String> = s.completed.iter().collect();
    Json(json!({ "completedIds": ids })).into_response()
}

async fn progress_stats(State(state): State<Shared>, Query(q): Query<CategoryQuery>) -> Json<Progress> {
    let s = lock(&state);
    let language = q.language.unwrap_or_default();
    let words: Vec<&VocabularyWord> = s
        .words
        .iter()
        .filter(|(c, w)| {
            q.category.map_or(true, |category| *c == category) && w.matches_language(language)
        })
        .map(|(_, w)| w)
        .collect();
    let completed = words.iter().filter(|w| s.completed.contains(&w.id)).count();
    Json(Progress::new(completed, words.len()))
}

async fn get_settings(State(state): State<Shared>) -> Response {
    match lock(&state).settings.clone() {
        Some(settings) => Json(settings).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn put_settings(State(state): State<Shared>, Json(settings): Json<AppSettings>) -> Json<AppSettings> {
    lock(&state).settings = Some(settings.clone());
    Json(settings)
}

async fn import(State(state): State<Shared>, Json(body): Json<ImportBody>) -> StatusCode {
    let mut s = lock(&state);
    if body.replace_existing {
        let ids = s.category_ids(body.category);
        s.remove(&ids);
    }
    s.seed(body.category, &body.words);
    StatusCode::NO_CONTENT
}

async fn export(State(state): State<Shared>) -> Response {
    let s = lock(&state);
    let mut vocabulary: BTreeMap<&str, Vec<&VocabularyWord>> = BTreeMap::new();
    for (category, word) in &s.words {
        vocabulary.entry(category.as_str()).or_default().push(word);
    }
    Json(json!({ "vocabulary": vocabulary })).into_response()
}

async fn reset(State(state): State<Shared>) -> StatusCode {
    let mut s = lock(&state);
    s.words.clear();
    s.completed.clear();
    s.settings = None;
    StatusCode::NO_CONTENT
}

async fn sync() -> StatusCode {
    StatusCode::NO_CONTENT
}
