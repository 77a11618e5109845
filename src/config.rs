//! 运行配置
//!
//! 所有配置来自环境变量（二进制入口会先加载 `.env`），缺失或无法解析时使用默认值。

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::provider::ProviderType;

pub const DEFAULT_API_BASE_URL: &str = "https://api.vocabmaster.example.com";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 200;
const DEVELOPMENT_API_KEY: &str = "development-api-key";

/// 远程后端连接参数
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
    pub auth_token: Option<String>,
    pub timeout: Duration,
    pub max_retries: usize,
    pub retry_delay: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            auth_token: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_retries(mut self, max_retries: usize, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL, "")
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider_type: ProviderType,
    pub db_path: PathBuf,
    pub remote: RemoteConfig,
    /// 仅在 debug 构建中生效：强制使用内存数据提供者
    pub use_mock_in_debug: bool,
    pub auto_seed: bool,
    pub log_level: String,
    /// 是否额外写入滚动日志文件
    pub file_logs: bool,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::Local,
            db_path: default_db_path(),
            remote: RemoteConfig::default(),
            use_mock_in_debug: false,
            auto_seed: true,
            log_level: "info".to_string(),
            file_logs: false,
            log_dir: default_log_dir(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源构建配置
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_u64 = |key: &str| get(key).and_then(|v| v.trim().parse::<u64>().ok());
        let get_bool = |key: &str, default: bool| {
            get(key)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(default)
        };

        let provider_type = match get("VOCAB_PROVIDER") {
            Some(raw) => raw.parse::<ProviderType>().unwrap_or_else(|err| {
                warn!(value = %raw, error = %err, "无法识别的数据提供者类型，使用本地存储");
                ProviderType::Local
            }),
            None => ProviderType::Local,
        };

        let db_path = get("VOCAB_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let api_key = get("VOCAB_API_KEY").unwrap_or_else(|| {
            if cfg!(debug_assertions) {
                DEVELOPMENT_API_KEY.to_string()
            } else {
                String::new()
            }
        });

        let remote = RemoteConfig {
            base_url: get("VOCAB_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            api_key,
            auth_token: get("VOCAB_AUTH_TOKEN"),
            timeout: Duration::from_millis(
                get_u64("VOCAB_HTTP_TIMEOUT_MS").unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
            max_retries: get_u64("VOCAB_HTTP_MAX_RETRIES")
                .map(|v| v as usize)
                .unwrap_or(DEFAULT_MAX_RETRIES),
            retry_delay: Duration::from_millis(
                get_u64("VOCAB_HTTP_RETRY_DELAY_MS").unwrap_or(DEFAULT_RETRY_DELAY_MS),
            ),
        };

        Self {
            provider_type,
            db_path,
            remote,
            use_mock_in_debug: get_bool("VOCAB_USE_MOCK_IN_DEBUG", false),
            auto_seed: get_bool("VOCAB_AUTO_SEED", true),
            log_level: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            file_logs: get_bool("VOCAB_FILE_LOGS", false),
            log_dir: get("VOCAB_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_log_dir),
        }
    }
}

/// 默认数据库位置：系统数据目录下的 `danci-vocab/vocab.db`
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("danci-vocab").join("vocab.db"))
        .unwrap_or_else(|| PathBuf::from("vocab.db"))
}

/// 默认日志目录，与默认数据库同在 `danci-vocab` 数据目录下
pub fn default_log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("danci-vocab").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}
