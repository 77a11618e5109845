//! 数据提供者选择
//!
//! 只负责从配置值映射到具体实现，不包含任何业务逻辑。

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::error::{DataProviderError, ProviderResult};
use crate::provider::{
    InMemoryVocabularyProvider, LocalVocabularyProvider, RemoteVocabularyProvider,
    UnimplementedVocabularyProvider, VocabularyDataProvider,
};
use crate::storage::Storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    /// 本地 SQLite
    Local,
    /// 远程 HTTP 后端
    Remote,
    /// 占位实现，所有操作返回 NotImplemented
    Stub,
    /// 内存实现（带默认词库与人为延迟）
    InMemory,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Local => "local",
            ProviderType::Remote => "remote",
            ProviderType::Stub => "stub",
            ProviderType::InMemory => "memory",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "sqlite" => Ok(ProviderType::Local),
            "remote" | "aws" => Ok(ProviderType::Remote),
            "stub" | "firebase" => Ok(ProviderType::Stub),
            "memory" | "mock" | "in-memory" => Ok(ProviderType::InMemory),
            other => Err(format!("未知的数据提供者类型: {}", other)),
        }
    }
}

/// 根据类型创建数据提供者
pub fn create_provider(
    provider_type: ProviderType,
    config: &AppConfig,
) -> ProviderResult<Arc<dyn VocabularyDataProvider>> {
    info!(provider = %provider_type, "创建数据提供者");

    let provider: Arc<dyn VocabularyDataProvider> = match provider_type {
        ProviderType::Local => {
            let storage = Storage::open(&config.db_path)
                .map_err(|e| DataProviderError::Unknown(format!("打开本地数据库失败: {}", e)))?;
            Arc::new(LocalVocabularyProvider::new(storage))
        }
        ProviderType::Remote => Arc::new(RemoteVocabularyProvider::new(config.remote.clone())?),
        ProviderType::Stub => Arc::new(UnimplementedVocabularyProvider::new()),
        ProviderType::InMemory => Arc::new(InMemoryVocabularyProvider::new()),
    };

    Ok(provider)
}

/// debug 构建中 `use_mock_in_debug` 会强制使用内存实现
pub fn effective_provider_type(config: &AppConfig) -> ProviderType {
    if cfg!(debug_assertions) && config.use_mock_in_debug {
        ProviderType::InMemory
    } else {
        config.provider_type
    }
}

/// 按配置创建数据提供者
pub fn create_configured_provider(
    config: &AppConfig,
) -> ProviderResult<Arc<dyn VocabularyDataProvider>> {
    create_provider(effective_provider_type(config), config)
}
