//! Danci 词汇数据层
//!
//! 词汇应用的数据访问抽象：统一的 [`provider::VocabularyDataProvider`] trait，
//! 以及本地 SQLite、远程 HTTP（带读缓存与同步）、内存三种实现。

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod provider;
pub mod seed;
pub mod session;
pub mod storage;

pub use config::{AppConfig, RemoteConfig};
pub use error::{DataProviderError, ProviderResult};
pub use models::{AppSettings, Category, CategoryType, Language, Progress, VocabularyWord};
pub use provider::{
    create_configured_provider, create_provider, ProviderType, VocabularyDataProvider,
    VocabularyExport,
};
pub use session::VocabularySession;
