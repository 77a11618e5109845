//! 数据提供者错误类型

use thiserror::Error;

use crate::storage::StorageError;

/// 数据提供者错误
///
/// 所有后端共用同一套错误分类，调用方据此决定如何提示用户。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataProviderError {
    #[error("数据未找到: {0}")]
    NotFound(String),

    #[error("数据格式无效: {0}")]
    InvalidData(String),

    #[error("保存失败: {0}")]
    SaveFailed(String),

    #[error("删除失败: {0}")]
    DeleteFailed(String),

    #[error("网络错误: {0}")]
    NetworkError(String),

    #[error("未授权访问")]
    Unauthorized,

    #[error("尚未实现: {0}")]
    NotImplemented(&'static str),

    #[error("未知错误: {0}")]
    Unknown(String),
}

pub type ProviderResult<T> = Result<T, DataProviderError>;

impl DataProviderError {
    pub fn word_not_found(id: &str) -> Self {
        Self::NotFound(format!("单词 {}", id))
    }

    /// 写路径的存储错误映射：保留 NotFound，其余视为保存失败
    pub fn from_save(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::NotFound(what),
            StorageError::Serialization(msg) => Self::InvalidData(msg),
            other => Self::SaveFailed(other.to_string()),
        }
    }

    /// 删除路径的存储错误映射
    pub fn from_delete(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::NotFound(what),
            other => Self::DeleteFailed(other.to_string()),
        }
    }
}

/// 读路径的默认映射
impl From<StorageError> for DataProviderError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::NotFound(what),
            StorageError::Serialization(msg) => Self::InvalidData(msg),
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DataProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}
