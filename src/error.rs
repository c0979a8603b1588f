//! 错误类型定义

use thiserror::Error;

/// AI 规范化调用失败
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("request to AI service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI service rate limited the request")]
    RateLimited,

    #[error("all {attempts} API keys were rate limited")]
    KeysExhausted { attempts: usize },

    #[error("AI service returned an empty completion")]
    EmptyResponse,
}

/// 存储层错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode question options: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database connection lock poisoned")]
    Poisoned,

    #[error("stored exam {0} is corrupt: {1}")]
    Corrupt(String, String),
}

/// 导入流程错误
#[derive(Debug, Error)]
pub enum ImportError {
    /// 所有题块都被丢弃
    #[error("no questions could be extracted; check formatting")]
    EmptyImport,

    #[error("normalizing chunk {index} failed: {source}")]
    ChunkNormalization {
        index: usize,
        #[source]
        source: NormalizeError,
    },

    #[error("storing exam failed: {0}")]
    Storage(#[from] StorageError),
}
