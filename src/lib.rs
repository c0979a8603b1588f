//! 刷题神器题库导入
//!
//! 把 AI 生成或手工粘贴的试题文本解析为结构化题目，并作为一份试卷写入题库。

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{ChunkerConfig, ImportConfig, NormalizerConfig};
pub use error::{ImportError, NormalizeError, StorageError};
pub use models::{ExamId, ExamImportRequest, ExamMeta, ImportedQuestion, ParsedQuestion};
