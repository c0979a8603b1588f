//! 题库导入数据模型
//! 解析结果、试卷元数据以及入库后的试卷记录

use serde::{Deserialize, Serialize};
use std::fmt;

/// 单道题目的解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuestion {
    /// 题干（已去除图片 Markdown）
    pub text: String,
    /// 选项，最多 4 个，按出现顺序排列
    pub options: Vec<String>,
    /// 正确选项下标（从 0 开始）
    pub correct: usize,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// 试卷元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamMeta {
    pub title: String,
    pub subject_id: String,
    pub time_minutes: u32,
}

impl ExamMeta {
    pub fn new(title: impl Into<String>, subject_id: impl Into<String>, time_minutes: u32) -> Self {
        Self {
            title: title.into(),
            subject_id: subject_id.into(),
            time_minutes,
        }
    }
}

/// 带序号的题目，`id` 从 1 开始连续编号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedQuestion {
    pub id: u32,
    #[serde(flatten)]
    pub question: ParsedQuestion,
}

/// 交给存储层的完整试卷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamImportRequest {
    pub title: String,
    pub subject_id: String,
    pub time_minutes: u32,
    pub questions: Vec<ImportedQuestion>,
}

/// 存储层分配的试卷 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExamId(pub String);

impl ExamId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 已入库的试卷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredExam {
    pub id: ExamId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    pub exam: ExamImportRequest,
}

/// 试卷列表项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub id: ExamId,
    pub title: String,
    pub subject_id: String,
    pub time_minutes: u32,
    pub question_count: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
