//! 解析相关命令
//! 分块预览、规范文本解析与格式校验

use crate::config::ChunkerConfig;
use crate::models::ParsedQuestion;
use crate::services::chunker::chunk_text;
use crate::services::parser::{
    extract_latex, has_chemistry, parse_exam_text, parse_exam_text_with_report, DropReason,
    ParseWarning,
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 读取源文件
pub fn read_source(file_path: &Path) -> Result<String> {
    if !file_path.exists() {
        bail!("文件不存在: {}", file_path.display());
    }

    std::fs::read_to_string(file_path)
        .with_context(|| format!("读取文件失败: {}", file_path.display()))
}

/// 分块预览
pub fn chunk_document(content: &str, config: ChunkerConfig) -> Vec<ChunkDto> {
    chunk_text(content, config)
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| ChunkDto {
            index,
            chars: chunk.chars().count(),
            preview: chunk.chars().take(40).collect::<String>().replace('\n', " "),
        })
        .collect()
}

/// 解析规范文本
pub fn parse_document(content: &str) -> Vec<ParsedQuestion> {
    parse_exam_text(content)
}

/// 校验规范文本格式
pub fn validate_document(content: &str) -> ValidationResult {
    let report = parse_exam_text_with_report(content);

    let mut issues = Vec::new();
    if report.blocks == 0 {
        issues.push("没有找到任何题块".to_string());
    } else if report.questions.is_empty() {
        issues.push("所有题块都无法解析，请检查 [Question] 标记和选项格式".to_string());
    }

    let dropped = report
        .dropped
        .iter()
        .map(|d| BlockIssueDto {
            block: d.block,
            kind: match d.reason {
                DropReason::MissingQuestion => "missing_question".to_string(),
                DropReason::NoOptions => "no_options".to_string(),
            },
            detail: d.preview.clone(),
        })
        .collect();

    let warnings = report
        .warnings
        .iter()
        .map(|w| {
            let (kind, detail) = match w.warning {
                ParseWarning::NoCorrectMarker => {
                    ("no_correct_marker", "未标记正确答案，默认选 A".to_string())
                }
                ParseWarning::MultipleCorrectMarkers { count } => (
                    "multiple_correct_markers",
                    format!("{} 个选项被标记为正确，取最后一个", count),
                ),
                ParseWarning::OptionsTruncated { found } => (
                    "options_truncated",
                    format!("共 {} 个选项，只保留前 4 个", found),
                ),
            };
            BlockIssueDto {
                block: w.block,
                kind: kind.to_string(),
                detail,
            }
        })
        .collect();

    ValidationResult {
        is_valid: !report.questions.is_empty(),
        block_count: report.blocks,
        question_count: report.questions.len(),
        dropped,
        warnings,
        has_latex: !extract_latex(content).is_empty(),
        has_chemistry: has_chemistry(content),
        issues,
    }
}

// ==================== DTO 类型定义 ====================

#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkDto {
    pub index: usize,
    pub chars: usize,
    pub preview: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlockIssueDto {
    pub block: usize,
    pub kind: String,
    pub detail: String,
}

/// 格式校验结果
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub block_count: usize,
    pub question_count: usize,
    pub dropped: Vec<BlockIssueDto>,
    pub warnings: Vec<BlockIssueDto>,
    pub has_latex: bool,
    pub has_chemistry: bool,
    pub issues: Vec<String>,
}
