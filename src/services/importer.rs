//! 试卷导入流程
//! 原文分块 → 并发 AI 规范化 → 解析题块 → 组装试卷 → 入库

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::models::{ExamId, ExamImportRequest, ExamMeta, ImportedQuestion, ParsedQuestion};
use crate::services::chunker::chunk_text;
use crate::services::database::ExamRepository;
use crate::services::normalizer::Normalizer;
use crate::services::parser::{parse_exam_text_with_report, ParseReport, BLOCK_DELIMITER};
use futures::future::join_all;
use log::{debug, info, warn};

/// 给题目编号（从 1 开始）并附上试卷元数据
///
/// 题目列表为空时返回 `EmptyImport`，不会生成空试卷。
pub fn assemble_exam(
    meta: ExamMeta,
    questions: Vec<ParsedQuestion>,
) -> Result<ExamImportRequest, ImportError> {
    if questions.is_empty() {
        return Err(ImportError::EmptyImport);
    }

    let questions = questions
        .into_iter()
        .zip(1u32..)
        .map(|(question, id)| ImportedQuestion { id, question })
        .collect();

    Ok(ExamImportRequest {
        title: meta.title,
        subject_id: meta.subject_id,
        time_minutes: meta.time_minutes,
        questions,
    })
}

/// 解析规范文本并记录被丢弃的题块和警告
pub fn parse_with_diagnostics(canonical: &str) -> ParseReport {
    let report = parse_exam_text_with_report(canonical);

    for dropped in &report.dropped {
        debug!(
            "dropped block {} ({:?}): {}",
            dropped.block, dropped.reason, dropped.preview
        );
    }
    for warning in &report.warnings {
        warn!("block {}: {:?}", warning.block, warning.warning);
    }
    info!(
        "parsed {} questions from {} blocks ({} dropped)",
        report.questions.len(),
        report.blocks,
        report.dropped.len()
    );

    report
}

/// 导入流程，规范化服务和试卷仓库由调用方注入
pub struct ExamImporter<N, R> {
    normalizer: N,
    repository: R,
    config: ImportConfig,
}

impl<N, R> ExamImporter<N, R>
where
    N: Normalizer,
    R: ExamRepository,
{
    pub fn new(normalizer: N, repository: R, config: ImportConfig) -> Self {
        Self {
            normalizer,
            repository,
            config,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// 分块后并发规范化，按原始分块顺序用分隔行拼接结果
    ///
    /// 所有请求都会跑完；任何一个失败则整体失败，报告序号最小的失败分块。
    pub async fn normalize_document(&self, raw: &str) -> Result<String, ImportError> {
        let chunks = chunk_text(raw, self.config.chunker);
        info!(
            "normalizing {} chunks of kind '{}'",
            chunks.len(),
            self.config.kind
        );

        let kind = self.config.kind.as_str();
        let results = join_all(
            chunks
                .iter()
                .map(|chunk| self.normalizer.normalize(chunk, kind)),
        )
        .await;

        let mut normalized = Vec::with_capacity(results.len());
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(text) => normalized.push(text),
                Err(source) => {
                    warn!("chunk {} failed to normalize: {}", index, source);
                    return Err(ImportError::ChunkNormalization { index, source });
                }
            }
        }

        Ok(normalized.join(&format!("\n{}\n", BLOCK_DELIMITER)))
    }

    /// 从规范文本构建试卷请求，不写入存储
    pub fn prepare(&self, meta: ExamMeta, canonical: &str) -> Result<ExamImportRequest, ImportError> {
        let report = parse_with_diagnostics(canonical);
        assemble_exam(meta, report.questions)
    }

    /// 导入已经是规范格式的文本
    pub async fn import_canonical(&self, meta: ExamMeta, canonical: &str) -> Result<ExamId, ImportError> {
        let request = self.prepare(meta, canonical)?;
        let id = self.repository.create_exam(&request)?;
        Ok(id)
    }

    /// 完整流程：原文经 AI 规范化后解析入库
    pub async fn import_document(&self, meta: ExamMeta, raw: &str) -> Result<ExamId, ImportError> {
        let canonical = self.normalize_document(raw).await?;
        self.import_canonical(meta, &canonical).await
    }
}
