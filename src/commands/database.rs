// 试卷库命令模块
// 导入、列出、查看和删除已入库的试卷

use crate::models::{ExamId, ExamMeta, ExamSummary, StoredExam};
use crate::services::database::{ExamRepository, SqliteExamRepository};
use crate::services::importer::ExamImporter;
use crate::services::normalizer::Normalizer;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// 导入结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResultDto {
    pub exam_id: ExamId,
    pub title: String,
    pub normalized: bool,
}

/// 导入试卷
///
/// `normalize` 为真时先经 AI 规范化，否则直接按规范格式解析。
pub async fn import_exam<N, R>(
    importer: &ExamImporter<N, R>,
    meta: ExamMeta,
    content: &str,
    normalize: bool,
) -> Result<ImportResultDto>
where
    N: Normalizer,
    R: ExamRepository,
{
    let title = meta.title.clone();

    let exam_id = if normalize {
        importer.import_document(meta, content).await
    } else {
        importer.import_canonical(meta, content).await
    }
    .with_context(|| format!("导入试卷失败: {}", title))?;

    Ok(ImportResultDto {
        exam_id,
        title,
        normalized: normalize,
    })
}

/// 列出试卷
pub fn list_exams(repository: &SqliteExamRepository) -> Result<Vec<ExamSummary>> {
    repository.list_exams().context("读取试卷列表失败")
}

/// 查看试卷
pub fn show_exam(repository: &SqliteExamRepository, id: &str) -> Result<StoredExam> {
    repository
        .get_exam(&ExamId(id.to_string()))
        .context("读取试卷失败")?
        .ok_or_else(|| anyhow!("试卷不存在: {}", id))
}

/// 删除试卷
pub fn delete_exam(repository: &SqliteExamRepository, id: &str) -> Result<()> {
    let deleted = repository
        .delete_exam(&ExamId(id.to_string()))
        .context("删除试卷失败")?;

    if deleted {
        Ok(())
    } else {
        Err(anyhow!("试卷不存在: {}", id))
    }
}
