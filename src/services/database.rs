// 数据库服务模块
// 提供 SQLite 试卷存储，导入的试卷与题目在同一事务中写入

use crate::error::StorageError;
use crate::models::{ExamId, ExamImportRequest, ExamSummary, ImportedQuestion, ParsedQuestion, StoredExam};
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// 试卷存储协作方
pub trait ExamRepository: Send + Sync {
    /// 原子地创建一份试卷，返回新试卷的 ID
    fn create_exam(&self, record: &ExamImportRequest) -> Result<ExamId, StorageError>;
}

/// SQLite 试卷仓库
#[derive(Clone)]
pub struct SqliteExamRepository {
    pool: Arc<Mutex<Connection>>,
}

impl SqliteExamRepository {
    /// 打开（必要时创建）数据库文件
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        // 确保数据目录存在
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        Self::from_connection(Connection::open(db_path)?)
    }

    /// 内存数据库，用于测试和一次性解析
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        let repository = Self {
            pool: Arc::new(Mutex::new(conn)),
        };
        repository.initialize()?;
        Ok(repository)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.pool.lock().map_err(|_| StorageError::Poisoned)
    }

    /// 初始化数据库表结构
    pub fn initialize(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS exams (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                subject_id TEXT NOT NULL,
                time_minutes INTEGER NOT NULL,
                question_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS exam_questions (
                exam_id TEXT NOT NULL,
                number INTEGER NOT NULL,
                text TEXT NOT NULL,
                options TEXT NOT NULL,
                correct INTEGER NOT NULL,
                explanation TEXT NOT NULL,
                image TEXT,
                PRIMARY KEY (exam_id, number),
                FOREIGN KEY (exam_id) REFERENCES exams(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_exams_subject_id ON exams(subject_id);
        ",
        )?;

        Ok(())
    }

    /// 获取单份试卷及其全部题目
    pub fn get_exam(&self, id: &ExamId) -> Result<Option<StoredExam>, StorageError> {
        let conn = self.conn()?;

        let header = conn
            .query_row(
                "SELECT id, title, subject_id, time_minutes, question_count, created_at
                 FROM exams WHERE id = ?",
                rusqlite::params![id.as_str()],
                Self::row_to_summary,
            )
            .optional()?;

        let Some(summary) = header else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT number, text, options, correct, explanation, image
             FROM exam_questions WHERE exam_id = ? ORDER BY number",
        )?;

        let rows = stmt.query_map(rusqlite::params![id.as_str()], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut questions = Vec::new();
        for row in rows {
            let (number, text, options, correct, explanation, image) = row?;
            let options: Vec<String> = serde_json::from_str(&options)
                .map_err(|e| StorageError::Corrupt(id.to_string(), e.to_string()))?;
            questions.push(ImportedQuestion {
                id: number,
                question: ParsedQuestion {
                    text,
                    options,
                    correct: correct as usize,
                    explanation,
                    image,
                },
            });
        }

        Ok(Some(StoredExam {
            id: summary.id,
            created_at: summary.created_at,
            exam: ExamImportRequest {
                title: summary.title,
                subject_id: summary.subject_id,
                time_minutes: summary.time_minutes,
                questions,
            },
        }))
    }

    /// 列出所有试卷，最新的在前
    pub fn list_exams(&self) -> Result<Vec<ExamSummary>, StorageError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, title, subject_id, time_minutes, question_count, created_at
             FROM exams ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map([], Self::row_to_summary)?;

        let mut exams = Vec::new();
        for row in rows {
            exams.push(row?);
        }

        Ok(exams)
    }

    /// 删除试卷及其题目
    pub fn delete_exam(&self, id: &ExamId) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM exams WHERE id = ?", rusqlite::params![id.as_str()])?;
        Ok(deleted > 0)
    }

    /// 从数据库行转换为 ExamSummary
    fn row_to_summary(row: &Row) -> Result<ExamSummary, rusqlite::Error> {
        let created_at: String = row.get(5)?;
        let created_at = created_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e)))?;

        Ok(ExamSummary {
            id: ExamId(row.get(0)?),
            title: row.get(1)?,
            subject_id: row.get(2)?,
            time_minutes: row.get(3)?,
            question_count: row.get(4)?,
            created_at,
        })
    }
}

impl ExamRepository for SqliteExamRepository {
    fn create_exam(&self, record: &ExamImportRequest) -> Result<ExamId, StorageError> {
        let mut conn = self.conn()?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO exams (id, title, subject_id, time_minutes, question_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                id,
                record.title,
                record.subject_id,
                record.time_minutes,
                record.questions.len() as u32,
                now,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO exam_questions
                 (exam_id, number, text, options, correct, explanation, image)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )?;

            for item in &record.questions {
                let question = &item.question;
                stmt.execute(rusqlite::params![
                    id,
                    item.id,
                    question.text,
                    serde_json::to_string(&question.options)?,
                    question.correct as u32,
                    question.explanation,
                    question.image,
                ])?;
            }
        }

        tx.commit()?;

        info!(
            "stored exam {} '{}' with {} questions",
            id,
            record.title,
            record.questions.len()
        );
        Ok(ExamId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> ExamImportRequest {
        ExamImportRequest {
            title: "期中测验".to_string(),
            subject_id: "chemistry".to_string(),
            time_minutes: 45,
            questions: vec![
                ImportedQuestion {
                    id: 1,
                    question: ParsedQuestion {
                        text: "水的化学式是？".to_string(),
                        options: vec!["$\\ce{H2O}$".into(), "$\\ce{CO2}$".into()],
                        correct: 0,
                        explanation: "常识。".to_string(),
                        image: None,
                    },
                },
                ImportedQuestion {
                    id: 2,
                    question: ParsedQuestion {
                        text: "看图作答".to_string(),
                        options: vec!["甲".into(), "乙".into(), "丙".into()],
                        correct: 2,
                        explanation: String::new(),
                        image: Some("https://example.com/fig.png".to_string()),
                    },
                },
            ],
        }
    }

    #[test]
    fn test_create_and_get_exam() {
        let repository = SqliteExamRepository::open_in_memory().unwrap();
        let request = sample_request();

        let id = repository.create_exam(&request).unwrap();
        let stored = repository.get_exam(&id).unwrap().expect("exam should exist");

        assert_eq!(stored.id, id);
        assert_eq!(stored.exam, request);
    }

    #[test]
    fn test_get_missing_exam() {
        let repository = SqliteExamRepository::open_in_memory().unwrap();
        let missing = ExamId("does-not-exist".to_string());

        assert!(repository.get_exam(&missing).unwrap().is_none());
    }

    #[test]
    fn test_list_and_delete_exams() {
        let repository = SqliteExamRepository::open_in_memory().unwrap();
        let first = repository.create_exam(&sample_request()).unwrap();
        let second = repository.create_exam(&sample_request()).unwrap();

        let exams = repository.list_exams().unwrap();
        assert_eq!(exams.len(), 2);
        assert!(exams.iter().all(|e| e.question_count == 2));
        assert_ne!(first, second);

        assert!(repository.delete_exam(&first).unwrap());
        assert!(!repository.delete_exam(&first).unwrap());

        let exams = repository.list_exams().unwrap();
        assert_eq!(exams.len(), 1);
        assert_eq!(exams[0].id, second);
    }

    #[test]
    fn test_failed_insert_leaves_no_partial_exam() {
        let repository = SqliteExamRepository::open_in_memory().unwrap();
        let mut request = sample_request();
        // 重复题号违反主键
        request.questions[1].id = 1;

        assert!(repository.create_exam(&request).is_err());
        assert!(repository.list_exams().unwrap().is_empty());
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = std::env::temp_dir().join(format!("shuati-import-{}", Uuid::new_v4()));
        let db_path = dir.join("nested").join("shuati.db");

        let repository = SqliteExamRepository::open(&db_path).unwrap();
        repository.create_exam(&sample_request()).unwrap();
        assert!(db_path.exists());

        drop(repository);
        fs::remove_dir_all(&dir).unwrap();
    }
}
