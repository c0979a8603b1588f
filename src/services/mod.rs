// 服务模块
// 提供核心业务逻辑服务

pub mod chunker;
pub mod database;
pub mod importer;
pub mod normalizer;
pub mod parser;

pub use chunker::chunk_text;

pub use database::{ExamRepository, SqliteExamRepository};

pub use importer::{assemble_exam, parse_with_diagnostics, ExamImporter};

pub use normalizer::{
    ChatMessage, HttpNormalizer, KeyRotation, NormalizationPrompt, Normalizer,
};

pub use parser::{
    analyze_block, extract_latex, has_chemistry, parse_block, parse_exam_text,
    parse_exam_text_with_report, split_blocks, BlockOutcome, BlockWarning, DropReason,
    DroppedBlock, LatexFormula, ParseReport, ParseWarning, BLOCK_DELIMITER, MAX_OPTIONS,
};
