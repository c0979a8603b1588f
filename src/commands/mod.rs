// 命令模块
// 命令行子命令背后的处理函数，返回可序列化的结果

pub mod database;
pub mod parser;

pub use database::{delete_exam, import_exam, list_exams, show_exam, ImportResultDto};

pub use parser::{
    chunk_document, parse_document, read_source, validate_document, BlockIssueDto, ChunkDto,
    ValidationResult,
};
