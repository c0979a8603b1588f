use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, LevelFilter};
use serde::Serialize;
use shuati_import::commands;
use shuati_import::config::{ChunkerConfig, ImportConfig, NormalizerConfig, DEFAULT_CHUNK_SIZE};
use shuati_import::models::ExamMeta;
use shuati_import::services::{ExamImporter, HttpNormalizer, SqliteExamRepository};
use shuati_import::utils;
use std::path::{Path, PathBuf};
use std::process;

/// 刷题神器题库导入工具
#[derive(Debug, Parser)]
#[command(name = "shuati-import", version)]
#[command(about = "Parse exam text into questions and import them into the question bank")]
struct Cli {
    /// SQLite 数据库路径
    #[arg(long, env = "SHUATI_DB", global = true)]
    db: Option<PathBuf>,

    /// 日志级别
    #[arg(long, env = "SHUATI_LOG", default_value = "info", global = true)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 预览原文的分块结果
    Chunk {
        file: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        size: usize,
    },
    /// 把规范文本解析为题目 JSON
    Parse { file: PathBuf },
    /// 校验规范文本格式
    Check { file: PathBuf },
    /// 导入试卷
    Import {
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        minutes: u32,
        /// 先经 AI 规范化（原文不是规范格式时使用）
        #[arg(long)]
        normalize: bool,
        /// 传给 AI 服务的类型标签
        #[arg(long, default_value = "exam")]
        kind: String,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// 列出已导入的试卷
    List,
    /// 查看一份试卷
    Show { id: String },
    /// 删除一份试卷
    Delete { id: String },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!("{:#}", err);
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.log_level).context("failed to initialize logging")?;

    let db_path = cli.db.unwrap_or_else(utils::get_database_path);

    match cli.command {
        Command::Chunk { file, size } => {
            let content = commands::read_source(&file)?;
            print_json(&commands::chunk_document(
                &content,
                ChunkerConfig::with_target_size(size),
            ))
        }
        Command::Parse { file } => {
            let content = commands::read_source(&file)?;
            print_json(&commands::parse_document(&content))
        }
        Command::Check { file } => {
            let content = commands::read_source(&file)?;
            print_json(&commands::validate_document(&content))
        }
        Command::Import {
            file,
            title,
            subject,
            minutes,
            normalize,
            kind,
            chunk_size,
        } => {
            let content = commands::read_source(&file)?;
            let importer = ExamImporter::new(
                HttpNormalizer::new(NormalizerConfig::from_env()),
                open_repository(&db_path)?,
                ImportConfig {
                    chunker: ChunkerConfig::with_target_size(chunk_size),
                    kind,
                },
            );
            let meta = ExamMeta::new(title, subject, minutes);
            print_json(&commands::import_exam(&importer, meta, &content, normalize).await?)
        }
        Command::List => print_json(&commands::list_exams(&open_repository(&db_path)?)?),
        Command::Show { id } => print_json(&commands::show_exam(&open_repository(&db_path)?, &id)?),
        Command::Delete { id } => commands::delete_exam(&open_repository(&db_path)?, &id),
    }
}

fn open_repository(db_path: &Path) -> Result<SqliteExamRepository> {
    SqliteExamRepository::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
