//! 试题文本解析引擎
//! 将规范化后的分隔文本切分为题块，并从每个题块中提取题干、选项、答案、解析和配图

use crate::models::ParsedQuestion;
use regex::Regex;
use std::sync::LazyLock;

/// 题块分隔行：独占一行的 50 个连字符
pub const BLOCK_DELIMITER: &str = "--------------------------------------------------";

/// 每道题最多保留的选项数（A-D）
pub const MAX_OPTIONS: usize = 4;

static QUESTION_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ms)(?i:\[question\])(.*?)(?:^[ \t]*(?:[A-Z]\.|\*|(?i:\[explanation\]))|\z)",
    )
    .expect("question body pattern is valid")
});

static IMAGE_MARKDOWN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[[^\]]*\]\(\s*([^)\s]+)[^)]*\)").expect("image pattern is valid")
});

static OPTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(\*?)([A-D])\.[ \t]*(.*)$").expect("option pattern is valid")
});

static EXPLANATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\[explanation\](.*)").expect("explanation pattern is valid")
});

/// 第 1 组为 `$$...$$` 块级公式，第 2 组为单行 `$...$` 行内公式
static LATEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$([^$]+)\$\$|\$([^$\n]+)\$").expect("latex pattern is valid")
});

static CHEMISTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\ce\{[^}]*\}").expect("chemistry pattern is valid"));

/// 题块被丢弃的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// 缺少 `[Question]` 标记或题干为空
    MissingQuestion,
    /// 没有任何选项行
    NoOptions,
}

/// 题块保留但值得人工复核的情况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseWarning {
    /// 没有 `*` 标记，默认第一个选项正确
    NoCorrectMarker,
    /// 多个选项带 `*`，以最后一个为准
    MultipleCorrectMarkers { count: usize },
    /// 选项超过 4 个，多余部分被截断
    OptionsTruncated { found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedBlock {
    /// 题块序号（从 0 开始）
    pub block: usize,
    pub reason: DropReason,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockWarning {
    pub block: usize,
    pub warning: ParseWarning,
}

/// 带诊断信息的解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub blocks: usize,
    pub questions: Vec<ParsedQuestion>,
    pub dropped: Vec<DroppedBlock>,
    pub warnings: Vec<BlockWarning>,
}

/// 单个题块的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutcome {
    pub question: Result<ParsedQuestion, DropReason>,
    pub warnings: Vec<ParseWarning>,
}

/// LaTeX 公式提取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatexFormula {
    pub formula: String,
    pub is_block: bool,
    pub position: usize,
}

/// 按分隔行切分题块，去除首尾空白并丢弃空块
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim() == BLOCK_DELIMITER {
            flush_block(&mut blocks, &mut current);
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    flush_block(&mut blocks, &mut current);

    blocks
}

fn flush_block(blocks: &mut Vec<String>, current: &mut String) {
    let block = current.trim();
    if !block.is_empty() {
        blocks.push(block.to_string());
    }
    current.clear();
}

/// 解析单个题块，不合格的题块返回 `None`
pub fn parse_block(block: &str) -> Option<ParsedQuestion> {
    analyze_block(block).question.ok()
}

/// 解析单个题块并给出诊断信息
pub fn analyze_block(block: &str) -> BlockOutcome {
    let mut warnings = Vec::new();

    let body = QUESTION_BODY
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or("");

    let image = IMAGE_MARKDOWN
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    let text = IMAGE_MARKDOWN.replace_all(body, "").trim().to_string();

    // 选项位置取决于出现顺序，不看字母本身
    let mut options = Vec::new();
    let mut markers = Vec::new();
    for caps in OPTION_LINE.captures_iter(block) {
        if caps.get(1).is_some_and(|m| !m.as_str().is_empty()) {
            markers.push(options.len());
        }
        let option = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");
        options.push(option.to_string());
    }

    if options.len() > MAX_OPTIONS {
        warnings.push(ParseWarning::OptionsTruncated {
            found: options.len(),
        });
        options.truncate(MAX_OPTIONS);
    }
    markers.retain(|&index| index < MAX_OPTIONS);

    let correct = match markers.as_slice() {
        [] => {
            if !options.is_empty() {
                warnings.push(ParseWarning::NoCorrectMarker);
            }
            0
        }
        [only] => *only,
        [.., last] => {
            warnings.push(ParseWarning::MultipleCorrectMarkers {
                count: markers.len(),
            });
            *last
        }
    };

    let explanation = EXPLANATION
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let question = if text.is_empty() {
        Err(DropReason::MissingQuestion)
    } else if options.is_empty() {
        Err(DropReason::NoOptions)
    } else {
        Ok(ParsedQuestion {
            text,
            options,
            correct,
            explanation,
            image,
        })
    };

    BlockOutcome { question, warnings }
}

/// 解析整段规范化文本
pub fn parse_exam_text(text: &str) -> Vec<ParsedQuestion> {
    split_blocks(text)
        .iter()
        .filter_map(|block| parse_block(block))
        .collect()
}

/// 解析整段规范化文本，同时收集被丢弃的题块和警告
pub fn parse_exam_text_with_report(text: &str) -> ParseReport {
    let blocks = split_blocks(text);
    let mut report = ParseReport {
        blocks: blocks.len(),
        ..Default::default()
    };

    for (index, block) in blocks.iter().enumerate() {
        let outcome = analyze_block(block);
        match outcome.question {
            Ok(question) => {
                report
                    .warnings
                    .extend(outcome.warnings.into_iter().map(|warning| BlockWarning {
                        block: index,
                        warning,
                    }));
                report.questions.push(question);
            }
            Err(reason) => report.dropped.push(DroppedBlock {
                block: index,
                reason,
                preview: preview(block),
            }),
        }
    }

    report
}

fn preview(block: &str) -> String {
    let line = block.lines().next().unwrap_or("");
    let mut preview: String = line.chars().take(60).collect();
    if line.chars().count() > 60 {
        preview.push('…');
    }
    preview
}

/// 按出现顺序提取文本中的 LaTeX 公式
///
/// 块级公式优先匹配，其内部不会再被识别为行内公式。
pub fn extract_latex(content: &str) -> Vec<LatexFormula> {
    LATEX
        .captures_iter(content)
        .filter_map(|caps| {
            let (mat, is_block) = match (caps.get(1), caps.get(2)) {
                (Some(block), _) => (block, true),
                (None, Some(inline)) => (inline, false),
                (None, None) => return None,
            };
            Some(LatexFormula {
                formula: mat.as_str().trim().to_string(),
                is_block,
                position: mat.start(),
            })
        })
        .collect()
}

/// 是否包含 `\ce{...}` 化学式
pub fn has_chemistry(content: &str) -> bool {
    CHEMISTRY.is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join_blocks(blocks: &[&str]) -> String {
        blocks.join(&format!("\n{}\n", BLOCK_DELIMITER))
    }

    const ADDITION: &str = "[Question]\nWhat is 2+2?\nA. 3\n*B. 4\nC. 5\nD. 6\n[Explanation]\nBasic addition.";

    #[test]
    fn test_delimiter_is_fifty_dashes() {
        assert_eq!(BLOCK_DELIMITER.len(), 50);
        assert!(BLOCK_DELIMITER.chars().all(|c| c == '-'));
    }

    #[test]
    fn test_split_blocks_trims_and_skips_empty() {
        let text = format!(
            "\n{d}\n  first  \n{d}\n\n{d}\nsecond\nline\n{d}\n",
            d = BLOCK_DELIMITER
        );
        assert_eq!(split_blocks(&text), vec!["first", "second\nline"]);
    }

    #[test]
    fn test_split_blocks_ignores_inline_dashes() {
        let text = format!("a {} b", BLOCK_DELIMITER);
        assert_eq!(split_blocks(&text).len(), 1);
    }

    #[test]
    fn test_parse_well_formed_block() {
        let question = parse_block(ADDITION).expect("block should parse");

        assert_eq!(
            question,
            ParsedQuestion {
                text: "What is 2+2?".to_string(),
                options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
                correct: 1,
                explanation: "Basic addition.".to_string(),
                image: None,
            }
        );
    }

    #[test]
    fn test_parse_extracts_image() {
        let block = "[Question]\nSee the figure. ![fig](https://example.com/a.png)\nA. A\nB. B\n[Explanation]\n";
        let question = parse_block(block).expect("block should parse");

        assert_eq!(question.image.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(question.text, "See the figure.");
        assert_eq!(question.options, vec!["A", "B"]);
        assert_eq!(question.explanation, "");
    }

    #[test]
    fn test_parse_strips_every_image_but_keeps_first_url() {
        let block = "[Question]\n![a](http://x/1.png) Compare ![b](http://x/2.png \"title\")\nA. yes";
        let question = parse_block(block).expect("block should parse");

        assert_eq!(question.image.as_deref(), Some("http://x/1.png"));
        assert_eq!(question.text, "Compare");
    }

    #[test]
    fn test_default_correct_index_is_zero() {
        let outcome = analyze_block("[Question]\nPick one\nA. x\nB. y\nC. z");

        let question = outcome.question.expect("block should parse");
        assert_eq!(question.correct, 0);
        assert_eq!(outcome.warnings, vec![ParseWarning::NoCorrectMarker]);
    }

    #[test]
    fn test_drop_block_without_options() {
        let block = "[Question]\nNo options here.\n[Explanation]\nN/A";

        assert_eq!(parse_block(block), None);
        assert_eq!(analyze_block(block).question, Err(DropReason::NoOptions));
    }

    #[test]
    fn test_drop_block_without_question_marker() {
        let outcome = analyze_block("A. 1\n*B. 2");
        assert_eq!(outcome.question, Err(DropReason::MissingQuestion));
    }

    #[test]
    fn test_markers_are_case_insensitive() {
        let block = "[QUESTION] Capital of France?\n  A. Paris\n  B. Rome\n[explanation] Paris it is.";
        let question = parse_block(block).expect("block should parse");

        assert_eq!(question.text, "Capital of France?");
        assert_eq!(question.options, vec!["Paris", "Rome"]);
        assert_eq!(question.explanation, "Paris it is.");
    }

    #[test]
    fn test_question_body_stops_at_marked_option() {
        let block = "[Question]\nMulti\nline $x^2$ body\n*A. first\nB. second";
        let question = parse_block(block).expect("block should parse");

        assert_eq!(question.text, "Multi\nline $x^2$ body");
        assert_eq!(question.correct, 0);
    }

    #[test]
    fn test_question_body_stops_at_explanation() {
        let block = "A. x\n*B. y\n[Question]\nQ?\n[Explanation]\nBecause.";
        let question = parse_block(block).expect("block should parse");

        assert_eq!(question.text, "Q?");
        assert_eq!(question.options, vec!["x", "y"]);
        assert_eq!(question.correct, 1);
        assert_eq!(question.explanation, "Because.");
    }

    #[test]
    fn test_options_use_appearance_order() {
        let block = "[Question]\nOrder?\nB. foo\n*A. bar";
        let question = parse_block(block).expect("block should parse");

        assert_eq!(question.options, vec!["foo", "bar"]);
        assert_eq!(question.correct, 1);
    }

    #[test]
    fn test_options_are_truncated_to_four() {
        let block = "[Question]\nMany\nA. 1\nB. 2\nC. 3\nD. 4\n*A. 5";
        let outcome = analyze_block(block);
        let question = outcome.question.expect("block should parse");

        assert_eq!(question.options, vec!["1", "2", "3", "4"]);
        assert_eq!(question.correct, 0);
        assert!(outcome
            .warnings
            .contains(&ParseWarning::OptionsTruncated { found: 5 }));
    }

    #[test]
    fn test_last_correct_marker_wins() {
        let outcome = analyze_block("[Question]\nQ\n*A. x\n*B. y\nC. z");

        assert_eq!(outcome.question.map(|q| q.correct), Ok(1));
        assert_eq!(
            outcome.warnings,
            vec![ParseWarning::MultipleCorrectMarkers { count: 2 }]
        );
    }

    #[test]
    fn test_option_with_empty_text_after_letter() {
        let question = parse_block("[Question]\nQ\nA.\nB. y").expect("block should parse");
        assert_eq!(question.options, vec!["", "y"]);
    }

    #[test]
    fn test_parse_exam_text_multiple_blocks() {
        let second = "[Question]\n$\\ce{H2O}$ is?\nA. water\n*B. ice\n[Explanation]\nTrick.";
        let text = join_blocks(&[ADDITION, "garbage", second]);

        let questions = parse_exam_text(&text);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].text, "What is 2+2?");
        assert_eq!(questions[1].text, "$\\ce{H2O}$ is?");
        assert_eq!(questions[1].correct, 1);
    }

    #[test]
    fn test_parse_report_collects_drops_and_warnings() {
        let text = join_blocks(&[
            ADDITION,
            "[Question]\nNo options here.\n[Explanation]\nN/A",
            "[Question]\nUnmarked\nA. a\nB. b",
        ]);

        let report = parse_exam_text_with_report(&text);
        assert_eq!(report.blocks, 3);
        assert_eq!(report.questions.len(), 2);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].block, 1);
        assert_eq!(report.dropped[0].reason, DropReason::NoOptions);
        assert_eq!(report.dropped[0].preview, "[Question]");
        assert_eq!(
            report.warnings,
            vec![BlockWarning {
                block: 2,
                warning: ParseWarning::NoCorrectMarker,
            }]
        );
        assert_eq!(report.questions, parse_exam_text(&text));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = join_blocks(&[ADDITION, ADDITION]);
        assert_eq!(parse_exam_text(&text), parse_exam_text(&text));
    }

    #[test]
    fn test_crlf_input() {
        let text = ADDITION.replace('\n', "\r\n");
        let questions = parse_exam_text(&text);

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options, vec!["3", "4", "5", "6"]);
    }

    #[test]
    fn test_extract_latex_from_question_body() {
        let block = "[Question]\nSolve $x^2 = 4$ given\n$$\n\\sum_{i=1}^{n} i\n$$\nA. $x = 2$\n*B. $x = \\pm 2$";
        let question = parse_block(block).expect("block should parse");
        let formulas = extract_latex(&question.text);

        assert_eq!(formulas.len(), 2);
        assert_eq!(formulas[0].formula, "x^2 = 4");
        assert!(!formulas[0].is_block);
        assert_eq!(formulas[1].formula, "\\sum_{i=1}^{n} i");
        assert!(formulas[1].is_block);
        assert!(formulas[0].position < formulas[1].position);

        let in_options: Vec<_> = question.options.iter().flat_map(|o| extract_latex(o)).collect();
        assert_eq!(in_options.len(), 2);
        assert!(in_options.iter().all(|f| !f.is_block));
    }

    #[test]
    fn test_unterminated_block_latex_is_not_a_formula() {
        assert!(extract_latex("cost is $$5 and rising").is_empty());
    }

    #[test]
    fn test_has_chemistry() {
        assert!(has_chemistry(r"反应 $\ce{2H2 + O2 -> 2H2O}$"));
        assert!(!has_chemistry("plain text"));
    }
}
