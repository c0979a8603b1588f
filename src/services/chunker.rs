//! 文本分块
//! 长文本在送入 AI 规范化之前按段落边界切分成有限长度的片段

use crate::config::ChunkerConfig;

const PARAGRAPH_BREAK: &str = "\n\n";

/// 将文本切分为按顺序排列、互不重叠的片段
///
/// 输入先去除首尾空白；空输入返回空列表。长度按字符计算。
/// 在朴素切点前后 `tolerance` 个字符内寻找空行，优先取切点之前最近的一个，
/// 找不到再取切点之后最近的一个（此时片段会略超 `target_size`），
/// 都没有时直接在 `target_size` 处切开。空行本身归入前一个片段，
/// 因此所有片段按顺序拼接后与去除首尾空白的输入完全一致。
pub fn chunk_text(text: &str, config: ChunkerConfig) -> Vec<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let size = config.target_size.max(1);
    let bounds = char_bounds(text);
    let total = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let naive = (start + size).min(total);
        let cut = if naive < total {
            find_paragraph_break(text, &bounds, start, naive, config.tolerance).unwrap_or(naive)
        } else {
            naive
        };

        debug_assert!(cut > start);
        chunks.push(&text[bounds[start]..bounds[cut]]);
        start = cut;
    }

    chunks
}

/// 每个字符的起始字节偏移，末尾追加 `text.len()`
fn char_bounds(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// 返回切点的字符下标（空行之后的位置），保证大于 `start`
fn find_paragraph_break(
    text: &str,
    bounds: &[usize],
    start: usize,
    naive: usize,
    tolerance: usize,
) -> Option<usize> {
    let total = bounds.len() - 1;

    // 切点之前
    let lo = bounds[naive.saturating_sub(tolerance).max(start)];
    let hi = bounds[naive];
    if let Some(pos) = text[lo..hi].rfind(PARAGRAPH_BREAK) {
        return char_index(bounds, lo + pos + PARAGRAPH_BREAK.len());
    }

    // 切点之后，包括横跨切点的空行
    let lo = bounds[naive - 1];
    let hi = bounds[(naive + tolerance).min(total)];
    text[lo..hi]
        .find(PARAGRAPH_BREAK)
        .and_then(|pos| char_index(bounds, lo + pos + PARAGRAPH_BREAK.len()))
        .filter(|&cut| cut > start)
}

fn char_index(bounds: &[usize], byte_offset: usize) -> Option<usize> {
    bounds.binary_search(&byte_offset).ok()
}
