//! 导入流程配置

/// 默认分块大小（字符数）
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

/// 段落断点搜索窗口（字符数）
pub const DEFAULT_BREAK_TOLERANCE: usize = 500;

/// 分块配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub target_size: usize,
    pub tolerance: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_CHUNK_SIZE,
            tolerance: DEFAULT_BREAK_TOLERANCE,
        }
    }
}

impl ChunkerConfig {
    pub fn with_target_size(target_size: usize) -> Self {
        Self {
            target_size,
            ..Default::default()
        }
    }
}

/// 导入配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub chunker: ChunkerConfig,
    /// 传给 AI 规范化服务的类型标签
    pub kind: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            kind: "exam".to_string(),
        }
    }
}

/// AI 规范化服务配置
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub base_url: String,
    /// 按顺序轮换的 API Key
    pub api_keys: Vec<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            api_keys: Vec::new(),
            max_tokens: 4096,
            temperature: 0.2,
            stop: vec!["<|im_end|>".to_string()],
        }
    }
}

impl NormalizerConfig {
    /// 从环境变量读取配置，未设置的项使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("SHUATI_AI_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(keys) = lookup("SHUATI_AI_KEYS") {
            config.api_keys = parse_key_list(&keys);
        }
        if let Some(max_tokens) = lookup("SHUATI_AI_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            config.max_tokens = max_tokens;
        }

        config
    }
}

/// 解析逗号分隔的 Key 列表，保留顺序并去掉空项
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_key_list() {
        assert_eq!(parse_key_list(" a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_key_list("").is_empty());
    }

    #[test]
    fn test_normalizer_config_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SHUATI_AI_URL", "https://ai.example.com/"),
            ("SHUATI_AI_KEYS", "k1,k2"),
            ("SHUATI_AI_MAX_TOKENS", "not-a-number"),
        ]);

        let config = NormalizerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_url, "https://ai.example.com");
        assert_eq!(config.api_keys, vec!["k1", "k2"]);
        assert_eq!(config.max_tokens, NormalizerConfig::default().max_tokens);
    }

    #[test]
    fn test_import_config_default() {
        let config = ImportConfig::default();
        assert_eq!(config.chunker.target_size, 4000);
        assert_eq!(config.chunker.tolerance, 500);
        assert_eq!(config.kind, "exam");
    }
}
