//! AI 规范化服务模块
//! 把学习资料或试卷原文交给 llama-server 风格的补全接口，转换为分隔格式的规范文本

use crate::config::NormalizerConfig;
use crate::error::NormalizeError;
use crate::services::parser::BLOCK_DELIMITER;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;

/// 规范化协作方：输入一个文本片段和类型标签，输出规范文本
pub trait Normalizer: Send + Sync {
    fn normalize(
        &self,
        chunk: &str,
        kind: &str,
    ) -> impl Future<Output = Result<String, NormalizeError>> + Send;
}

/// API Key 轮换策略
///
/// 按顺序尝试每个 Key：遇到限流跳到下一个，其他错误立即返回，
/// 全部限流后返回 `KeysExhausted`。未配置 Key 时不带凭证请求一次。
#[derive(Debug, Clone, Default)]
pub struct KeyRotation {
    keys: Vec<String>,
}

impl KeyRotation {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, NormalizeError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<T, NormalizeError>>,
    {
        if self.keys.is_empty() {
            return attempt(None).await;
        }

        for (index, key) in self.keys.iter().enumerate() {
            match attempt(Some(key.clone())).await {
                Err(NormalizeError::RateLimited) => {
                    warn!(
                        "API key #{} of {} rate limited, rotating",
                        index + 1,
                        self.keys.len()
                    );
                }
                other => return other,
            }
        }

        Err(NormalizeError::KeysExhausted {
            attempts: self.keys.len(),
        })
    }
}

/// 聊天消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Completion 请求
#[derive(Debug, Serialize)]
struct CompletionRequest {
    prompt: String,
    n_predict: u32,
    temperature: f32,
    stop: Vec<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_prompt: Option<bool>,
}

/// Completion 响应
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}

/// 规范化提示词
pub struct NormalizationPrompt;

impl NormalizationPrompt {
    /// 根据类型标签构建对话消息，未知标签按 `exam` 处理
    pub fn messages(chunk: &str, kind: &str) -> Vec<ChatMessage> {
        let task = match kind {
            "notes" => {
                "The text below is study material. Write multiple-choice questions that test \
                 its key facts and concepts, each with four options and one correct answer."
            }
            _ => {
                "The text below contains exam questions copied from a paper. Extract every \
                 question exactly as written, keeping its options and marking the correct one."
            }
        };

        vec![
            ChatMessage::system(Self::format_instructions()),
            ChatMessage::user(format!("{}\n\n## Text:\n{}", task, chunk)),
        ]
    }

    fn format_instructions() -> String {
        format!(
            r#"You are an expert exam question editor. Rewrite the user's text into the following format and output nothing else.

## Format for each question:
[Question]
<question text, keep images as ![alt](url) and formulas as $...$, $$...$$ or \ce{{...}}>
A. <option>
B. <option>
C. <option>
D. <option>
[Explanation]
<why the correct option is correct>

## Rules:
1. Put a `*` directly before the letter of the correct option, e.g. `*B. 4`
2. At most four options per question, letters A to D, one per line
3. Separate questions with a line of exactly 50 hyphens:
{}
4. Do not number the questions and do not add any other text"#,
            BLOCK_DELIMITER
        )
    }

    /// 构建 ChatML 提示词
    pub fn build_chat_prompt(messages: &[ChatMessage]) -> String {
        let mut prompt = String::new();

        for message in messages {
            match message.role.as_str() {
                "system" | "user" | "assistant" => {
                    prompt.push_str(&format!(
                        "<|im_start|>{}\n{}\n<|im_end|>\n",
                        message.role, message.content
                    ));
                }
                _ => {}
            }
        }

        prompt.push_str("<|im_start|>assistant\n");
        prompt
    }
}

/// 去掉模型有时包在输出外面的 Markdown 代码围栏
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // 首行可能是语言标记
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}

/// 基于 HTTP 补全接口的规范化服务
#[derive(Clone)]
pub struct HttpNormalizer {
    config: NormalizerConfig,
    rotation: KeyRotation,
    http_client: reqwest::Client,
}

impl HttpNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        let rotation = KeyRotation::new(config.api_keys.clone());
        Self {
            config,
            rotation,
            http_client: reqwest::Client::new(),
        }
    }

    async fn complete(&self, prompt: &str, api_key: Option<String>) -> Result<String, NormalizeError> {
        let url = format!("{}/completion", self.config.base_url);

        let completion_request = CompletionRequest {
            prompt: prompt.to_string(),
            n_predict: self.config.max_tokens,
            temperature: self.config.temperature,
            stop: self.config.stop.clone(),
            stream: false,
            cache_prompt: Some(true),
        };

        let mut request = self.http_client.post(&url).json(&completion_request);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NormalizeError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NormalizeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion = response.json::<CompletionResponse>().await?;
        Ok(completion.content)
    }
}

impl Normalizer for HttpNormalizer {
    async fn normalize(&self, chunk: &str, kind: &str) -> Result<String, NormalizeError> {
        let start_time = Instant::now();
        let prompt =
            NormalizationPrompt::build_chat_prompt(&NormalizationPrompt::messages(chunk, kind));

        let content = self
            .rotation
            .run(|key| self.complete(&prompt, key))
            .await?;

        let canonical = strip_code_fence(&content);
        if canonical.is_empty() {
            return Err(NormalizeError::EmptyResponse);
        }

        debug!(
            "normalized {} chars into {} chars in {} ms",
            chunk.chars().count(),
            canonical.chars().count(),
            start_time.elapsed().as_millis()
        );
        Ok(canonical.to_string())
    }
}
