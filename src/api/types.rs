//! 线上协议类型：chat-completion 兼容的请求 / 响应 / 流式 chunk
//!
//! 字段名是与已广泛部署的 chat-completion API 的兼容契约，不可改动。
//! id 为固定前缀加随机后缀，每个请求生成一次并在整个流中复用。

use serde::{Deserialize, Serialize};

use crate::actor::TeamMessage;

/// 消息角色（线上形态）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    System,
    User,
    Assistant,
}

impl WireRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireRole::System => "system",
            WireRole::User => "user",
            WireRole::Assistant => "assistant",
        }
    }
}

/// 单条对话消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: WireRole,
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: WireRole::Assistant,
            content: Some(content.into()),
        }
    }
}

/// chat completion 请求体
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub model: Option<String>,
}

/// 非流式响应中的单个选择
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponseChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

/// token 用量（线上形态）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// 非流式响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionResponseChoice>,
    pub usage: UsageInfo,
}

/// 流式响应中的增量消息；空增量序列化为 {}
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// 流式响应中的单个选择
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionStreamChoice {
    pub index: u32,
    pub delta: DeltaMessage,
    pub finish_reason: Option<String>,
}

/// 流式响应 chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionStreamResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionStreamChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,
}

impl ChatCompletionStreamResponse {
    fn base(id: &str, created: i64, model: &str, delta: DeltaMessage, finish_reason: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: vec![ChatCompletionStreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            usage: None,
        }
    }

    /// 首个 chunk：声明 assistant 角色，不带内容
    pub fn role_announce(id: &str, created: i64, model: &str) -> Self {
        Self::base(
            id,
            created,
            model,
            DeltaMessage {
                role: Some("assistant".to_string()),
                content: None,
            },
            None,
        )
    }

    /// 中间 chunk：携带一段内容
    pub fn content_delta(id: &str, created: i64, model: &str, text: impl Into<String>) -> Self {
        Self::base(
            id,
            created,
            model,
            DeltaMessage {
                role: None,
                content: Some(text.into()),
            },
            None,
        )
    }

    /// 收尾 chunk：空增量、finish_reason = stop，附带用量合计
    pub fn finish(id: &str, created: i64, model: &str, usage: UsageInfo) -> Self {
        let mut chunk = Self::base(id, created, model, DeltaMessage::default(), Some("stop".to_string()));
        chunk.usage = Some(usage);
        chunk
    }
}

/// 模型列表项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// 模型列表响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub object: String,
    pub data: Vec<ModelResponse>,
}

/// 生成请求 id：固定前缀 + 随机十六进制后缀，每个请求一次
pub fn new_request_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/// 当前秒级时间戳
pub fn now_epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// 线上消息转任务输入：content 为空的条目跳过，角色名作为来源
pub fn convert_messages(messages: &[ChatMessage]) -> Vec<TeamMessage> {
    messages
        .iter()
        .filter_map(|m| {
            m.content
                .as_deref()
                .filter(|c| !c.is_empty())
                .map(|c| TeamMessage::new(m.role.as_str(), c))
        })
        .collect()
}
