//! 轮事件：桥接层消费的统一事件单元
//!
//! 执行适配器把三种角色形态的原生输出都归一成 TurnEvent 序列：
//! 中间消息一条一个事件，末尾一个不带文本的终止标记（只用来触发选择）。

use crate::actor::TeamMessage;

/// 单轮事件
#[derive(Debug, Clone, PartialEq)]
pub struct TurnEvent {
    /// 来源身份（Agent 名或消息角色）
    pub source: String,
    /// 文本内容；终止标记不携带
    pub content: Option<String>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// 终止标记：true 表示"选择时刻"，不再有后续中间事件
    pub is_final: bool,
}

impl TurnEvent {
    pub fn message(
        source: impl Into<String>,
        content: impl Into<String>,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) -> Self {
        Self {
            source: source.into(),
            content: Some(content.into()),
            prompt_tokens,
            completion_tokens,
            is_final: false,
        }
    }

    /// 终止标记：无文本、无用量
    pub fn final_marker() -> Self {
        Self {
            source: String::new(),
            content: None,
            prompt_tokens: 0,
            completion_tokens: 0,
            is_final: true,
        }
    }

    /// 文本内容，缺省为空串
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

impl From<&TeamMessage> for TurnEvent {
    fn from(m: &TeamMessage) -> Self {
        TurnEvent::message(&m.source, &m.content, m.prompt_tokens, m.completion_tokens)
    }
}
