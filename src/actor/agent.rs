//! 单 Agent：基于完整对话记录生成一条回复
//!
//! 没有原生流式入口，流式请求由执行适配器回落到非流式调用。

use std::sync::Arc;

use crate::actor::{TaskResult, TeamMessage};
use crate::error::BridgeError;
use crate::llm::{LlmClient, Message};

/// 具名 Agent：system prompt + LLM 后端
pub struct AssistantAgent {
    name: String,
    system_prompt: String,
    llm: Arc<dyn LlmClient>,
}

impl AssistantAgent {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            llm,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 基于对话记录生成一条回复：自己的历史消息映射为 assistant，其余按 `来源: 内容` 映射为 user
    pub(crate) async fn respond(
        &self,
        transcript: &[TeamMessage],
    ) -> Result<TeamMessage, BridgeError> {
        let mut messages = vec![Message::system(&self.system_prompt)];
        for m in transcript {
            if m.source == self.name {
                messages.push(Message::assistant(&m.content));
            } else {
                messages.push(Message::user(format!("{}: {}", m.source, m.content)));
            }
        }

        let reply = self.llm.complete(&messages).await?;
        Ok(TeamMessage::new(&self.name, reply.content)
            .with_usage(reply.prompt_tokens, reply.completion_tokens))
    }

    /// 非流式运行：对任务输入产出单条回复
    pub async fn run(&self, task: Vec<TeamMessage>) -> Result<TaskResult, BridgeError> {
        let reply = self.respond(&task).await?;
        Ok(TaskResult {
            messages: vec![reply],
            stop_reason: None,
        })
    }
}
