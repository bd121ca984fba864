//! 非流式渲染：等运行完成后构建单个结构化响应
//!
//! 等价于把流式路径排干而不发 chunk：对完整历史做一次选择 + 清洗。
//! 运行产出多个独立结果时（聚合 / 蓝图多团队场景）每个结果一个 choice，
//! 用量跨结果求和。选择失败不向外抛，用固定兜底文案顶替。

use std::sync::Arc;

use crate::actor::TaskResult;
use crate::api::types::{
    new_request_id, now_epoch_secs, ChatCompletionResponse, ChatCompletionResponseChoice,
    ChatMessage,
};
use crate::bridge::adapter::result_history;
use crate::bridge::sanitize::clean;
use crate::bridge::selection::select_text;
use crate::bridge::usage::UsageTotals;
use crate::bridge::FALLBACK_TEXT;
use crate::error::BridgeError;
use crate::registry::ModelDescriptor;

/// 一次已执行的运行：描述符 + 结果（聚合场景下单个模型失败不拖垮整响应）
pub struct RenderedRun {
    pub descriptor: Arc<ModelDescriptor>,
    pub result: Result<TaskResult, BridgeError>,
}

/// 构建非流式响应：每个运行结果一个 choice，用量求和
pub fn build_completion_response(model: &str, runs: &[RenderedRun]) -> ChatCompletionResponse {
    let mut usage = UsageTotals::default();
    let mut choices = Vec::with_capacity(runs.len());

    for (index, run) in runs.iter().enumerate() {
        let content = match &run.result {
            Ok(result) => {
                let history = result_history(result);
                for ev in &history {
                    usage.fold_event(ev);
                }
                match select_text(&history, &run.descriptor.selection) {
                    Ok(selected) => {
                        let cleaned = clean(&selected, &run.descriptor.termination_texts);
                        if cleaned.trim().is_empty() {
                            FALLBACK_TEXT.to_string()
                        } else {
                            cleaned
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            "selection failed for '{}': {}, substituting fallback",
                            run.descriptor.name,
                            e
                        );
                        FALLBACK_TEXT.to_string()
                    }
                }
            }
            Err(e) => {
                tracing::warn!("run of '{}' failed: {}, substituting fallback", run.descriptor.name, e);
                FALLBACK_TEXT.to_string()
            }
        };

        choices.push(ChatCompletionResponseChoice {
            index: index as u32,
            message: ChatMessage::assistant(content),
            finish_reason: Some("stop".to_string()),
        });
    }

    ChatCompletionResponse {
        id: new_request_id(),
        object: "chat.completion".to_string(),
        created: now_epoch_secs(),
        model: model.to_string(),
        choices,
        usage: usage.to_wire(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorHandle, AssistantAgent, TeamMessage};
    use crate::llm::MockLlmClient;
    use crate::registry::ModelRegistry;

    fn descriptor(name: &str, source_select: Option<&str>) -> Arc<ModelDescriptor> {
        let mut registry = ModelRegistry::new();
        let agent = AssistantAgent::new("solo", "p", Arc::new(MockLlmClient::new()));
        registry
            .register(name, ActorHandle::Agent(Arc::new(agent)), source_select, None)
            .unwrap();
        registry.resolve(name).unwrap()
    }

    fn result_with(messages: Vec<TeamMessage>) -> TaskResult {
        TaskResult {
            messages,
            stop_reason: None,
        }
    }

    #[test]
    fn test_single_result_single_choice() {
        let runs = vec![RenderedRun {
            descriptor: descriptor("m", None),
            result: Ok(result_with(vec![
                TeamMessage::new("user", "问").with_usage(3, 0),
                TeamMessage::new("writer", "答 TERMINATE").with_usage(10, 5),
            ])),
        }];

        let response = build_completion_response("m", &runs);
        assert_eq!(response.object, "chat.completion");
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.content.as_deref(), Some("答"));
        assert_eq!(response.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.prompt_tokens, 13);
        assert_eq!(response.usage.completion_tokens, 5);
        assert_eq!(response.usage.total_tokens, 18);
    }

    #[test]
    fn test_multi_result_one_choice_each_usage_summed() {
        let runs = vec![
            RenderedRun {
                descriptor: descriptor("a", None),
                result: Ok(result_with(vec![TeamMessage::new("x", "甲").with_usage(1, 1)])),
            },
            RenderedRun {
                descriptor: descriptor("b", None),
                result: Ok(result_with(vec![TeamMessage::new("y", "乙").with_usage(2, 2)])),
            },
        ];

        let response = build_completion_response("*all models*", &runs);
        assert_eq!(response.choices.len(), 2);
        assert_eq!(response.choices[0].index, 0);
        assert_eq!(response.choices[1].index, 1);
        assert_eq!(response.choices[1].message.content.as_deref(), Some("乙"));
        assert_eq!(response.usage.total_tokens, 6);
    }

    #[test]
    fn test_failed_run_becomes_fallback_choice() {
        let runs = vec![RenderedRun {
            descriptor: descriptor("m", None),
            result: Err(BridgeError::UnsupportedActor("no entry point".to_string())),
        }];

        let response = build_completion_response("m", &runs);
        assert_eq!(response.choices[0].message.content.as_deref(), Some(FALLBACK_TEXT));
        assert_eq!(response.usage.total_tokens, 0);
    }

    #[test]
    fn test_source_select_no_match_fallback() {
        let runs = vec![RenderedRun {
            descriptor: descriptor("m", Some("writer")),
            result: Ok(result_with(vec![TeamMessage::new("editor", "只有编辑发言")])),
        }];

        let response = build_completion_response("m", &runs);
        assert_eq!(response.choices[0].message.content.as_deref(), Some(FALLBACK_TEXT));
    }
}
