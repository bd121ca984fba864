//! 轮询团队：参与者按固定顺序轮流发言，直到终止条件触发
//!
//! 流式运行在后台任务中驱动：先回显任务输入，逐条推送新消息，最后推送最终结果。
//! 消费端断开（接收端被丢弃）时 send 失败，后台任务随即停止，不再继续拉取 LLM。

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::actor::{AssistantAgent, RunItem, TaskResult, TeamMessage, TerminationCondition};
use crate::error::BridgeError;

/// 无终止条件命中时的硬上限，防止对话无限进行
const HARD_MESSAGE_CAP: usize = 50;

/// 轮询团队
pub struct RoundRobinTeam {
    name: String,
    participants: Vec<Arc<AssistantAgent>>,
    termination: TerminationCondition,
}

impl std::fmt::Debug for RoundRobinTeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundRobinTeam")
            .field("name", &self.name)
            .field(
                "participants",
                &self
                    .participants
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .field("termination", &self.termination)
            .finish()
    }
}

impl RoundRobinTeam {
    pub fn new(
        name: impl Into<String>,
        participants: Vec<AssistantAgent>,
        termination: TerminationCondition,
    ) -> Self {
        Self {
            name: name.into(),
            participants: participants.into_iter().map(Arc::new).collect(),
            termination,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn termination(&self) -> &TerminationCondition {
        &self.termination
    }

    /// 非流式运行：轮流发言直到终止，返回完整消息序列（含任务输入回显）
    pub async fn run(&self, task: Vec<TeamMessage>) -> Result<TaskResult, BridgeError> {
        if self.participants.is_empty() {
            return Err(BridgeError::Config(format!(
                "team '{}' has no participants",
                self.name
            )));
        }
        let mut transcript = task;
        let mut produced = 0usize;
        let mut stop_reason = None;

        'outer: loop {
            for agent in &self.participants {
                let reply = agent.respond(&transcript).await?;
                let text = reply.content.clone();
                transcript.push(reply);
                produced += 1;

                if self.termination.should_stop(produced, &text) {
                    stop_reason = Some(format!("termination condition met after {} messages", produced));
                    break 'outer;
                }
                if produced >= HARD_MESSAGE_CAP {
                    stop_reason = Some(format!("hard message cap ({}) reached", HARD_MESSAGE_CAP));
                    break 'outer;
                }
            }
        }

        Ok(TaskResult {
            messages: transcript,
            stop_reason,
        })
    }

    /// 流式运行：后台任务驱动，接收端拿到与非流式相同顺序的条目
    pub fn run_stream(self: &Arc<Self>, task: Vec<TeamMessage>) -> mpsc::UnboundedReceiver<RunItem> {
        let (tx, rx) = mpsc::unbounded_channel();
        let team = Arc::clone(self);

        tokio::spawn(async move {
            if team.participants.is_empty() {
                tracing::warn!("team '{}' has no participants", team.name);
                let _ = tx.send(RunItem::Result(TaskResult::default()));
                return;
            }
            let mut transcript = Vec::with_capacity(task.len());
            for m in task {
                if tx.send(RunItem::Message(m.clone())).is_err() {
                    return;
                }
                transcript.push(m);
            }

            let mut produced = 0usize;
            let mut stop_reason = None;

            'outer: loop {
                for agent in &team.participants {
                    let reply = match agent.respond(&transcript).await {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!("team '{}' turn failed: {}", team.name, e);
                            break 'outer;
                        }
                    };
                    let text = reply.content.clone();
                    if tx.send(RunItem::Message(reply.clone())).is_err() {
                        // 消费端已断开
                        return;
                    }
                    transcript.push(reply);
                    produced += 1;

                    if team.termination.should_stop(produced, &text) {
                        stop_reason =
                            Some(format!("termination condition met after {} messages", produced));
                        break 'outer;
                    }
                    if produced >= HARD_MESSAGE_CAP {
                        stop_reason = Some(format!("hard message cap ({}) reached", HARD_MESSAGE_CAP));
                        break 'outer;
                    }
                }
            }

            let _ = tx.send(RunItem::Result(TaskResult {
                messages: transcript,
                stop_reason,
            }));
        });

        rx
    }
}
