//! 角色（Actor）层：可被注册为模型的对话执行体
//!
//! 三种形态，按标签变体分发而非继承：
//! - **agent**: 单 Agent，一问一答，无原生流式入口
//! - **team**: 轮询团队，参与者按固定顺序发言直到终止条件触发
//! - **blueprint**: 存储的 JSON 配置，执行时构建团队

pub mod agent;
pub mod blueprint;
pub mod team;
pub mod termination;

use std::sync::Arc;

pub use agent::AssistantAgent;
pub use blueprint::{load_blueprints, BlueprintActor, TeamBlueprint};
pub use team::RoundRobinTeam;
pub use termination::TerminationCondition;

/// 运行中产生的一条消息：来源（Agent 身份）、内容与本条消耗的 token
#[derive(Debug, Clone, PartialEq)]
pub struct TeamMessage {
    pub source: String,
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TeamMessage {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }

    pub fn with_usage(mut self, prompt: u64, completion: u64) -> Self {
        self.prompt_tokens = prompt;
        self.completion_tokens = completion;
        self
    }
}

/// 一次运行的最终聚合结果：完整消息序列与停止原因
///
/// 团队的 messages 含任务输入回显；单 Agent 只含自己的一条回复。
#[derive(Debug, Clone, Default)]
pub struct TaskResult {
    pub messages: Vec<TeamMessage>,
    pub stop_reason: Option<String>,
}

/// 流式运行产生的条目：中间消息，或携带最终聚合结果的收尾条目
#[derive(Debug, Clone)]
pub enum RunItem {
    Message(TeamMessage),
    Result(TaskResult),
}

/// 已注册角色的三种形态
#[derive(Clone)]
pub enum ActorHandle {
    Agent(Arc<AssistantAgent>),
    Team(Arc<RoundRobinTeam>),
    Blueprint(Arc<BlueprintActor>),
}

impl ActorHandle {
    /// 展平角色的终止条件树，收集字面量终止文本（注册时做哨兵发现）
    pub fn termination_texts(&self) -> Vec<String> {
        match self {
            Self::Agent(_) => Vec::new(),
            Self::Team(team) => team.termination().termination_texts(),
            Self::Blueprint(bp) => bp.termination_texts(),
        }
    }

    /// 该角色的事件流是否回显任务输入（团队会先回显任务消息，单 Agent 不会）
    pub fn echoes_task_input(&self) -> bool {
        !matches!(self, Self::Agent(_))
    }
}
