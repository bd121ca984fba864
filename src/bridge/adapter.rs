//! 执行适配器：把三种角色形态归一成同一个轮事件序列
//!
//! 非流式 run 运行到完成并返回事件历史；run_streaming 返回实时事件接收端，
//! 单消费者、单次遍历、不可重放。单 Agent 没有原生流式入口，回落为一次
//! 非流式调用并合成"一条消息 + 终止标记"的事件序列。

use tokio::sync::mpsc;

use crate::actor::{ActorHandle, RunItem, TaskResult, TeamMessage};
use crate::bridge::TurnEvent;
use crate::error::BridgeError;
use crate::registry::{ModelDescriptor, ModelRegistry};

/// 把最终结果展开成事件历史（不含终止标记）
pub fn result_history(result: &TaskResult) -> Vec<TurnEvent> {
    result.messages.iter().map(TurnEvent::from).collect()
}

/// 非流式执行：运行到完成，返回角色的最终聚合结果
pub async fn run(
    descriptor: &ModelDescriptor,
    task: Vec<TeamMessage>,
) -> Result<TaskResult, BridgeError> {
    match descriptor.actor() {
        ActorHandle::Agent(agent) => agent.run(task).await,
        ActorHandle::Team(team) => team.run(task).await,
        ActorHandle::Blueprint(bp) => bp.build()?.run(task).await,
    }
}

/// 流式执行：返回实时轮事件接收端，末尾必有一个终止标记
///
/// 蓝图构建失败（UnsupportedActor 等）同步返回错误；运行期失败只会提前
/// 出现终止标记，流仍然正常收尾。
pub async fn run_streaming(
    descriptor: &ModelDescriptor,
    task: Vec<TeamMessage>,
) -> Result<mpsc::UnboundedReceiver<TurnEvent>, BridgeError> {
    match descriptor.actor() {
        ActorHandle::Agent(agent) => {
            // 回落：非流式调用合成一条消息 + 终止标记
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(async move {
                match agent.run(task).await {
                    Ok(result) => {
                        for ev in result_history(&result) {
                            if tx.send(ev).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => tracing::warn!("agent '{}' run failed: {}", agent.name(), e),
                }
                let _ = tx.send(TurnEvent::final_marker());
            });
            Ok(rx)
        }
        ActorHandle::Team(team) => Ok(forward_team_stream(team.run_stream(task))),
        ActorHandle::Blueprint(bp) => {
            let team = std::sync::Arc::new(bp.build()?);
            Ok(forward_team_stream(team.run_stream(task)))
        }
    }
}

/// 把团队的原生条目流映射为轮事件流：消息一对一，最终结果折叠为终止标记
fn forward_team_stream(
    mut items: mpsc::UnboundedReceiver<RunItem>,
) -> mpsc::UnboundedReceiver<TurnEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(item) = items.recv().await {
            let event = match item {
                RunItem::Message(m) => TurnEvent::from(&m),
                RunItem::Result(_) => TurnEvent::final_marker(),
            };
            let terminal = event.is_final;
            if tx.send(event).is_err() || terminal {
                return;
            }
        }
        // 生产端异常退出没发最终结果：仍补一个终止标记，让渲染端正常收尾
        let _ = tx.send(TurnEvent::final_marker());
    });
    rx
}

/// 聚合执行：对注册表中每个模型各跑一遍同一任务，按模型名排序保证输出稳定
pub async fn run_all(
    registry: &ModelRegistry,
    task: Vec<TeamMessage>,
) -> Vec<(std::sync::Arc<ModelDescriptor>, Result<TaskResult, BridgeError>)> {
    let mut descriptors = registry.descriptors();
    descriptors.sort_by(|a, b| a.name.cmp(&b.name));

    let mut outcomes = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let result = run(&descriptor, task.clone()).await;
        if let Err(e) = &result {
            tracing::warn!("aggregate run of '{}' failed: {}", descriptor.name, e);
        }
        outcomes.push((descriptor, result));
    }
    outcomes
}
