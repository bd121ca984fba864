//! 团队蓝图：存储的 JSON 配置，执行时构建团队
//!
//! 蓝图文件须含 provider / component_type / version / description / label 五个字段，
//! 目录扫描时以文件名（去扩展名）作为注册名。component_type 不被支持时没有可用的
//! 运行入口，构建报 UnsupportedActor。

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::actor::{AssistantAgent, RoundRobinTeam, TerminationCondition};
use crate::error::BridgeError;
use crate::llm::LlmClient;

/// 蓝图必填字段
const REQUIRED_FIELDS: [&str; 5] = ["provider", "component_type", "version", "description", "label"];

/// 团队蓝图（JSON 配置的反序列化形态）
#[derive(Debug, Clone, Deserialize)]
pub struct TeamBlueprint {
    pub provider: String,
    pub component_type: String,
    pub version: u32,
    pub description: String,
    pub label: String,
    #[serde(default)]
    pub participants: Vec<ParticipantSpec>,
    #[serde(default)]
    pub termination: Option<TerminationCondition>,
}

/// 蓝图中的参与者
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantSpec {
    pub name: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl TeamBlueprint {
    /// 从 JSON 值构建：先校验必填字段（缺失的全部列出），再反序列化
    pub fn from_value(value: serde_json::Value) -> Result<Self, BridgeError> {
        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .filter(|f| value.get(**f).is_none())
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(BridgeError::Config(format!(
                "blueprint missing required fields: {}",
                missing.join(", ")
            )));
        }
        serde_json::from_value(value)
            .map_err(|e| BridgeError::Config(format!("invalid blueprint: {}", e)))
    }
}

/// 蓝图角色：持有配置与 LLM 后端，执行时构建团队
pub struct BlueprintActor {
    blueprint: TeamBlueprint,
    llm: Arc<dyn LlmClient>,
}

impl BlueprintActor {
    pub fn new(blueprint: TeamBlueprint, llm: Arc<dyn LlmClient>) -> Self {
        Self { blueprint, llm }
    }

    pub fn blueprint(&self) -> &TeamBlueprint {
        &self.blueprint
    }

    /// 不构建实例即可读取终止文本（配置里就有终止条件树）
    pub fn termination_texts(&self) -> Vec<String> {
        self.blueprint
            .termination
            .as_ref()
            .map(|t| t.termination_texts())
            .unwrap_or_default()
    }

    /// 按配置构建团队；未知 component_type 报 UnsupportedActor
    pub fn build(&self) -> Result<RoundRobinTeam, BridgeError> {
        match self.blueprint.component_type.as_str() {
            "round_robin_group_chat" | "team" => {
                if self.blueprint.participants.is_empty() {
                    return Err(BridgeError::Config(format!(
                        "blueprint '{}' has no participants",
                        self.blueprint.label
                    )));
                }
                let agents = self
                    .blueprint
                    .participants
                    .iter()
                    .map(|p| {
                        AssistantAgent::new(
                            &p.name,
                            p.system_prompt.as_deref().unwrap_or("You are a helpful assistant."),
                            self.llm.clone(),
                        )
                    })
                    .collect();
                let termination = self
                    .blueprint
                    .termination
                    .clone()
                    .unwrap_or_else(|| TerminationCondition::max_messages(20));
                Ok(RoundRobinTeam::new(&self.blueprint.label, agents, termination))
            }
            other => Err(BridgeError::UnsupportedActor(format!(
                "component_type '{}' has no usable run entry point",
                other
            ))),
        }
    }
}

/// 递归扫描目录下的 *.json 蓝图，返回 (文件名去扩展名, 蓝图) 列表；坏文件记日志跳过
pub fn load_blueprints(
    dir: &Path,
    llm: &Arc<dyn LlmClient>,
) -> Vec<(String, BlueprintActor)> {
    let mut loaded = Vec::new();
    collect_blueprint_files(dir, llm, &mut loaded);
    tracing::info!("loaded {} team blueprints from {}", loaded.len(), dir.display());
    loaded
}

fn collect_blueprint_files(
    dir: &Path,
    llm: &Arc<dyn LlmClient>,
    out: &mut Vec<(String, BlueprintActor)>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("cannot read blueprint dir {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_blueprint_files(&path, llm, out);
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let name = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| BridgeError::Config(e.to_string()))
            .and_then(|raw| {
                serde_json::from_str::<serde_json::Value>(&raw)
                    .map_err(|e| BridgeError::Config(format!("invalid JSON: {}", e)))
            })
            .and_then(TeamBlueprint::from_value);

        match parsed {
            Ok(bp) => {
                tracing::info!("loaded blueprint '{}' from {}", name, path.display());
                out.push((name, BlueprintActor::new(bp, llm.clone())));
            }
            Err(e) => tracing::warn!("skipping blueprint {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use std::io::Write;

    fn mock_llm() -> Arc<dyn LlmClient> {
        Arc::new(MockLlmClient::new())
    }

    fn valid_blueprint_json() -> serde_json::Value {
        serde_json::json!({
            "provider": "hive",
            "component_type": "round_robin_group_chat",
            "version": 1,
            "description": "写作-编辑二人组",
            "label": "writing_team",
            "participants": [
                {"name": "writer", "system_prompt": "你负责写作"},
                {"name": "editor"}
            ],
            "termination": {"type": "text_mention", "text": "TERMINATE"}
        })
    }

    #[test]
    fn test_missing_fields_all_listed() {
        let err = TeamBlueprint::from_value(serde_json::json!({"provider": "hive"})).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("component_type"));
        assert!(msg.contains("label"));
        assert!(!msg.contains("provider,"));
    }

    #[test]
    fn test_build_round_robin_team() {
        let bp = TeamBlueprint::from_value(valid_blueprint_json()).unwrap();
        let actor = BlueprintActor::new(bp, mock_llm());
        assert_eq!(actor.termination_texts(), vec!["TERMINATE"]);
        let team = actor.build().unwrap();
        assert_eq!(team.name(), "writing_team");
    }

    #[test]
    fn test_unknown_component_type_unsupported() {
        let mut value = valid_blueprint_json();
        value["component_type"] = serde_json::json!("society_of_mind");
        let bp = TeamBlueprint::from_value(value).unwrap();
        let err = BlueprintActor::new(bp, mock_llm()).build().unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedActor(_)));
    }

    #[test]
    fn test_load_blueprints_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).unwrap();

        let mut f = std::fs::File::create(sub.join("writing_team.json")).unwrap();
        write!(f, "{}", valid_blueprint_json()).unwrap();
        // 非 JSON 与坏 JSON 均应被跳过
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let llm = mock_llm();
        let loaded = load_blueprints(dir.path(), &llm);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, "writing_team");
    }
}
