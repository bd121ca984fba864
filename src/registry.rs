//! 模型注册表：把名字映射到角色描述符
//!
//! 注册支持直接实例与惰性构造器两种方式；注册时会检查保留名与选择配置，
//! 再检视角色的终止条件树做哨兵发现（构造器注册会临时构建一个实例，读完即弃，
//! 角色构造不得有外部可见副作用）。注册在启动期单写完成，服务期只读。

use std::collections::HashMap;
use std::sync::Arc;

use crate::actor::ActorHandle;
use crate::bridge::Selection;
use crate::error::BridgeError;

/// 保留聚合名：key manager 的"全部模型"通配，也可作为请求模型名触发逐模型聚合运行
pub const TOTAL_MODELS_NAME: &str = "*all models*";

/// 惰性角色构造器
pub type ActorBuilder = Arc<dyn Fn() -> ActorHandle + Send + Sync>;

/// 角色描述符：注册后不可变
pub struct ModelDescriptor {
    pub name: String,
    pub builder: ActorBuilder,
    pub selection: Selection,
    /// 注册时从终止条件树展平得到的哨兵
    pub termination_texts: Vec<String>,
}

impl ModelDescriptor {
    /// 为本次请求取得角色实例
    pub fn actor(&self) -> ActorHandle {
        (self.builder)()
    }
}

/// 注册表：名字 -> 描述符；同名重注册覆盖旧项
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<ModelDescriptor>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_name(name: &str) -> Result<(), BridgeError> {
        if name == TOTAL_MODELS_NAME {
            return Err(BridgeError::InvalidName(format!(
                "'{}' is reserved for the all-models aggregate",
                TOTAL_MODELS_NAME
            )));
        }
        Ok(())
    }

    /// 注册一个现成实例；名字与选择配置检查先于任何角色检视
    pub fn register(
        &mut self,
        name: &str,
        actor: ActorHandle,
        source_select: Option<&str>,
        output_idx: Option<usize>,
    ) -> Result<(), BridgeError> {
        Self::check_name(name)?;
        let selection = Selection::resolve(source_select, output_idx)?;
        let termination_texts = actor.termination_texts();

        let builder: ActorBuilder = Arc::new(move || actor.clone());
        self.insert(name, builder, selection, termination_texts);
        Ok(())
    }

    /// 注册一个惰性构造器；检查通过后临时构建一次实例做哨兵发现
    pub fn register_builder(
        &mut self,
        name: &str,
        builder: ActorBuilder,
        source_select: Option<&str>,
        output_idx: Option<usize>,
    ) -> Result<(), BridgeError> {
        Self::check_name(name)?;
        let selection = Selection::resolve(source_select, output_idx)?;
        // 一次性实例只为读取终止条件
        let probe = builder();
        let termination_texts = probe.termination_texts();
        drop(probe);

        self.insert(name, builder, selection, termination_texts);
        Ok(())
    }

    fn insert(
        &mut self,
        name: &str,
        builder: ActorBuilder,
        selection: Selection,
        termination_texts: Vec<String>,
    ) {
        // 哨兵去重，保留首次出现的顺序
        let mut texts: Vec<String> = Vec::with_capacity(termination_texts.len());
        for t in termination_texts {
            if !texts.contains(&t) {
                texts.push(t);
            }
        }
        let termination_texts = texts;

        if self.models.contains_key(name) {
            tracing::info!("model '{}' re-registered, overwriting", name);
        }
        self.models.insert(
            name.to_string(),
            Arc::new(ModelDescriptor {
                name: name.to_string(),
                builder,
                selection,
                termination_texts,
            }),
        );
    }

    /// 按名解析描述符
    pub fn resolve(&self, name: &str) -> Result<Arc<ModelDescriptor>, BridgeError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(name.to_string()))
    }

    /// 所有已注册名字（顺序无保证）
    pub fn list(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// 所有描述符（聚合运行用）
    pub fn descriptors(&self) -> Vec<Arc<ModelDescriptor>> {
        self.models.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{AssistantAgent, RoundRobinTeam, TerminationCondition};
    use crate::llm::MockLlmClient;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn mock_team(termination: TerminationCondition) -> ActorHandle {
        let agent = AssistantAgent::new("writer", "p", Arc::new(MockLlmClient::new()));
        ActorHandle::Team(Arc::new(RoundRobinTeam::new("t", vec![agent], termination)))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ModelRegistry::new();
        registry
            .register("team-a", mock_team(TerminationCondition::text_mention("STOP")), None, None)
            .unwrap();

        let descriptor = registry.resolve("team-a").unwrap();
        assert_eq!(descriptor.name, "team-a");
        assert_eq!(descriptor.selection, Selection::Offset(0));
        assert_eq!(descriptor.termination_texts, vec!["STOP"]);
    }

    #[test]
    fn test_resolve_unknown_not_found() {
        let registry = ModelRegistry::new();
        assert!(matches!(
            registry.resolve("missing"),
            Err(BridgeError::NotFound(_))
        ));
    }

    #[test]
    fn test_reserved_name_rejected_before_construction() {
        let mut registry = ModelRegistry::new();
        let constructed = Arc::new(AtomicBool::new(false));
        let flag = constructed.clone();
        let builder: ActorBuilder = Arc::new(move || {
            flag.store(true, Ordering::SeqCst);
            mock_team(TerminationCondition::max_messages(1))
        });

        let err = registry
            .register_builder(TOTAL_MODELS_NAME, builder, None, None)
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidName(_)));
        // 名字检查必须先于任何角色构建
        assert!(!constructed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_both_selection_modes_rejected() {
        let mut registry = ModelRegistry::new();
        let err = registry
            .register(
                "team-a",
                mock_team(TerminationCondition::max_messages(1)),
                Some("writer"),
                Some(1),
            )
            .unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
        assert!(registry.resolve("team-a").is_err());
    }

    #[test]
    fn test_builder_probe_discovers_sentinels() {
        let mut registry = ModelRegistry::new();
        let builder: ActorBuilder =
            Arc::new(|| mock_team(TerminationCondition::text_mention("FINISHED")));
        registry
            .register_builder("lazy-team", builder, Some("writer"), None)
            .unwrap();

        let descriptor = registry.resolve("lazy-team").unwrap();
        assert_eq!(descriptor.termination_texts, vec!["FINISHED"]);
        assert_eq!(descriptor.selection, Selection::Source("writer".to_string()));
    }

    #[test]
    fn test_reregistration_overwrites() {
        let mut registry = ModelRegistry::new();
        registry
            .register("team-a", mock_team(TerminationCondition::text_mention("OLD")), None, None)
            .unwrap();
        registry
            .register("team-a", mock_team(TerminationCondition::text_mention("NEW")), None, None)
            .unwrap();

        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.resolve("team-a").unwrap().termination_texts, vec!["NEW"]);
    }
}
