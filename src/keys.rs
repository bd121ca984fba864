//! API Key 管理：key 到可用模型名单的映射
//!
//! NonKeyManager 不做鉴权（所有 key 都放行全部模型）；MemoryKeyManager 在内存
//! 中维护显式名单。名单中出现保留聚合名即视为放行全部模型。

use std::collections::HashMap;
use std::sync::RwLock;

use crate::registry::TOTAL_MODELS_NAME;

/// Key 管理器：返回该 key 可用的模型名单
pub trait KeyManager: Send + Sync {
    fn get_allow_models(&self, api_key: &str) -> Vec<String>;

    /// 判断 key 是否可用指定模型（名单含聚合通配即全放行）
    fn is_allowed(&self, api_key: &str, model: &str) -> bool {
        self.get_allow_models(api_key)
            .iter()
            .any(|m| m == TOTAL_MODELS_NAME || m == model)
    }
}

/// 不鉴权：任何 key 都放行全部模型
#[derive(Debug, Default)]
pub struct NonKeyManager;

impl KeyManager for NonKeyManager {
    fn get_allow_models(&self, _api_key: &str) -> Vec<String> {
        vec![TOTAL_MODELS_NAME.to_string()]
    }
}

/// 内存 key 管理器：key -> 模型名单
#[derive(Default)]
pub struct MemoryKeyManager {
    keys: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryKeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 给 key 追加一个可用模型
    pub fn set_allow_model(&self, api_key: &str, model: &str) {
        let mut keys = match self.keys.write() {
            Ok(k) => k,
            Err(poisoned) => poisoned.into_inner(),
        };
        let models = keys.entry(api_key.to_string()).or_default();
        if !models.iter().any(|m| m == model) {
            models.push(model.to_string());
        }
    }
}

impl KeyManager for MemoryKeyManager {
    fn get_allow_models(&self, api_key: &str) -> Vec<String> {
        let keys = match self.keys.read() {
            Ok(k) => k,
            Err(poisoned) => poisoned.into_inner(),
        };
        keys.get(api_key).cloned().unwrap_or_default()
    }
}
