//! 桥接层错误类型
//!
//! `BridgeError` 覆盖模型解析、蓝图/配置、团队构建、选择与上游 LLM 调用等失败场景。
//! HTTP 层再将其映射为对应的状态码与错误类别（见 `api::routes`）。

use thiserror::Error;

use crate::llm::LlmError;

/// 桥接层统一错误类型
#[derive(Error, Debug)]
pub enum BridgeError {
    /// 请求的模型名不存在于注册表
    #[error("model not found: {0}")]
    NotFound(String),

    /// 模型名非法（格式/命名约束不满足）
    #[error("invalid model name: {0}")]
    InvalidName(String),

    /// 配置或蓝图不合法
    #[error("config error: {0}")]
    Config(String),

    /// 不支持的 actor / 组件类型
    #[error("unsupported actor: {0}")]
    UnsupportedActor(String),

    /// 上游 LLM 调用失败
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    /// 选择偏移超出可用轮次范围
    #[error("selection index out of range: index {index}, len {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// 指定来源没有可用的输出
    #[error("empty selection for source: {0}")]
    EmptySelection(String),
}
