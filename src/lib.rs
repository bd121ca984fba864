//! Hive - Rust 多智能体 OpenAI 兼容网关
//!
//! 模块划分：
//! - **actor**: 可注册的对话执行体（单 Agent / 轮询团队 / 蓝图）与终止条件
//! - **api**: 线上协议类型与 HTTP 路由（chat completions / models / health）
//! - **bridge**: 响应桥接核心（轮事件、选择、清洗、用量、流式状态机）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **error**: 桥接层错误类型
//! - **keys**: API Key 到可用模型名单的映射
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **registry**: 模型注册表（名字 -> 角色描述符）
//! - **session**: 会话历史存储（内存 / 文件）

pub mod actor;
pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod keys;
pub mod llm;
pub mod registry;
pub mod session;

pub use error::BridgeError;
pub use registry::{ModelRegistry, TOTAL_MODELS_NAME};
