//! 响应桥接层：把角色的内部对话事件渲染成对外协议
//!
//! - **event**: 统一轮事件
//! - **usage**: 请求级 token 用量累计
//! - **selection**: 选择哪一轮作为对外回答
//! - **sanitize**: 清洗终止哨兵与控制标记
//! - **adapter**: 把三种角色形态归一成轮事件序列
//! - **stream**: 流式渲染状态机（协议 chunk + [DONE]）
//! - **response**: 非流式单响应构建

pub mod adapter;
pub mod event;
pub mod response;
pub mod sanitize;
pub mod selection;
pub mod stream;
pub mod usage;

pub use event::TurnEvent;
pub use response::{build_completion_response, RenderedRun};
pub use sanitize::clean;
pub use selection::{select_text, Selection};
pub use stream::{render_stream, RenderSession, StreamFrame};
pub use usage::UsageTotals;

/// 选择失败（越界 / 无匹配来源 / 运行失败）时的兜底文案
pub const FALLBACK_TEXT: &str = "something went wrong, please try again";
/// 最终文本清洗后为空时的替代文案
pub const EMPTY_RESPONSE_TEXT: &str = "no response";
