//! 请求级 token 用量累计
//!
//! 每个渲染会话持有一份，从零开始逐事件折叠；total 恒等于 prompt + completion。

use crate::api::types::UsageInfo;
use crate::bridge::TurnEvent;

/// 单请求的用量合计（单调不减）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl UsageTotals {
    pub fn fold(&mut self, prompt: u64, completion: u64) {
        self.prompt_tokens += prompt;
        self.completion_tokens += completion;
        self.total_tokens += prompt + completion;
    }

    pub fn fold_event(&mut self, ev: &TurnEvent) {
        self.fold(ev.prompt_tokens, ev.completion_tokens);
    }

    /// 合并另一份合计（聚合多结果时求和）
    pub fn merge(&mut self, other: &UsageTotals) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }

    pub fn to_wire(&self) -> UsageInfo {
        UsageInfo {
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            total_tokens: self.total_tokens,
        }
    }
}
