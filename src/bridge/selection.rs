//! 选择策略：从完整轮次历史中挑出对外可见的回答
//!
//! 两种互斥模式：按来源匹配（取该来源最后一条非空轮次），或按末尾偏移
//! （0 = 最后一轮，不论来源）。注册时二者只能配置其一，都不配置时解析为偏移 0。

use crate::bridge::TurnEvent;
use crate::error::BridgeError;

/// 已解析的选择配置：恰好一种模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// 取指定来源最后一条非空（trim 后）轮次
    Source(String),
    /// 从末尾数第 offset 轮（0 = 最后一轮）
    Offset(usize),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Offset(0)
    }
}

impl Selection {
    /// 解析注册入参：source_select 与 output_idx 互斥，都缺省时取末尾一轮
    pub fn resolve(
        source_select: Option<&str>,
        output_idx: Option<usize>,
    ) -> Result<Self, BridgeError> {
        match (source_select, output_idx) {
            (Some(_), Some(_)) => Err(BridgeError::Config(
                "source_select and output_idx are mutually exclusive".to_string(),
            )),
            (Some(source), None) => Ok(Selection::Source(source.to_string())),
            (None, Some(idx)) => Ok(Selection::Offset(idx)),
            (None, None) => Ok(Selection::Offset(0)),
        }
    }
}

/// 按选择配置取出回答文本
///
/// turns 为中间轮次历史（不含终止标记）。来源匹配模式下后出现的非空匹配覆盖
/// 先出现的（防止来源在真正回答之后又发了一条空占位轮）；偏移越界与无匹配
/// 来源都返回错误，由调用方用兜底文案替代。
pub fn select_text(turns: &[TurnEvent], selection: &Selection) -> Result<String, BridgeError> {
    match selection {
        Selection::Source(source) => {
            let mut selected: Option<&TurnEvent> = None;
            for turn in turns {
                if turn.source == *source && !turn.text().trim().is_empty() {
                    selected = Some(turn);
                }
            }
            selected
                .map(|t| t.text().to_string())
                .ok_or_else(|| BridgeError::EmptySelection(source.clone()))
        }
        Selection::Offset(offset) => {
            if *offset >= turns.len() {
                return Err(BridgeError::IndexOutOfRange {
                    index: *offset,
                    len: turns.len(),
                });
            }
            Ok(turns[turns.len() - 1 - offset].text().to_string())
        }
    }
}
