//! 终止条件：决定团队对话何时结束
//!
//! 叶子为字面量条件（文本提及 / 最大消息数），All / Any 可递归组合。
//! 注册表在注册时深度优先展平整棵树，收集所有字面量终止文本作为输出清洗的哨兵。

use serde::{Deserialize, Serialize};

/// 终止条件树（蓝图 JSON 中以 tagged 形式出现）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminationCondition {
    /// 最近一条消息包含指定文本时停止
    TextMention { text: String },
    /// 本次运行产生的消息数达到上限时停止
    MaxMessages { max: usize },
    /// 所有子条件同时满足时停止
    All { conditions: Vec<TerminationCondition> },
    /// 任一子条件满足时停止
    Any { conditions: Vec<TerminationCondition> },
}

impl TerminationCondition {
    /// 便捷构造：文本提及
    pub fn text_mention(text: impl Into<String>) -> Self {
        Self::TextMention { text: text.into() }
    }

    /// 便捷构造：最大消息数
    pub fn max_messages(max: usize) -> Self {
        Self::MaxMessages { max }
    }

    /// 深度优先展平：收集树中所有字面量终止文本（组合条件递归拆开）
    pub fn termination_texts(&self) -> Vec<String> {
        let mut texts = Vec::new();
        self.collect_texts(&mut texts);
        texts
    }

    fn collect_texts(&self, out: &mut Vec<String>) {
        match self {
            Self::TextMention { text } => out.push(text.clone()),
            Self::MaxMessages { .. } => {}
            Self::All { conditions } | Self::Any { conditions } => {
                for cond in conditions {
                    cond.collect_texts(out);
                }
            }
        }
    }

    /// 判断是否应停止：produced 为本次运行已产生的消息数，last 为最近一条消息内容
    pub fn should_stop(&self, produced: usize, last: &str) -> bool {
        match self {
            Self::TextMention { text } => last.contains(text.as_str()),
            Self::MaxMessages { max } => produced >= *max,
            Self::All { conditions } => conditions.iter().all(|c| c.should_stop(produced, last)),
            Self::Any { conditions } => conditions.iter().any(|c| c.should_stop(produced, last)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_nested_composites() {
        let cond = TerminationCondition::Any {
            conditions: vec![
                TerminationCondition::text_mention("TERMINATE"),
                TerminationCondition::All {
                    conditions: vec![
                        TerminationCondition::max_messages(10),
                        TerminationCondition::text_mention("APPROVED"),
                    ],
                },
            ],
        };
        assert_eq!(cond.termination_texts(), vec!["TERMINATE", "APPROVED"]);
    }

    #[test]
    fn test_max_messages_has_no_text() {
        let cond = TerminationCondition::max_messages(5);
        assert!(cond.termination_texts().is_empty());
    }

    #[test]
    fn test_should_stop_text_mention() {
        let cond = TerminationCondition::text_mention("TERMINATE");
        assert!(cond.should_stop(1, "好的，完成。TERMINATE"));
        assert!(!cond.should_stop(1, "还没结束"));
    }

    #[test]
    fn test_should_stop_any_composite() {
        let cond = TerminationCondition::Any {
            conditions: vec![
                TerminationCondition::text_mention("DONE"),
                TerminationCondition::max_messages(3),
            ],
        };
        assert!(!cond.should_stop(1, "继续"));
        assert!(cond.should_stop(3, "继续"));
        assert!(cond.should_stop(1, "DONE"));
    }

    #[test]
    fn test_blueprint_json_roundtrip() {
        let json = r#"{"type":"any","conditions":[
            {"type":"text_mention","text":"TERMINATE"},
            {"type":"max_messages","max":20}
        ]}"#;
        let cond: TerminationCondition = serde_json::from_str(json).unwrap();
        assert_eq!(cond.termination_texts(), vec!["TERMINATE"]);
        assert!(cond.should_stop(20, ""));
    }
}
