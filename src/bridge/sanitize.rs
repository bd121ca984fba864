//! 输出清洗：从可见文本中删掉终止哨兵与控制标记
//!
//! 删除顺序：注册表发现的哨兵在前，两个内置默认（终止关键字与一对推理标记）在后。
//! 纯子串删除而非正则，重叠/残缺的片段不会被改写；幂等。

/// 内置终止关键字
pub const TERMINATION_KEYWORD: &str = "TERMINATE";
/// 内置推理开标记
pub const REASONING_OPEN: &str = "<think>";
/// 内置推理闭标记
pub const REASONING_CLOSE: &str = "</think>";

/// 删除 sentinels 与内置标记的所有字面量出现，最后去掉首尾空白
pub fn clean(text: &str, sentinels: &[String]) -> String {
    let mut out = text.to_string();
    for sentinel in sentinels {
        if !sentinel.is_empty() {
            out = out.replace(sentinel.as_str(), "");
        }
    }
    for builtin in [TERMINATION_KEYWORD, REASONING_OPEN, REASONING_CLOSE] {
        out = out.replace(builtin, "");
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_builtin_keyword() {
        assert_eq!(clean("完成了。TERMINATE", &[]), "完成了。");
    }

    #[test]
    fn test_strips_reasoning_markers() {
        assert_eq!(
            clean("<think>先想一想</think>答案是 42", &[]),
            "先想一想答案是 42"
        );
    }

    #[test]
    fn test_strips_registry_sentinels_everywhere() {
        let sentinels = vec!["APPROVED".to_string()];
        assert_eq!(clean("APPROVED 好的 APPROVED", &sentinels), "好的");
    }

    #[test]
    fn test_idempotent() {
        let sentinels = vec!["DONE".to_string()];
        let once = clean("text DONE more TERMINATE", &sentinels);
        let twice = clean(&once, &sentinels);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_partial_match_untouched() {
        // "TERMINAT" 不是完整哨兵，不应被删除
        assert_eq!(clean("TERMINAT", &[]), "TERMINAT");
    }

    #[test]
    fn test_empty_sentinel_ignored() {
        let sentinels = vec![String::new()];
        assert_eq!(clean("原样", &sentinels), "原样");
    }
}
