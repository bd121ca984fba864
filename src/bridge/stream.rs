//! 流式渲染状态机
//!
//! 帧顺序固定：先发角色声明 chunk（即使角色零轮输出，传输端也能看到合法开场帧），
//! 再逐事件发来源前缀的内容 chunk（不缓冲、不重排），遇到终止标记时对收齐的
//! 历史做选择 + 清洗并作为最后一个内容 chunk 发出，然后是带用量的收尾 chunk
//! 与 [DONE] 传输哨兵。消费端断开即丢弃整个状态机，事件源随之停止。

use futures_util::stream::{self, Stream};
use tokio::sync::mpsc;

use crate::api::types::{new_request_id, now_epoch_secs, ChatCompletionStreamResponse};
use crate::bridge::sanitize::clean;
use crate::bridge::selection::{select_text, Selection};
use crate::bridge::usage::UsageTotals;
use crate::bridge::{TurnEvent, EMPTY_RESPONSE_TEXT, FALLBACK_TEXT};

/// 渲染一帧：协议 chunk，或流结束哨兵
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Chunk(ChatCompletionStreamResponse),
    /// 传输层的流结束标记，序列化为字面量 [DONE]
    Done,
}

/// 每请求的渲染会话状态
#[derive(Debug, Clone)]
pub struct RenderSession {
    pub request_id: String,
    pub model: String,
    pub created: i64,
    pub emitted_any_content: bool,
}

impl RenderSession {
    pub fn new(model: &str) -> Self {
        Self {
            request_id: new_request_id(),
            model: model.to_string(),
            created: now_epoch_secs(),
            emitted_any_content: false,
        }
    }
}

#[derive(Clone, Copy)]
enum State {
    Init,
    /// 已发角色声明，正在消费事件；seen 统计已到达的中间事件数（用于跳过输入回显）
    Streaming { seen: usize },
    /// 已发最终内容，下一帧是收尾 chunk
    Finishing,
    /// 已发收尾 chunk，下一帧是 [DONE]
    Terminating,
    Closed,
}

struct RenderCtx {
    session: RenderSession,
    selection: Selection,
    sentinels: Vec<String>,
    skip: usize,
    events: mpsc::UnboundedReceiver<TurnEvent>,
    turns: Vec<TurnEvent>,
    usage: UsageTotals,
    state: State,
}

impl RenderCtx {
    fn chunk(&self, frame: ChatCompletionStreamResponse) -> StreamFrame {
        StreamFrame::Chunk(frame)
    }

    /// 终止标记到达（或事件源提前关闭）时计算最终可见文本
    fn final_text(&self) -> String {
        let selected = match select_text(&self.turns, &self.selection) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "selection failed for request {}: {}, substituting fallback",
                    self.session.request_id,
                    e
                );
                return FALLBACK_TEXT.to_string();
            }
        };
        let cleaned = clean(&selected, &self.sentinels);
        if cleaned.trim().is_empty() {
            EMPTY_RESPONSE_TEXT.to_string()
        } else {
            cleaned
        }
    }
}

/// 构建流式渲染器：消费轮事件、产出有序协议帧
pub fn render_stream(
    session: RenderSession,
    selection: Selection,
    sentinels: Vec<String>,
    skip: usize,
    events: mpsc::UnboundedReceiver<TurnEvent>,
) -> impl Stream<Item = StreamFrame> + Send {
    let ctx = RenderCtx {
        session,
        selection,
        sentinels,
        skip,
        events,
        turns: Vec::new(),
        usage: UsageTotals::default(),
        state: State::Init,
    };

    stream::unfold(ctx, |mut ctx| async move {
        loop {
            match ctx.state {
                State::Init => {
                    ctx.state = State::Streaming { seen: 0 };
                    let frame = ctx.chunk(ChatCompletionStreamResponse::role_announce(
                        &ctx.session.request_id,
                        ctx.session.created,
                        &ctx.session.model,
                    ));
                    return Some((frame, ctx));
                }
                State::Streaming { seen } => {
                    match ctx.events.recv().await {
                        Some(ev) if !ev.is_final => {
                            ctx.usage.fold_event(&ev);
                            let text = ev.text().to_string();
                            let source = ev.source.clone();
                            ctx.turns.push(ev);
                            ctx.state = State::Streaming { seen: seen + 1 };
                            // 跳过输入回显与空轮次，其余一事件一 chunk、严格保序
                            if seen < ctx.skip || text.trim().is_empty() {
                                continue;
                            }
                            ctx.session.emitted_any_content = true;
                            let frame = ctx.chunk(ChatCompletionStreamResponse::content_delta(
                                &ctx.session.request_id,
                                ctx.session.created,
                                &ctx.session.model,
                                format!("{}: {}\n", source, text),
                            ));
                            return Some((frame, ctx));
                        }
                        // 终止标记，或生产端提前关闭：都进入收尾，保证流干净闭合
                        Some(_) | None => {
                            let text = ctx.final_text();
                            ctx.session.emitted_any_content = true;
                            ctx.state = State::Finishing;
                            let frame = ctx.chunk(ChatCompletionStreamResponse::content_delta(
                                &ctx.session.request_id,
                                ctx.session.created,
                                &ctx.session.model,
                                text,
                            ));
                            return Some((frame, ctx));
                        }
                    }
                }
                State::Finishing => {
                    ctx.state = State::Terminating;
                    let frame = ctx.chunk(ChatCompletionStreamResponse::finish(
                        &ctx.session.request_id,
                        ctx.session.created,
                        &ctx.session.model,
                        ctx.usage.to_wire(),
                    ));
                    return Some((frame, ctx));
                }
                State::Terminating => {
                    ctx.state = State::Closed;
                    return Some((StreamFrame::Done, ctx));
                }
                State::Closed => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn spawn_events(events: Vec<TurnEvent>) -> mpsc::UnboundedReceiver<TurnEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        for ev in events {
            tx.send(ev).unwrap();
        }
        rx
    }

    async fn collect(
        selection: Selection,
        sentinels: Vec<String>,
        skip: usize,
        events: Vec<TurnEvent>,
    ) -> Vec<StreamFrame> {
        let session = RenderSession::new("test-model");
        render_stream(session, selection, sentinels, skip, spawn_events(events))
            .collect()
            .await
    }

    fn delta_content(frame: &StreamFrame) -> Option<String> {
        match frame {
            StreamFrame::Chunk(c) => c.choices[0].delta.content.clone(),
            StreamFrame::Done => None,
        }
    }

    #[tokio::test]
    async fn test_frame_envelope_role_then_finish_then_done() {
        let frames = collect(
            Selection::Offset(0),
            vec![],
            0,
            vec![
                TurnEvent::message("writer", "回答", 5, 2),
                TurnEvent::final_marker(),
            ],
        )
        .await;

        // 角色声明 + 内容 + 最终内容 + 收尾 + [DONE]
        assert_eq!(frames.len(), 5);
        match &frames[0] {
            StreamFrame::Chunk(c) => {
                assert_eq!(c.choices[0].delta.role.as_deref(), Some("assistant"));
                assert!(c.choices[0].delta.content.is_none());
            }
            _ => panic!("first frame must be role announce"),
        }
        match &frames[3] {
            StreamFrame::Chunk(c) => {
                assert_eq!(c.choices[0].finish_reason.as_deref(), Some("stop"));
                let usage = c.usage.expect("finish chunk carries usage");
                assert_eq!(usage.total_tokens, 7);
            }
            _ => panic!("fourth frame must be the finish chunk"),
        }
        assert_eq!(frames[4], StreamFrame::Done);
    }

    #[tokio::test]
    async fn test_zero_turn_actor_still_well_formed() {
        let frames = collect(Selection::Offset(0), vec![], 0, vec![TurnEvent::final_marker()]).await;

        // 角色声明 + 兜底内容 + 收尾 + [DONE]
        assert_eq!(frames.len(), 4);
        assert_eq!(delta_content(&frames[1]).unwrap(), FALLBACK_TEXT);
        assert_eq!(frames[3], StreamFrame::Done);
    }

    #[tokio::test]
    async fn test_skip_suppresses_input_echo() {
        let frames = collect(
            Selection::Offset(0),
            vec![],
            1,
            vec![
                TurnEvent::message("user", "问题", 0, 0),
                TurnEvent::message("writer", "回答", 4, 2),
                TurnEvent::final_marker(),
            ],
        )
        .await;

        let contents: Vec<String> = frames.iter().filter_map(delta_content).collect();
        // 回显被跳过，只有 writer 的中间 chunk 与最终内容
        assert_eq!(contents, vec!["writer: 回答\n".to_string(), "回答".to_string()]);
    }

    #[tokio::test]
    async fn test_chunks_keep_emission_order() {
        let frames = collect(
            Selection::Offset(0),
            vec![],
            0,
            vec![
                TurnEvent::message("a", "一", 0, 0),
                TurnEvent::message("b", "二", 0, 0),
                TurnEvent::message("c", "三", 0, 0),
                TurnEvent::final_marker(),
            ],
        )
        .await;

        let contents: Vec<String> = frames.iter().filter_map(delta_content).collect();
        assert_eq!(contents[..3], ["a: 一\n", "b: 二\n", "c: 三\n"]);
    }

    #[tokio::test]
    async fn test_final_text_sanitized_and_empty_substituted() {
        let frames = collect(
            Selection::Offset(0),
            vec!["APPROVED".to_string()],
            0,
            vec![
                TurnEvent::message("writer", "APPROVED TERMINATE", 0, 0),
                TurnEvent::final_marker(),
            ],
        )
        .await;

        let contents: Vec<String> = frames.iter().filter_map(delta_content).collect();
        // 清洗后为空，最终内容替换为 "no response"
        assert_eq!(contents.last().unwrap(), EMPTY_RESPONSE_TEXT);
    }

    #[tokio::test]
    async fn test_producer_abort_still_closes_cleanly() {
        // 事件源在发完一条消息后直接关闭，没有终止标记
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(TurnEvent::message("writer", "部分回答", 1, 1)).unwrap();
        drop(tx);

        let session = RenderSession::new("m");
        let frames: Vec<StreamFrame> =
            render_stream(session, Selection::Offset(0), vec![], 0, rx)
                .collect()
                .await;

        assert_eq!(*frames.last().unwrap(), StreamFrame::Done);
        let contents: Vec<String> = frames.iter().filter_map(delta_content).collect();
        assert_eq!(contents.last().unwrap(), "部分回答");
    }

    #[tokio::test]
    async fn test_request_id_shared_across_chunks() {
        let frames = collect(
            Selection::Offset(0),
            vec![],
            0,
            vec![
                TurnEvent::message("writer", "回答", 0, 0),
                TurnEvent::final_marker(),
            ],
        )
        .await;

        let ids: Vec<String> = frames
            .iter()
            .filter_map(|f| match f {
                StreamFrame::Chunk(c) => Some(c.id.clone()),
                StreamFrame::Done => None,
            })
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert!(ids[0].starts_with("chatcmpl-"));
    }
}
