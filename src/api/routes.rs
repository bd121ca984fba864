//! HTTP 路由：chat-completion 兼容面
//!
//! POST /v1/chat/completions（stream=true 时走 SSE），GET /v1/models，GET /api/health。
//! 注册与查找错误作为带标签的 JSON 错误体返回；选择类异常在桥接层内部兜底，
//! 不会走到这里。

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::StreamExt;
use serde::Serialize;

use crate::api::types::{
    convert_messages, ChatCompletionRequest, ChatMessage, ModelListResponse, ModelResponse,
};
use crate::bridge::{
    adapter, build_completion_response, render_stream, RenderSession, RenderedRun, StreamFrame,
};
use crate::error::BridgeError;
use crate::keys::KeyManager;
use crate::registry::{ModelRegistry, TOTAL_MODELS_NAME};
use crate::session::SessionStore;

/// 路由共享状态：注册表只读，注册在启动期完成
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub sessions: Arc<dyn SessionStore>,
    pub keys: Arc<dyn KeyManager>,
    /// 请求未带 model 时的缺省模型名
    pub default_model: String,
}

/// 带标签的错误响应体
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    kind: String,
}

/// 路由层错误：状态码 + 错误体
pub struct ApiError {
    status: StatusCode,
    message: String,
    kind: &'static str,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            kind,
        }
    }

    fn from_bridge(err: BridgeError) -> Self {
        let (status, kind) = match &err {
            BridgeError::NotFound(_) => (StatusCode::NOT_FOUND, "model_not_found"),
            BridgeError::InvalidName(_) | BridgeError::Config(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            BridgeError::UnsupportedActor(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "unsupported_actor")
            }
            BridgeError::Llm(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            BridgeError::IndexOutOfRange { .. } | BridgeError::EmptySelection(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "selection_error")
            }
        };
        Self::new(status, kind, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: ErrorDetail {
                    message: self.message,
                    kind: self.kind.to_string(),
                },
            }),
        )
            .into_response()
    }
}

/// 构建路由
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(state)
}

/// 从 Authorization: Bearer 取 api key，缺失时为空串
fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or("")
}

/// POST /v1/chat/completions
async fn chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    let model_name = body
        .model
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| state.default_model.clone());

    let api_key = bearer_token(&headers);
    if !state.keys.is_allowed(api_key, &model_name) {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "permission_denied",
            format!("api key is not allowed to use model '{}'", model_name),
        ));
    }

    // 会话历史前置合并
    let mut merged: Vec<ChatMessage> = match &body.session_id {
        Some(sid) if !sid.is_empty() => state.sessions.get(sid).await.unwrap_or_default(),
        _ => Vec::new(),
    };
    merged.extend(body.messages.iter().cloned());
    let task = convert_messages(&merged);

    tracing::info!(
        "chat completion: model={} stream={} input_turns={}",
        model_name,
        body.stream,
        task.len()
    );

    // 保留聚合名：逐模型运行，每个结果一个 choice
    if model_name == TOTAL_MODELS_NAME {
        if body.stream {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "streaming is not supported for the all-models aggregate",
            ));
        }
        let runs: Vec<RenderedRun> = adapter::run_all(&state.registry, task)
            .await
            .into_iter()
            .map(|(descriptor, result)| RenderedRun { descriptor, result })
            .collect();
        if runs.is_empty() {
            return Err(ApiError::new(
                StatusCode::NOT_FOUND,
                "model_not_found",
                "no models registered",
            ));
        }
        let response = build_completion_response(&model_name, &runs);
        return Ok(Json(response).into_response());
    }

    let descriptor = state
        .registry
        .resolve(&model_name)
        .map_err(ApiError::from_bridge)?;

    if body.stream {
        // 团队流会回显任务输入，跳过前 task.len() 条；单 Agent 回落序列不回显
        let skip = if descriptor.actor().echoes_task_input() {
            task.len()
        } else {
            0
        };
        let events = adapter::run_streaming(&descriptor, task)
            .await
            .map_err(ApiError::from_bridge)?;

        let session = RenderSession::new(&model_name);
        let frames = render_stream(
            session,
            descriptor.selection.clone(),
            descriptor.termination_texts.clone(),
            skip,
            events,
        );
        let sse = frames.map(|frame| {
            let data = match frame {
                StreamFrame::Chunk(chunk) => {
                    serde_json::to_string(&chunk).unwrap_or_else(|_| "{}".to_string())
                }
                StreamFrame::Done => "[DONE]".to_string(),
            };
            Ok::<Event, Infallible>(Event::default().data(data))
        });
        return Ok(Sse::new(sse).keep_alive(KeepAlive::default()).into_response());
    }

    let result = adapter::run(&descriptor, task)
        .await
        .map_err(ApiError::from_bridge)?;
    let runs = [RenderedRun {
        descriptor,
        result: Ok(result),
    }];
    let response = build_completion_response(&model_name, &runs);

    // 回写会话：输入 + 选中的回答
    if let Some(sid) = body.session_id.as_deref().filter(|s| !s.is_empty()) {
        if let Some(choice) = response.choices.first() {
            merged.push(choice.message.clone());
        }
        state.sessions.set(sid, merged).await;
    }

    Ok(Json(response).into_response())
}

/// GET /v1/models：注册表中的全部模型
async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelListResponse> {
    let mut names = state.registry.list();
    names.sort();
    Json(ModelListResponse {
        object: "list".to_string(),
        data: names
            .into_iter()
            .map(|name| ModelResponse {
                id: name,
                object: "model".to_string(),
                created: 0,
                owned_by: "hive".to_string(),
            })
            .collect(),
    })
}
