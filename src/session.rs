//! 会话存储：按 session_id 保存对话历史
//!
//! 默认内存实现；file 后端每个会话一个 JSON 文件，重启后可恢复。
//! 桥接核心不感知会话，路由层在请求前加载历史、完成后回写。

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::api::types::ChatMessage;

/// 会话存储后端
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Option<Vec<ChatMessage>>;
    async fn set(&self, session_id: &str, messages: Vec<ChatMessage>);
    async fn delete(&self, session_id: &str);
}

/// 内存会话存储
#[derive(Default)]
pub struct InMemorySessionStore {
    inner: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Option<Vec<ChatMessage>> {
        self.inner.read().await.get(session_id).cloned()
    }

    async fn set(&self, session_id: &str, messages: Vec<ChatMessage>) {
        self.inner
            .write()
            .await
            .insert(session_id.to_string(), messages);
    }

    async fn delete(&self, session_id: &str) {
        self.inner.write().await.remove(session_id);
    }
}

/// 文件会话存储：dir/{session_id}.json
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn file_path(&self, session_id: &str) -> PathBuf {
        // session_id 可能来自外部输入，只保留安全字符，防止路径逃逸
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, session_id: &str) -> Option<Vec<ChatMessage>> {
        let path = self.file_path(session_id);
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(messages) => Some(messages),
            Err(e) => {
                tracing::warn!("corrupt session file {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn set(&self, session_id: &str, messages: Vec<ChatMessage>) {
        let path = self.file_path(session_id);
        match serde_json::to_string_pretty(&messages) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::warn!("cannot save session {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("cannot serialize session {}: {}", session_id, e),
        }
    }

    async fn delete(&self, session_id: &str) {
        let path = self.file_path(session_id);
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}
