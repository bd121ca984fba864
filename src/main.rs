//! hive - 多智能体 OpenAI 兼容网关入口
//!
//! 初始化日志，加载配置，组建默认团队并注册，扫描蓝图目录，然后启动 HTTP 服务。

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hive::actor::{
    load_blueprints, ActorHandle, AssistantAgent, RoundRobinTeam, TerminationCondition,
};
use hive::api::{build_router, AppState};
use hive::config::{load_config, AppConfig};
use hive::keys::NonKeyManager;
use hive::llm::{create_llm_from_config, LlmClient};
use hive::registry::ModelRegistry;
use hive::session::{FileSessionStore, InMemorySessionStore, SessionStore};

/// 按 [team] 段组建默认轮询团队
fn build_default_team(cfg: &AppConfig, llm: Arc<dyn LlmClient>) -> RoundRobinTeam {
    let participants = cfg
        .team
        .participants
        .iter()
        .map(|name| {
            AssistantAgent::new(
                name,
                format!(
                    "You are {}, a member of a collaborative team. \
                     Reply concisely. When the task is fully resolved, end your message with {}.",
                    name, cfg.team.termination_text
                ),
                llm.clone(),
            )
        })
        .collect();

    let termination = TerminationCondition::Any {
        conditions: vec![
            TerminationCondition::text_mention(&cfg.team.termination_text),
            TerminationCondition::max_messages(cfg.team.max_messages),
        ],
    };

    RoundRobinTeam::new(&cfg.team.name, participants, termination)
}

fn build_session_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn SessionStore>> {
    match cfg.sessions.backend.as_str() {
        "file" => {
            let store = FileSessionStore::new(&cfg.sessions.dir)
                .context("Failed to create session dir")?;
            Ok(Arc::new(store))
        }
        _ => Ok(Arc::new(InMemorySessionStore::new())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).context("Failed to load config")?;
    let llm = create_llm_from_config(&cfg);

    let mut registry = ModelRegistry::new();
    let team = build_default_team(&cfg, llm.clone());
    registry
        .register(
            &cfg.team.name,
            ActorHandle::Team(Arc::new(team)),
            cfg.team.source_select.as_deref(),
            cfg.team.output_idx,
        )
        .context("Failed to register default team")?;

    if let Some(dir) = &cfg.teams.dir {
        for (name, blueprint) in load_blueprints(dir, &llm) {
            if let Err(e) = registry.register(
                &name,
                ActorHandle::Blueprint(Arc::new(blueprint)),
                cfg.team.source_select.as_deref(),
                cfg.team.output_idx,
            ) {
                tracing::warn!("skipping blueprint '{}': {}", name, e);
            }
        }
    }
    tracing::info!("registered models: {:?}", registry.list());

    let state = Arc::new(AppState {
        registry: Arc::new(registry),
        sessions: build_session_store(&cfg)?,
        keys: Arc::new(NonKeyManager),
        default_model: cfg.team.name.clone(),
    });
    let app = build_router(state);

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("hive listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server run failed")?;

    Ok(())
}
