//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__SERVER__PORT=9000`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub team: TeamSection,
    #[serde(default)]
    pub teams: TeamsSection,
    #[serde(default)]
    pub sessions: SessionsSection,
}

/// [server] 段：监听地址与端口
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmSection {
    /// 后端：openai / mock；无 API Key 时自动回落 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// [team] 段：默认团队的组成与选择配置
#[derive(Debug, Clone, Deserialize)]
pub struct TeamSection {
    /// 注册名（也是请求缺省 model）
    #[serde(default = "default_team_name")]
    pub name: String,
    /// 参与者名单，按此顺序轮流发言
    #[serde(default = "default_participants")]
    pub participants: Vec<String>,
    /// 终止关键字（任一参与者提及即结束）
    #[serde(default = "default_termination_text")]
    pub termination_text: String,
    /// 消息数上限
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// 选择模式：取该来源最后一条非空发言；与 output_idx 互斥
    pub source_select: Option<String>,
    /// 选择模式：从末尾数第几轮；与 source_select 互斥
    pub output_idx: Option<usize>,
}

fn default_team_name() -> String {
    "hive-baseteam".to_string()
}

fn default_participants() -> Vec<String> {
    vec!["writer".to_string(), "editor".to_string()]
}

fn default_termination_text() -> String {
    "TERMINATE".to_string()
}

fn default_max_messages() -> usize {
    20
}

impl Default for TeamSection {
    fn default() -> Self {
        Self {
            name: default_team_name(),
            participants: default_participants(),
            termination_text: default_termination_text(),
            max_messages: default_max_messages(),
            source_select: None,
            output_idx: None,
        }
    }
}

/// [teams] 段：蓝图目录，目录下每个 *.json 注册为一个模型
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TeamsSection {
    pub dir: Option<PathBuf>,
}

/// [sessions] 段：会话存储后端
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsSection {
    /// memory / file
    #[serde(default = "default_session_backend")]
    pub backend: String,
    #[serde(default = "default_session_dir")]
    pub dir: PathBuf,
}

fn default_session_backend() -> String {
    "memory".to_string()
}

fn default_session_dir() -> PathBuf {
    PathBuf::from("sessions")
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            backend: default_session_backend(),
            dir: default_session_dir(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            llm: LlmSection::default(),
            team: TeamSection::default(),
            teams: TeamsSection::default(),
            sessions: SessionsSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
