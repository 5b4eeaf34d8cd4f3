use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_slow_statement_secs")]
    pub slow_statement_secs: u64,
}

/// 规划会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// 会话空闲超过该分钟数后被清理
    pub session_idle_minutes: i64,
}

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/lab_procure";
const CONFIG_FILE: &str = "lab-procure";

fn default_max_connections() -> u32 {
    20
}

fn default_slow_statement_secs() -> u64 {
    5
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            session_idle_minutes: 12 * 60,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: default_max_connections(),
                slow_statement_secs: default_slow_statement_secs(),
            },
            planner: PlannerConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            database: defaults.database,
            planner: PlannerConfig {
                session_idle_minutes: std::env::var("PLANNER_SESSION_IDLE_MINUTES")
                    .ok()
                    .and_then(|m| m.parse().ok())
                    .unwrap_or(defaults.planner.session_idle_minutes),
            },
        }
    }

    /// 分层加载: 默认值 -> lab-procure.toml (可选) -> 环境变量 (LAB_PROCURE__SERVER__PORT 等)
    pub fn load() -> Result<Self, ConfigError> {
        let base = Self::from_env();

        Config::builder()
            .set_default("server.host", base.server.host)?
            .set_default("server.port", i64::from(base.server.port))?
            .set_default("database.url", base.database.url)?
            .set_default("database.max_connections", i64::from(base.database.max_connections))?
            .set_default("database.slow_statement_secs", base.database.slow_statement_secs as i64)?
            .set_default("planner.session_idle_minutes", base.planner.session_idle_minutes)?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix("LAB_PROCURE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
