use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use uuid::Uuid;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::ConnectOptions;

#[derive(Deserialize, Clone)]
pub struct AppConfig {
    pub career_guide_server_config: CareerGuideServerConfig,
    pub postgres: PostgresConfig,
    pub supabase: SupabaseConfig,
    pub uploads: UploadConfig,
    pub groups: GroupsConfig,
    pub assistant: AssistantConfig,
    pub log: LogConfig,
    pub cookies: CookieConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, config::ConfigError> {
        let base_path = std::env::current_dir()
            .map_err(|e| config::ConfigError::Message(format!("Failed to find the current dir: {}", e)))?;
        let config_dir = base_path.join("src/core/configurations");

        let app_environment: Environment = std::env::var("CAREER_GUIDE_APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .try_into()
            .map_err(config::ConfigError::Message)?;

        // Supabase keys are normally injected through the environment, e.g.
        // APP_SUPABASE__SERVICE_ROLE_KEY.
        let configurations = config::Config::builder()
            .add_source(
                config::File::from(config_dir.join(app_environment.as_str())).required(true),
            )
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        configurations.try_deserialize()
    }
}

#[derive(Deserialize, Clone)]
pub struct CareerGuideServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone)]
pub struct PostgresConfig {
    pub username: String,
    pub password: Secret<String>,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub require_ssl: bool,
    #[serde(default)]
    pub run_migrations: bool,
}

impl PostgresConfig {
    pub fn connect(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        let options = PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .database(&self.database_name)
            .ssl_mode(ssl_mode);

        options.log_statements(tracing::log::LevelFilter::Trace)
    }
}

#[derive(Deserialize, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: Secret<String>,
    pub service_role_key: Secret<String>,
    pub jwt_secret: Secret<String>,
    pub storage_bucket: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Deserialize, Clone)]
pub struct UploadConfig {
    pub max_file_size_bytes: usize,
    pub max_files: usize,
    pub max_total_bytes: usize,
}

#[derive(Deserialize, Clone)]
pub struct GroupsConfig {
    #[serde(default)]
    pub default_group_id: Option<Uuid>,
}

#[derive(Deserialize, Clone)]
pub struct AssistantConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
    pub model: String,
    pub system_prompt: String,
    pub history_turns: usize,
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Deserialize, Clone)]
pub struct LogConfig {
    pub directory: String,
    pub level: String,
}

#[derive(Deserialize, Clone)]
pub struct CookieConfig {
    pub secure: bool,
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, PartialEq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`",
                other
            )),
        }
    }
}
