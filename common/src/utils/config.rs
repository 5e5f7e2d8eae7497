use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailRendererKind {
    #[default]
    Svg,
    Chrome,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_surrealdb_address")]
    pub surrealdb_address: String,
    #[serde(default)]
    pub surrealdb_username: Option<String>,
    #[serde(default)]
    pub surrealdb_password: Option<String>,
    #[serde(default = "default_namespace")]
    pub surrealdb_namespace: String,
    #[serde(default = "default_database")]
    pub surrealdb_database: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default)]
    pub thumbnail_renderer: ThumbnailRendererKind,
    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,
    #[serde(default = "default_true")]
    pub persist_chat_history: bool,
}

fn default_surrealdb_address() -> String {
    "surrealkv://./data/documents.db".to_string()
}

fn default_namespace() -> String {
    "docchat".to_string()
}

fn default_database() -> String {
    "documents".to_string()
}

fn default_http_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_thumbnail_width() -> u32 {
    320
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            surrealdb_address: default_surrealdb_address(),
            surrealdb_username: None,
            surrealdb_password: None,
            surrealdb_namespace: default_namespace(),
            surrealdb_database: default_database(),
            http_port: default_http_port(),
            max_upload_bytes: default_max_upload_bytes(),
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            chat_model: default_chat_model(),
            thumbnail_renderer: ThumbnailRendererKind::default(),
            thumbnail_width: default_thumbnail_width(),
            persist_chat_history: true,
        }
    }
}

impl AppConfig {
    /// Root credentials, only when both halves are configured. Embedded engines
    /// (`surrealkv://`, `mem://`) run without sign-in.
    pub fn surrealdb_credentials(&self) -> Option<(&str, &str)> {
        match (&self.surrealdb_username, &self.surrealdb_password) {
            (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
            _ => None,
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
