use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub inference_endpoint: String,
    pub inference_api_key: Option<String>,
    pub ai_model: String,
    pub ai_max_tokens: u32,
    pub ai_temperature: f32,
    pub ai_request_timeout_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub collector_request_timeout_secs: u64,
    pub collector_user_agent: String,
    pub collection_interval_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("inference_endpoint", &self.inference_endpoint)
            .field(
                "inference_api_key",
                &self.inference_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("ai_model", &self.ai_model)
            .field("ai_max_tokens", &self.ai_max_tokens)
            .field("ai_temperature", &self.ai_temperature)
            .field("ai_request_timeout_secs", &self.ai_request_timeout_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "collector_request_timeout_secs",
                &self.collector_request_timeout_secs,
            )
            .field("collector_user_agent", &self.collector_user_agent)
            .field("collection_interval_secs", &self.collection_interval_secs)
            .finish()
    }
}
