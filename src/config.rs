use serde::Deserialize;

/// How blurbs are generated relative to each other within one request
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlurbMode {
    /// Every candidate is enriched in its own task, blurbs carry no prior context
    #[default]
    Concurrent,
    /// Lookups run concurrently, blurbs are written one by one in dispatch order
    /// so each can reference the shows described before it
    Sequential,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// OpenAI API key
    pub openai_api_key: String,

    /// OpenAI API base URL
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// Chat model used for every completion call
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Sampling temperature for completion calls
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,

    /// TheTVDB v4 API key
    pub tvdb_api_key: String,

    /// Optional TheTVDB subscriber PIN
    #[serde(default)]
    pub tvdb_pin: Option<String>,

    /// TheTVDB v4 API base URL
    #[serde(default = "default_tvdb_api_url")]
    pub tvdb_api_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on candidates enriched per request
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    #[serde(default)]
    pub blurb_mode: BlurbMode,

    /// Timeout applied to every upstream HTTP call, in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_temperature() -> f32 {
    0.7
}

fn default_tvdb_api_url() -> String {
    "https://api4.thetvdb.com/v4".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_candidates() -> usize {
    3
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.openai_api_key.trim().is_empty() {
            anyhow::bail!("OPENAI_API_KEY must not be empty");
        }
        if self.tvdb_api_key.trim().is_empty() {
            anyhow::bail!("TVDB_API_KEY must not be empty");
        }
        if self.max_candidates == 0 {
            anyhow::bail!("MAX_CANDIDATES must be at least 1");
        }
        if self.upstream_timeout_secs == 0 {
            anyhow::bail!("UPSTREAM_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
