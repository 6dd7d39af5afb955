use std::env;

use crate::error::CleraError;

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_PPLX_BASE_URL: &str = "https://api.perplexity.ai";
const DEFAULT_PPLX_MODEL: &str = "sonar-pro";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres (Supabase)
    pub database_url: String,
    pub supabase_jwt_secret: String,

    // Key-value store (Upstash REST). Both must be set for locks to be enforced.
    pub upstash_url: Option<String>,
    pub upstash_token: Option<String>,

    // Secrets
    pub cron_secret: String,
    pub admin_secret: Option<String>,

    // Trading backend
    pub backend_url: String,
    pub backend_api_key: String,

    // LLM provider
    pub pplx_api_key: String,
    pub pplx_base_url: String,
    pub pplx_model: String,
    pub pplx_search_context_size: String,

    // Public addressing
    pub app_url: Option<String>,
    pub platform_url: Option<String>,
    pub app_env: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, CleraError> {
        let web_port = optional_env("API_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| CleraError::Config("API_PORT must be a number".to_string()))?;

        Ok(Self {
            database_url: required_env("DATABASE_URL")?,
            supabase_jwt_secret: required_env("SUPABASE_JWT_SECRET")?,
            upstash_url: optional_env("UPSTASH_REDIS_REST_URL"),
            upstash_token: optional_env("UPSTASH_REDIS_REST_TOKEN"),
            cron_secret: required_env("CRON_SECRET")?,
            admin_secret: optional_env("ADMIN_SECRET"),
            backend_url: optional_env("BACKEND_API_URL")
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            backend_api_key: optional_env("BACKEND_API_KEY").unwrap_or_default(),
            pplx_api_key: optional_env("PPLX_API_KEY").unwrap_or_default(),
            pplx_base_url: optional_env("PPLX_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PPLX_BASE_URL.to_string()),
            pplx_model: optional_env("PPLX_MODEL")
                .unwrap_or_else(|| DEFAULT_PPLX_MODEL.to_string()),
            pplx_search_context_size: optional_env("PPLX_SEARCH_CONTEXT_SIZE")
                .unwrap_or_else(|| "high".to_string()),
            app_url: optional_env("APP_URL").or_else(|| optional_env("NEXT_PUBLIC_APP_URL")),
            platform_url: optional_env("VERCEL_URL"),
            app_env: optional_env("APP_ENV").unwrap_or_else(|| "development".to_string()),
            web_host: optional_env("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Base URL for calling this application's own endpoints: the configured
    /// app URL, else the platform hostname, else localhost.
    pub fn self_base_url(&self) -> String {
        if let Some(url) = &self.app_url {
            return url.trim_end_matches('/').to_string();
        }
        if let Some(host) = &self.platform_url {
            let host = host.trim_end_matches('/');
            if host.starts_with("http://") || host.starts_with("https://") {
                return host.to_string();
            }
            return format!("https://{host}");
        }
        format!("http://localhost:{}", self.web_port)
    }

    /// The key-value store is usable only when both URL and token are present.
    pub fn kv_credentials(&self) -> Option<(&str, &str)> {
        match (&self.upstash_url, &self.upstash_token) {
            (Some(url), Some(token)) => Some((url.as_str(), token.as_str())),
            _ => None,
        }
    }
}

fn required_env(key: &str) -> Result<String, CleraError> {
    optional_env(key).ok_or_else(|| CleraError::Config(format!("{key} environment variable is required")))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
impl Config {
    pub(crate) fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/clera".to_string(),
            supabase_jwt_secret: "jwt".to_string(),
            upstash_url: None,
            upstash_token: None,
            cron_secret: "cron".to_string(),
            admin_secret: None,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_api_key: String::new(),
            pplx_api_key: String::new(),
            pplx_base_url: DEFAULT_PPLX_BASE_URL.to_string(),
            pplx_model: DEFAULT_PPLX_MODEL.to_string(),
            pplx_search_context_size: "high".to_string(),
            app_url: None,
            platform_url: None,
            app_env: "development".to_string(),
            web_host: "0.0.0.0".to_string(),
            web_port: 3000,
        }
    }
}
