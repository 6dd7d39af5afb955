pub mod error;

pub use error::{Result, UpstashError};

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Every command answers with either `result` or `error`.
#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Redis over HTTPS: each command is a JSON array POSTed to the database URL.
#[derive(Clone)]
pub struct UpstashClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl UpstashClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn command(&self, args: &[&str]) -> Result<Value> {
        debug!(command = args.first().copied().unwrap_or_default(), "Upstash command");

        let resp = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<CommandResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body);
            return Err(UpstashError::Api {
                status: status.as_u16(),
                message,
            });
        }

        decode(&body)
    }

    /// `SET key value NX EX ttl`. Returns true only if this call created the key.
    pub async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool> {
        let ttl = ttl_secs.max(1).to_string();
        let result = self
            .command(&["SET", key, value, "NX", "EX", &ttl])
            .await?;
        Ok(matches!(result, Value::String(ref s) if s == "OK"))
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.command(&["GET", key]).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            other => Err(UpstashError::Decode(format!("GET returned {other}"))),
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.command(&["SET", key, value]).await?;
        Ok(())
    }

    /// Returns the number of keys removed.
    pub async fn del(&self, key: &str) -> Result<u64> {
        match self.command(&["DEL", key]).await? {
            Value::Number(n) => Ok(n.as_u64().unwrap_or(0)),
            other => Err(UpstashError::Decode(format!("DEL returned {other}"))),
        }
    }
}

fn decode(body: &str) -> Result<Value> {
    let parsed: CommandResponse =
        serde_json::from_str(body).map_err(|e| UpstashError::Decode(e.to_string()))?;
    if let Some(error) = parsed.error {
        return Err(UpstashError::Command(error));
    }
    Ok(parsed.result)
}
