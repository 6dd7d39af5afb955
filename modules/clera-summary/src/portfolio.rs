// Positions from the trading backend, rendered for the prompt.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// What the prompt says when positions are unknown or empty.
pub const NO_POSITIONS: &str = "No positions found in portfolio.";

pub const DEFAULT_POSITIONS_TIMEOUT: Duration = Duration::from_secs(10);

/// The backend sends `qty` as either a JSON number or a decimal string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantity::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Quantity::Number(n) => write!(f, "{n}"),
            Quantity::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub qty: Quantity,
}

/// `SYMBOL (QTY shares), ...`, or the sentinel for an empty book.
pub fn format_positions(positions: &[Position]) -> String {
    if positions.is_empty() {
        return NO_POSITIONS.to_string();
    }
    positions
        .iter()
        .map(|p| format!("{} ({} shares)", p.symbol, p.qty))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
pub trait PositionsClient: Send + Sync {
    async fn positions(&self, account_id: &str) -> Result<Vec<Position>>;
}

/// `GET {backend}/api/portfolio/{account}/positions` with `X-API-Key`.
pub struct HttpPositionsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPositionsClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl PositionsClient for HttpPositionsClient {
    async fn positions(&self, account_id: &str) -> Result<Vec<Position>> {
        let url = format!("{}/api/portfolio/{account_id}/positions", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .timeout(DEFAULT_POSITIONS_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("positions request returned {status}");
        }
        Ok(response.json().await?)
    }
}
