use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::quote::{Quote, QuoteProvider};

const BATCH_ENDPOINT: &str = "/stable/stock/market/batch";

// IexCloudProvider implementation for QuoteProvider
pub struct IexCloudProvider {
    base_url: String,
    token: String,
}

impl IexCloudProvider {
    pub fn new(base_url: &str, token: &str) -> Self {
        IexCloudProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct BatchEntry {
    quote: Option<IexQuote>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct IexQuote {
    latest_price: Option<Decimal>,
    market_cap: Option<Decimal>,
}

fn lookup<'a>(data: &'a HashMap<String, BatchEntry>, symbol: &str) -> Option<&'a IexQuote> {
    data.get(symbol)
        .or_else(|| data.get(&symbol.to_uppercase()))
        .and_then(|entry| entry.quote.as_ref())
}

#[async_trait]
impl QuoteProvider for IexCloudProvider {
    #[instrument(
        name = "IexBatchFetch",
        skip(self, symbols),
        fields(count = symbols.len())
    )]
    async fn fetch_batch(&self, symbols: &[String]) -> Result<Vec<Option<Quote>>> {
        let joined = symbols.join(",");
        let url = format!("{}{}", self.base_url, BATCH_ENDPOINT);
        debug!("Requesting batch quotes from {} for {}", url, joined);

        let client = reqwest::Client::builder()
            .user_agent("equalweight/0.1")
            .build()?;
        let response = client
            .get(&url)
            .query(&[
                ("symbols", joined.as_str()),
                ("types", "quote"),
                ("token", self.token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbols: {}", e.without_url(), joined))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbols: {}",
                response.status(),
                joined
            ));
        }

        let text = response.text().await?;
        let data: HashMap<String, BatchEntry> = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", joined, e))?;

        let quotes = symbols
            .iter()
            .map(|symbol| {
                let quote = lookup(&data, symbol);
                if quote.is_none() {
                    debug!(%symbol, "Symbol missing from batch response");
                }
                quote.map(|q| Quote {
                    symbol: symbol.clone(),
                    price: q.latest_price,
                    market_cap: q.market_cap,
                })
            })
            .collect();

        Ok(quotes)
    }
}
