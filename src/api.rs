use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

use crate::currencies::RateTable;

/// Client for the site's exchange-rate backend.
pub struct RateSourceClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    success: bool,
    data: RateData,
}

#[derive(Debug, Deserialize)]
struct RateData {
    rates: HashMap<String, f64>,
}

impl RateSourceClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key: env::var("RATES_API_KEY").ok(),
        }
    }

    /// Fetch the current EUR-pivot rate table from the rate source.
    pub async fn fetch_rates(&self) -> Result<RateTable> {
        let mut request = self.client.get(&self.base_url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key)]);
        }

        let response = request.send().await.context("Failed to send rate request")?;

        let status = response.status();
        let text = response.text().await.context("Failed to get response text")?;

        if !status.is_success() {
            anyhow::bail!("Rate API request failed: {}", text);
        }

        parse_rates(&text)
    }
}

/// Parse the rate payload `{"success": bool, "data": {"rates": {..}}}`.
pub fn parse_rates(text: &str) -> Result<RateTable> {
    let parsed: RateResponse =
        serde_json::from_str(text).context("Failed to parse rate response")?;

    if !parsed.success {
        anyhow::bail!("Rate source reported failure");
    }

    Ok(parsed.data.rates)
}
