//! Sample Prediction Client
//!
//! Generates PaySim-style transactions and posts them to the API in batches.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Transaction structure matching the API's expected input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Transaction {
    step: u32,
    #[serde(rename = "type")]
    kind: String,
    amount: f64,
    name_orig: String,
    #[serde(rename = "oldbalanceOrg")]
    oldbalance_org: f64,
    #[serde(rename = "newbalanceOrig")]
    newbalance_orig: f64,
    name_dest: String,
    #[serde(rename = "oldbalanceDest")]
    oldbalance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    newbalance_dest: f64,
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
    step: u32,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            step: 0,
        }
    }

    /// Generate a random legitimate transaction
    fn generate_legitimate(&mut self) -> Transaction {
        self.step += 1;
        let kind = self.random_choice(&["PAYMENT", "CASH_IN", "CASH_OUT", "DEBIT", "TRANSFER"]);
        let oldbalance_org: f64 = self.rng.gen_range(1_000.0..200_000.0);
        let amount = self.rng.gen_range(10.0..oldbalance_org / 4.0);
        let oldbalance_dest: f64 = self.rng.gen_range(0.0..500_000.0);

        Transaction {
            step: self.step,
            kind: kind.to_string(),
            amount,
            name_orig: format!("C{}", self.rng.gen_range(100_000_000..999_999_999)),
            oldbalance_org,
            newbalance_orig: oldbalance_org - amount,
            name_dest: format!("M{}", self.rng.gen_range(100_000_000..999_999_999)),
            oldbalance_dest,
            newbalance_dest: oldbalance_dest + amount,
        }
    }

    /// Generate a suspicious transaction: a transfer that drains the origin account
    fn generate_suspicious(&mut self) -> Transaction {
        self.step += 1;
        let oldbalance_org: f64 = self.rng.gen_range(50_000.0..5_000_000.0);

        Transaction {
            step: self.step,
            kind: "TRANSFER".to_string(),
            amount: oldbalance_org,
            name_orig: format!("C{}", self.rng.gen_range(100_000_000..999_999_999)),
            oldbalance_org,
            newbalance_orig: 0.0,
            name_dest: format!("C{}", self.rng.gen_range(100_000_000..999_999_999)),
            // Destination balances are not updated on fraudulent transfers
            oldbalance_dest: 0.0,
            newbalance_dest: 0.0,
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }

    fn batch(&mut self, size: usize, fraud_rate: f64) -> Vec<Transaction> {
        (0..size)
            .map(|_| {
                if self.rng.gen_bool(fraud_rate) {
                    self.generate_suspicious()
                } else {
                    self.generate_legitimate()
                }
            })
            .collect()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_client=info".parse()?),
        )
        .init();

    info!("Starting Sample Prediction Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let api_url = args.get(1).map(|s| s.as_str()).unwrap_or("http://localhost:8000");
    let count: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let batch_size: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(10).max(1);
    let fraud_rate = parse_fraud_rate(args.get(4).map(|s| s.as_str()))?;
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        api_url = %api_url,
        count = count,
        batch_size = batch_size,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    if api_url == "--dry-run" {
        return run_dry_mode(count, batch_size, fraud_rate).await;
    }

    let client = reqwest::Client::new();
    let endpoint = format!("{}/predict", api_url.trim_end_matches('/'));
    let mut generator = TransactionGenerator::new();

    let mut sent = 0;
    let mut flagged = 0;

    while sent < count {
        let batch = generator.batch(batch_size.min(count - sent), fraud_rate);

        let response = match client
            .post(&endpoint)
            .json(&serde_json::json!({ "data": batch }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if sent == 0 => {
                warn!(error = %e, "Failed to reach the API. Running in dry-run mode.");
                return run_dry_mode(count, batch_size, fraud_rate).await;
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            anyhow::bail!("API returned {}: {}", status, body);
        }

        let predictions = body.as_array().map(Vec::as_slice).unwrap_or_default();
        flagged += predictions
            .iter()
            .filter(|row| row["prediction"].as_i64().unwrap_or(0) != 0)
            .count();
        sent += batch.len();

        info!("Scored {}/{} transactions ({} flagged)", sent, count, flagged);

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Scored {} transactions, {} flagged as fraud", sent, flagged);

    Ok(())
}

/// Fraction of suspicious transactions, defaulting to 0.1
fn parse_fraud_rate(arg: Option<&str>) -> anyhow::Result<f64> {
    let Some(raw) = arg else {
        return Ok(0.1);
    };
    let rate: f64 = raw
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid fraud rate '{}': {}", raw, e))?;
    if !(0.0..=1.0).contains(&rate) {
        anyhow::bail!("Fraud rate must be between 0 and 1, got {}", rate);
    }
    Ok(rate)
}

async fn run_dry_mode(count: usize, batch_size: usize, fraud_rate: f64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no API requests)");

    let mut generator = TransactionGenerator::new();
    let mut generated = 0;

    while generated < count {
        let batch = generator.batch(batch_size.min(count - generated), fraud_rate);
        generated += batch.len();

        let json = serde_json::to_string_pretty(&serde_json::json!({ "data": batch }))?;
        println!("{}", json);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraud_rate_defaults_and_bounds() {
        assert_eq!(parse_fraud_rate(None).unwrap(), 0.1);
        assert_eq!(parse_fraud_rate(Some("1")).unwrap(), 1.0);
        assert!(parse_fraud_rate(Some("1.5")).is_err());
        assert!(parse_fraud_rate(Some("-0.1")).is_err());
        assert!(parse_fraud_rate(Some("NaN")).is_err());
        assert!(parse_fraud_rate(Some("often")).is_err());
    }

    #[test]
    fn test_full_fraud_rate_generates_only_suspicious() {
        let mut generator = TransactionGenerator::new();
        let batch = generator.batch(20, 1.0);
        assert!(batch.iter().all(|t| t.kind == "TRANSFER" && t.newbalance_orig == 0.0));
    }
}
