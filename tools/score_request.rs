//! Sample Scoring Requests
//!
//! Generates customer records and sends them to the churn service as NATS
//! requests, logging each reply.

use churn_prediction_pipeline::{config::LoggingConfig, logging, PredictionResponse};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Request body in the service's flat form format
#[derive(Debug, Clone, Serialize)]
struct CustomerForm {
    age: u32,
    tenure_months: u32,
    monthly_logins: u32,
    weekly_active_days: u32,
    avg_session_time: f64,
    monthly_fee: f64,
    total_revenue: f64,
    payment_failures: u32,
    support_tickets: u32,
    csat_score: u32,
    nps_score: u32,
    gender: String,
    contract_type: String,
    payment_method: String,
    complaint_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<String>,
}

/// Customer generator for testing
struct CustomerGenerator {
    rng: rand::rngs::ThreadRng,
}

impl CustomerGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Long-tenured, engaged customer
    fn generate_loyal(&mut self) -> CustomerForm {
        let tenure = self.rng.gen_range(12..72);
        let fee = self.rng.gen_range(20.0..120.0);

        CustomerForm {
            age: self.rng.gen_range(25..70),
            tenure_months: tenure,
            monthly_logins: self.rng.gen_range(20..60),
            weekly_active_days: self.rng.gen_range(4..8),
            avg_session_time: self.rng.gen_range(8.0..40.0),
            monthly_fee: fee,
            total_revenue: fee * tenure as f64,
            payment_failures: self.rng.gen_range(0..2),
            support_tickets: self.rng.gen_range(0..3),
            csat_score: self.rng.gen_range(7..11),
            nps_score: self.rng.gen_range(7..11),
            gender: self.random_choice(&["Male", "Female", "Other"]).to_string(),
            contract_type: self.random_choice(&["Yearly", "Quarterly"]).to_string(),
            payment_method: self
                .random_choice(&["Card", "PayPal", "Bank Transfer"])
                .to_string(),
            complaint_type: self.random_choice(&["None", "None", "Billing"]).to_string(),
            country: self.optional_country(),
        }
    }

    /// New, disengaged customer with billing trouble
    fn generate_at_risk(&mut self) -> CustomerForm {
        let tenure = self.rng.gen_range(1..6);
        let fee = self.rng.gen_range(60.0..150.0);

        CustomerForm {
            age: self.rng.gen_range(18..45),
            tenure_months: tenure,
            monthly_logins: self.rng.gen_range(0..8),
            weekly_active_days: self.rng.gen_range(0..3),
            avg_session_time: self.rng.gen_range(1.0..6.0),
            monthly_fee: fee,
            total_revenue: fee * tenure as f64,
            payment_failures: self.rng.gen_range(2..6),
            support_tickets: self.rng.gen_range(3..10),
            csat_score: self.rng.gen_range(1..5),
            nps_score: self.rng.gen_range(0..5),
            gender: self.random_choice(&["Male", "Female", "Other"]).to_string(),
            contract_type: "Monthly".to_string(),
            payment_method: self.random_choice(&["Card", "PayPal"]).to_string(),
            complaint_type: self
                .random_choice(&["Billing", "Service", "Technical"])
                .to_string(),
            country: self.optional_country(),
        }
    }

    fn optional_country(&mut self) -> Option<String> {
        if self.rng.gen_bool(0.3) {
            Some(self.random_choice(&["India", "USA", "UK"]).to_string())
        } else {
            None
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }

    fn generate(&mut self, churn_rate: f64) -> (CustomerForm, bool) {
        if self.rng.gen_bool(churn_rate) {
            (self.generate_at_risk(), true)
        } else {
            (self.generate_loyal(), false)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(
        &LoggingConfig::default(),
        &["churn_prediction_pipeline", env!("CARGO_CRATE_NAME")],
    )?;

    info!("Starting Sample Scoring Requests");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("churn.predict");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let churn_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.3)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(200);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        churn_rate = churn_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, churn_rate).await;
        }
    };

    let mut generator = CustomerGenerator::new();
    let mut churn_predicted = 0u64;
    let mut failures = 0u64;

    for i in 0..count {
        let (form, at_risk) = generator.generate(churn_rate);
        let payload = serde_json::to_vec(&form)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => match serde_json::from_slice::<PredictionResponse>(&reply.payload) {
                Ok(response) => {
                    if response.is_error() {
                        failures += 1;
                    } else if response.label == Some(1) {
                        churn_predicted += 1;
                    }
                    info!(
                        request = i + 1,
                        generated_at_risk = at_risk,
                        result = %response.result,
                        risk_score = ?response.risk_score,
                        "Received response"
                    );
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, "Failed to decode response");
                }
            },
            Err(e) => {
                failures += 1;
                warn!(error = %e, "Request failed");
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} predicted churn, {} failed)",
        count, churn_predicted, failures
    );

    Ok(())
}

async fn run_dry_mode(count: u64, churn_rate: f64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = CustomerGenerator::new();

    for i in 0..count {
        let (form, at_risk) = generator.generate(churn_rate);
        let json = serde_json::to_string_pretty(&form)?;
        info!("Sample request {} (at_risk={}):\n{}", i + 1, at_risk, json);
    }

    Ok(())
}
