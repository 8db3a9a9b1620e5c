//! Churn Prediction Service - Main Entry Point
//!
//! Loads the encoder and classifier artifacts once, then answers scoring
//! requests received over NATS.

use anyhow::{Context, Result};
use churn_prediction_pipeline::{
    config::AppConfig,
    consumer::RequestConsumer,
    handler::handle_request,
    logging,
    metrics::{MetricsReporter, ServiceMetrics},
    models::{loader::FsArtifactStore, ChurnPipeline},
    producer::ResponsePublisher,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(
        &config.logging,
        &["churn_prediction_pipeline", env!("CARGO_CRATE_NAME")],
    )?;

    info!("Starting Churn Prediction Service");
    info!(
        artifacts_dir = %config.artifacts.dir,
        classifier_format = ?config.artifacts.classifier_format,
        missing_columns = ?config.prediction.missing_columns,
        "Configuration loaded"
    );

    // Artifacts are loaded once and shared read-only by every request
    let store = FsArtifactStore::from_config(&config.artifacts);
    let pipeline = Arc::new(
        ChurnPipeline::from_config(&store, &config).context("Failed to load churn artifacts")?,
    );

    let metrics = Arc::new(ServiceMetrics::new());

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(client.clone(), &config.nats.request_subject)
        .with_queue_group(config.nats.queue_group.as_deref());
    let publisher = Arc::new(ResponsePublisher::new(
        client.clone(),
        &config.nats.response_subject,
    ));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        workers = num_workers,
        request_subject = %consumer.subject(),
        response_subject = %publisher.default_subject(),
        "Starting request loop"
    );

    let semaphore = Arc::new(Semaphore::new(num_workers));

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let pipeline = pipeline.clone();
        let publisher = publisher.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let (response, outcome) = handle_request(&pipeline, &message.payload);
            metrics.record(&outcome, start_time.elapsed());

            if let Err(e) = publisher.publish(message.reply, &response).await {
                error!(
                    request_id = %response.request_id,
                    error = %e,
                    "Failed to publish prediction response"
                );
            }

            drop(permit);
        });
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
