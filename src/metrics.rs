//! Request metrics for the scoring service.

use crate::error::ErrorKind;
use crate::handler::Outcome;
use crate::types::prediction::Label;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Counters and latency samples for scored requests
pub struct ServiceMetrics {
    /// Total requests handled
    pub requests_processed: AtomicU64,
    pub churn_predicted: AtomicU64,
    pub stay_predicted: AtomicU64,
    errors_by_kind: RwLock<HashMap<&'static str, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Churn probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_processed: AtomicU64::new(0),
            churn_predicted: AtomicU64::new(0),
            stay_predicted: AtomicU64::new(0),
            errors_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record one handled request
    pub fn record(&self, outcome: &Outcome, processing_time: Duration) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        match outcome {
            Outcome::Scored(prediction) => {
                match prediction.label {
                    Label::Churn => self.churn_predicted.fetch_add(1, Ordering::Relaxed),
                    Label::Stay => self.stay_predicted.fetch_add(1, Ordering::Relaxed),
                };
                let bucket = (prediction.churn_probability * 10.0).clamp(0.0, 9.0) as usize;
                if let Ok(mut buckets) = self.probability_buckets.write() {
                    buckets[bucket] += 1;
                }
            }
            Outcome::Failed(kind) => self.record_error(*kind),
        }
    }

    pub fn record_error(&self, kind: ErrorKind) {
        if let Ok(mut errors) = self.errors_by_kind.write() {
            *errors.entry(kind.as_str()).or_insert(0) += 1;
        }
    }

    pub fn errors_by_kind(&self) -> HashMap<&'static str, u64> {
        self.errors_by_kind
            .read()
            .map(|errors| errors.clone())
            .unwrap_or_default()
    }

    pub fn error_count(&self) -> u64 {
        self.errors_by_kind().values().sum()
    }

    /// Processing time statistics over the retained samples
    pub fn processing_stats(&self) -> ProcessingStats {
        let mut sorted = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return ProcessingStats::default(),
        };
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.5),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Requests per second since start
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let requests = self.requests_processed.load(Ordering::Relaxed);
        let churn = self.churn_predicted.load(Ordering::Relaxed);
        let stay = self.stay_predicted.load(Ordering::Relaxed);
        let scored = churn + stay;
        let churn_rate = if scored > 0 {
            (churn as f64 / scored as f64) * 100.0
        } else {
            0.0
        };
        let processing = self.processing_stats();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            CHURN PREDICTION SERVICE - METRICS SUMMARY        ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests: {:>8}  │  Throughput: {:>6.1} req/s  │  Errors: {:>6} ║",
            requests,
            self.throughput(),
            self.error_count()
        );
        info!(
            "║ Churn: {:>8}  │  Stay: {:>8}  │  Churn Rate: {:>5.1}%      ║",
            churn, stay, churn_rate
        );
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );

        let errors = self.errors_by_kind();
        if !errors.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            for (kind, count) in &errors {
                info!("║   {:20}: {:>6}", kind, count);
            }
        }

        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Churn Probability Distribution:                              ║");
        let distribution = self.probability_distribution();
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
