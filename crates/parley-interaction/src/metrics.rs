//! In-memory usage metrics for model calls.

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::Lazy;

/// Cost per 1K tokens in USD, per backend.
static MODEL_COSTS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("gpt-3.5-turbo", 0.002),
        ("deepseek", 0.001),
        ("llama-2", 0.0015),
    ])
});

/// Rough token count for backends that report no usage: whitespace
/// tokenization of the visible text.
pub fn estimate_tokens(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Accumulated usage for one backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelUsage {
    pub requests: u64,
    pub tokens: u64,
    pub cost: f64,
}

/// Collects request counts, latencies, and per-model token cost for the
/// running session.
///
/// Purely in-memory; rendering is the display layer's concern. Created
/// once at session start and threaded through the chat loop, not
/// re-instantiated per call.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    requests: u64,
    errors: u64,
    response_times: Vec<Duration>,
    usage: HashMap<String, ModelUsage>,
}

impl MetricsCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed model request.
    pub fn record_request(&mut self, model: &str, elapsed: Duration, tokens: u64) {
        let cost = cost_of(model, tokens);
        tracing::info!(
            model,
            elapsed_ms = elapsed.as_millis() as u64,
            tokens,
            cost,
            "model request completed"
        );

        self.requests += 1;
        self.response_times.push(elapsed);

        let usage = self.usage.entry(model.to_string()).or_default();
        usage.requests += 1;
        usage.tokens += tokens;
        usage.cost += cost;
    }

    /// Records one failed model request.
    pub fn record_error(&mut self, model: &str) {
        tracing::error!(model, "model request failed");
        self.errors += 1;
    }

    /// Total completed requests.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Total failed requests.
    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Failed requests as a fraction of all attempts; zero when nothing
    /// has been attempted yet.
    pub fn error_rate(&self) -> f64 {
        let attempts = self.requests + self.errors;
        if attempts == 0 {
            0.0
        } else {
            self.errors as f64 / attempts as f64
        }
    }

    /// Mean latency over completed requests; zero when there are none.
    pub fn average_response_time(&self) -> Duration {
        if self.response_times.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.response_times.iter().sum();
        total / self.response_times.len() as u32
    }

    /// Accumulated cost across all backends.
    pub fn total_cost(&self) -> f64 {
        self.usage.values().map(|u| u.cost).sum()
    }

    /// Per-backend usage.
    pub fn usage(&self) -> &HashMap<String, ModelUsage> {
        &self.usage
    }
}

/// USD cost of `tokens` on `model`; zero for backends with no listed rate.
fn cost_of(model: &str, tokens: u64) -> f64 {
    MODEL_COSTS
        .get(model)
        .map(|rate| tokens as f64 / 1000.0 * rate)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("three short words"), 3);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_cost_accumulates_per_model() {
        let mut metrics = MetricsCollector::new();
        metrics.record_request("gpt-3.5-turbo", Duration::from_millis(100), 1000);
        metrics.record_request("gpt-3.5-turbo", Duration::from_millis(300), 500);
        metrics.record_request("deepseek", Duration::from_millis(10), 2000);

        assert_eq!(metrics.requests(), 3);
        let gpt = &metrics.usage()["gpt-3.5-turbo"];
        assert_eq!(gpt.requests, 2);
        assert_eq!(gpt.tokens, 1500);
        assert!((gpt.cost - 0.003).abs() < 1e-9);
        assert!((metrics.total_cost() - 0.005).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_costs_nothing() {
        let mut metrics = MetricsCollector::new();
        metrics.record_request("mystery", Duration::from_millis(5), 10_000);
        assert_eq!(metrics.total_cost(), 0.0);
    }

    #[test]
    fn test_error_rate() {
        let mut metrics = MetricsCollector::new();
        assert_eq!(metrics.error_rate(), 0.0);

        metrics.record_request("deepseek", Duration::from_millis(5), 10);
        metrics.record_error("deepseek");
        assert_eq!(metrics.errors(), 1);
        assert!((metrics.error_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_average_response_time() {
        let mut metrics = MetricsCollector::new();
        assert_eq!(metrics.average_response_time(), Duration::ZERO);

        metrics.record_request("deepseek", Duration::from_millis(100), 1);
        metrics.record_request("deepseek", Duration::from_millis(300), 1);
        assert_eq!(metrics.average_response_time(), Duration::from_millis(200));
    }
}
