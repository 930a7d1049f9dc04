use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

struct ClientMetrics {
    registry: Registry,
    api_requests_total: IntCounterVec,
    basket_sync_failures_total: IntCounter,
}

// Global registry
static METRICS: OnceLock<ClientMetrics> = OnceLock::new();

/// Register the client counters. Later calls are no-ops.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if METRICS.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let api_requests_total = IntCounterVec::new(
        Opts::new(
            "mybooks_api_requests_total",
            "Total number of requests sent to the bookstore API",
        ),
        &["method", "status"],
    )?;

    let basket_sync_failures_total = IntCounter::with_opts(Opts::new(
        "mybooks_basket_sync_failures_total",
        "Basket uploads that the backend did not accept",
    ))?;

    registry.register(Box::new(api_requests_total.clone()))?;
    registry.register(Box::new(basket_sync_failures_total.clone()))?;

    let _ = METRICS.set(ClientMetrics {
        registry,
        api_requests_total,
        basket_sync_failures_total,
    });
    Ok(())
}

/// `status` is `ok` or the `ApiError::kind` label of the failure.
pub fn record_api_request(method: &str, status: &str) {
    if let Some(metrics) = METRICS.get() {
        metrics
            .api_requests_total
            .with_label_values(&[method, status])
            .inc();
    }
}

pub fn record_basket_sync_failure() {
    if let Some(metrics) = METRICS.get() {
        metrics.basket_sync_failures_total.inc();
    }
}

/// Text exposition of every registered metric; empty before `init_metrics`.
pub fn get_metrics() -> Result<String, prometheus::Error> {
    let Some(metrics) = METRICS.get() else {
        return Ok(String::new());
    };

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metrics.registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        init_metrics().unwrap();
        init_metrics().unwrap();

        record_api_request("GET", "ok");
        record_basket_sync_failure();

        let text = get_metrics().unwrap();
        assert!(text.contains("mybooks_api_requests_total"));
        assert!(text.contains("mybooks_basket_sync_failures_total"));
    }
}
