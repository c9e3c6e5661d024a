use anyhow::{Context, Result};
use ::metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

pub const EVENTS_TOTAL: &str = "relay_events_total";
pub const JOINS_STALE_TOTAL: &str = "relay_joins_stale_total";
pub const JOINS_SUPPRESSED_TOTAL: &str = "relay_joins_suppressed_total";
pub const NOTIFICATIONS_SENT_TOTAL: &str = "relay_notifications_sent_total";
pub const NOTIFICATIONS_FAILED_TOTAL: &str = "relay_notifications_failed_total";
pub const RESUMES_TOTAL: &str = "relay_resumes_total";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            EVENTS_TOTAL,
            Unit::Count,
            "Voice-state transitions seen, labelled by classification."
        );
        describe_counter!(
            JOINS_STALE_TOTAL,
            "Joins dropped because the member was not in the live roster."
        );
        describe_counter!(
            JOINS_SUPPRESSED_TOTAL,
            "Joins suppressed by the per-member cooldown."
        );
        describe_counter!(
            NOTIFICATIONS_SENT_TOTAL,
            "Join notifications delivered."
        );
        describe_counter!(
            NOTIFICATIONS_FAILED_TOTAL,
            "Join notifications that could not be delivered."
        );
        describe_counter!(
            RESUMES_TOTAL,
            "Gateway session resumes (each clears the cooldown state)."
        );
    });
}

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
/// Must be called from inside the tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("prometheus: listen on {addr}"))?;
    ensure_metrics_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
