//! Prometheus metrics: HTTP request middleware, the `/metrics` endpoint,
//! and business counters.
//!
//! Everything here is a no-op when `OBSERVABILITY_ENABLED` is `false` or `0`.

use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true)
    })
}

/// Installs the Prometheus recorder and spawns its upkeep task.
///
/// Must be called from inside the Tokio runtime. Failing to install the
/// recorder disables `/metrics` but does not stop the server.
pub fn init_metrics() {
    if !is_observability_enabled() {
        tracing::info!("observability disabled, metrics recorder not installed");
        return;
    }

    let handle = match PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5,
                10.0,
            ],
        )
        .and_then(|builder| builder.install_recorder())
    {
        Ok(handle) => handle,
        Err(error) => {
            tracing::warn!(error = %error, "failed to install Prometheus recorder");
            return;
        }
    };

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    let _ = PROMETHEUS_HANDLE.set(handle);
}

/// `GET /metrics` in the Prometheus text format.
pub async fn metrics_handler() -> Response {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

fn status_category(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path)
        .record(latency);
    counter!("http_requests_by_status", "status_category" => status_category(status))
        .increment(1);

    gauge!("http_requests_active").decrement(1.0);

    response
}

pub fn track_user_registered() {
    if !is_observability_enabled() {
        return;
    }
    counter!("users_registered_total").increment(1);
}

/// `outcome` is `success` or a short failure reason.
pub fn track_login(outcome: &'static str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("auth_logins_total", "outcome" => outcome).increment(1);
}

pub fn track_tokens_issued() {
    if !is_observability_enabled() {
        return;
    }
    counter!("jwt_tokens_issued_total").increment(1);
}

pub fn track_authorization_check(allowed: bool) {
    if !is_observability_enabled() {
        return;
    }
    let status = if allowed { "allowed" } else { "denied" };
    counter!("authorization_checks_total", "status" => status).increment(1);
}

pub fn track_organization_created() {
    if !is_observability_enabled() {
        return;
    }
    counter!("organizations_created_total").increment(1);
}

pub fn track_study_pack_generated(provider: &'static str, outcome: &'static str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("study_packs_generated_total", "provider" => provider, "outcome" => outcome)
        .increment(1);
}

pub fn track_study_pack_approved() {
    if !is_observability_enabled() {
        return;
    }
    counter!("study_packs_approved_total").increment(1);
}

pub fn track_quiz_attempt(score: i32) {
    if !is_observability_enabled() {
        return;
    }
    counter!("quiz_attempts_total").increment(1);
    histogram!("quiz_attempt_score").record(f64::from(score));
}

pub fn track_submission_graded() {
    if !is_observability_enabled() {
        return;
    }
    counter!("submissions_graded_total").increment(1);
}
