use lazy_static::lazy_static;
use log::{debug, warn};
use prometheus::{labels, register_gauge, Gauge};
use std::collections::HashMap;

use crate::config::Target;
use crate::evaluator::EvaluationResult;
use crate::status::StatusLevel;

lazy_static! {
    static ref TLSEXPIRY_DAYS_REMAINING: Gauge =
        register_gauge!("tlsexpiry_days_remaining", "days until certificate expiry").unwrap();
    static ref TLSEXPIRY_STATUS: Gauge = register_gauge!(
        "tlsexpiry_status",
        "check status: 0 ok, 1 warning, 2 critical, 3 unknown"
    )
    .unwrap();
}

/// Pushes one check result to a Prometheus Push Gateway.
///
/// The client appends `/metrics/job/tlsexpiry` to `prometheus_address`.
///
/// Push failures are logged and otherwise ignored; they must never change the
/// outcome of the check itself.
///
/// # Arguments
/// * `target` - The checked target, see [`target_label`]
/// * `result` - The evaluation result to export
/// * `prometheus_address` - Push gateway base address
pub fn push_result(target: &Target, result: &EvaluationResult, prometheus_address: &str) {
    TLSEXPIRY_DAYS_REMAINING.set(result.days_remaining);
    TLSEXPIRY_STATUS.set(status_value(result.status));

    let pushed = prometheus::push_metrics(
        "tlsexpiry",
        grouping_labels(target, result),
        prometheus_address,
        prometheus::gather(),
        None,
    );

    match pushed {
        Ok(_) => debug!("pushed metrics for {} to {}", target, prometheus_address),
        Err(e) => warn!("failed to push metrics to prometheus: {}", e),
    }
}

/// Grouping labels for a pushed result.
pub fn grouping_labels(target: &Target, result: &EvaluationResult) -> HashMap<String, String> {
    labels! {
        "instance".to_owned() => "tlsexpiry".to_owned(),
        "target".to_owned() => target_label(target),
        "expired".to_owned() => (result.days_remaining < 0.0).to_string(),
    }
}

/// Value of the `target` label.
///
/// The push gateway rejects grouping label values containing `/`, so a
/// certificate file is identified by its file name only.
pub fn target_label(target: &Target) -> String {
    let label = match target {
        Target::Remote { host, port, .. } => format!("{}:{}", host, port),
        Target::File(path) => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    };
    label.replace('/', "_")
}

/// Status value exported for a result, mirroring the exit code.
pub fn status_value(status: StatusLevel) -> f64 {
    f64::from(status.exit_code())
}
