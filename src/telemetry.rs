//! Enumeration of metric report definitions on one controller.

use crate::client::{ApiError, DeviceClient};
use serde_json::Value;
use tracing::debug;

/// Telemetry service root. PATCHed to toggle `ServiceEnabled`.
pub const SERVICE_PATH: &str = "/redfish/v1/TelemetryService";

/// Metric report definition collection.
pub const REPORT_COLLECTION_PATH: &str = "/redfish/v1/TelemetryService/MetricReportDefinitions";

/// Detail path for one report named by the operator. No existence check
/// is performed; unknown names surface as whatever the API answers.
pub fn report_path(name: &str) -> String {
    format!("{REPORT_COLLECTION_PATH}/{name}")
}

/// One member of the report collection. `id` is the final segment of the
/// detail path and doubles as the human-readable report name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRef {
    pub id: String,
    pub path: String,
}

impl ReportRef {
    pub fn named(name: &str) -> Self {
        Self {
            id: name.to_string(),
            path: report_path(name),
        }
    }
}

/// One metric belonging to a report's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricEntry {
    pub report: String,
    pub metric: String,
}

/// List the collection members in server order. A response without a
/// `Members` field is an empty collection, not an error; a member
/// without an `@odata.id` is a decode failure.
pub fn list_reports(client: &DeviceClient) -> Result<Vec<ReportRef>, ApiError> {
    let body = client.get(REPORT_COLLECTION_PATH)?;
    let Some(members) = body.get("Members").and_then(Value::as_array) else {
        debug!("collection has no Members field, treating as empty");
        return Ok(Vec::new());
    };

    let mut reports = Vec::with_capacity(members.len());
    for member in members {
        let Some(path) = member.get("@odata.id").and_then(Value::as_str) else {
            return Err(ApiError::Decode {
                url: REPORT_COLLECTION_PATH.to_string(),
                detail: "collection member without @odata.id".to_string(),
            });
        };
        let id = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(path)
            .to_string();
        reports.push(ReportRef {
            id,
            path: path.to_string(),
        });
    }
    Ok(reports)
}

/// Dereference one report and map its `Metrics` array into entries.
/// A report without a `Metrics` field yields no entries.
pub fn report_metrics(
    client: &DeviceClient,
    report: &ReportRef,
) -> Result<Vec<MetricEntry>, ApiError> {
    let body = client.get(&report.path)?;
    let Some(metrics) = body.get("Metrics").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    Ok(metrics
        .iter()
        .map(|metric| MetricEntry {
            report: report.id.clone(),
            metric: metric
                .get("MetricId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect())
}
