// telemetryctl - manage telemetry metric reports on Redfish controllers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

use crate::client::DeviceClient;
use crate::telemetry::{self, ReportRef, SERVICE_PATH};
use anyhow::{Context, Result};
use serde_json::json;
use std::fmt;
use std::path::Path;
use tracing::{error, info};

/// Fixed export file name, written to the current working directory.
pub const EXPORT_FILE_NAME: &str = "TelemetryReports.csv";

/// Which reports an operation applies to. `Named` bypasses enumeration
/// entirely and constructs detail paths from the given names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Named(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    Enabled,
    Disabled,
}

impl DesiredState {
    fn as_bool(self) -> bool {
        matches!(self, DesiredState::Enabled)
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredState::Enabled => write!(f, "Enabled"),
            DesiredState::Disabled => write!(f, "Disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    ReportsOnly,
    WithMetrics,
}

fn selected_reports(client: &DeviceClient, selection: &Selection) -> Result<Vec<ReportRef>> {
    match selection {
        Selection::All => {
            let reports = telemetry::list_reports(client)?;
            info!("found {} metric report definitions", reports.len());
            Ok(reports)
        }
        Selection::Named(names) => Ok(names.iter().map(|name| ReportRef::named(name)).collect()),
    }
}

/// Delete the selected reports. Enumeration failures abort the target;
/// individual DELETE failures are logged and the remaining reports are
/// still attempted.
pub fn delete_reports(client: &DeviceClient, selection: &Selection) -> Result<()> {
    for report in selected_reports(client, selection)? {
        info!("deleting metric report {}", report.id);
        if let Err(err) = client.delete(&report.path) {
            error!("failed to delete metric report {}: {err}", report.id);
        }
    }
    Ok(())
}

/// Toggle the telemetry service and the selected reports.
///
/// Ordering is a correctness requirement: a disabled service rejects
/// enabled reports, so the service PATCH goes first when enabling and
/// last when disabling. A service PATCH failure is fatal for the target;
/// per-report failures are logged and the remaining reports continue.
pub fn set_reports_state(
    client: &DeviceClient,
    selection: &Selection,
    reports_state: DesiredState,
    service_state: DesiredState,
) -> Result<()> {
    let reports = selected_reports(client, selection)?;

    if service_state == DesiredState::Enabled {
        set_service_state(client, service_state)?;
    }

    let body = json!({ "MetricReportDefinitionEnabled": reports_state.as_bool() });
    for report in &reports {
        match client.patch(&report.path, &body) {
            Ok(()) => info!("metric report {} set to {reports_state}", report.id),
            Err(err) => error!("failed to set metric report {}: {err}", report.id),
        }
    }

    if service_state == DesiredState::Disabled {
        set_service_state(client, service_state)?;
    }
    Ok(())
}

fn set_service_state(client: &DeviceClient, state: DesiredState) -> Result<()> {
    client
        .patch(SERVICE_PATH, &json!({ "ServiceEnabled": state.as_bool() }))
        .context("setting telemetry service state")?;
    info!("telemetry service set to {state}");
    Ok(())
}

/// Export the report collection to `out_path`, one row per report
/// (reports-only) or one row per metric (with-metrics). Rows accumulate
/// in enumeration order and are written once at the end, so a failure
/// partway through enumeration produces no file.
pub fn export_reports(client: &DeviceClient, mode: ExportMode, out_path: &Path) -> Result<()> {
    let reports = telemetry::list_reports(client)?;
    info!("found {} metric report definitions", reports.len());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for report in &reports {
        match mode {
            ExportMode::ReportsOnly => rows.push(vec![report.id.clone()]),
            ExportMode::WithMetrics => {
                for entry in telemetry::report_metrics(client, report)? {
                    rows.push(vec![entry.report, entry.metric]);
                }
            }
        }
    }

    let mut writer = csv::Writer::from_path(out_path)
        .with_context(|| format!("creating {}", out_path.display()))?;
    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    info!("exported {} rows to {}", rows.len(), out_path.display());
    Ok(())
}
