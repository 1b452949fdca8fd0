//! Sequential per-target execution with failure isolation.

use crate::target::Target;
use anyhow::Result;
use tracing::{error, info};

/// Run `op` against every target in order. Each target gets a banner log
/// line; a failing target is logged and the batch moves on, so one bad
/// controller never aborts the rest. The process exit path is unchanged
/// by per-target failures.
pub fn process_targets<F>(targets: &[Target], banner: &str, mut op: F)
where
    F: FnMut(&Target) -> Result<()>,
{
    for target in targets {
        info!("--- {banner} for {} ---", target.address);
        if let Err(err) = op(target) {
            error!("{}: {err:#}", target.address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DeviceClient;
    use crate::ops::{self, Selection};
    use httpmock::prelude::*;
    use serde_json::json;

    const COLLECTION: &str = "/redfish/v1/TelemetryService/MetricReportDefinitions";

    fn delete_target(target: &Target) -> Result<()> {
        let client = DeviceClient::new(&target.address, &target.username, &target.password, true)?;
        ops::delete_reports(&client, &Selection::All)
    }

    fn target_for(address: String) -> Target {
        Target {
            address,
            username: "u".to_string(),
            password: "p".to_string(),
        }
    }

    #[test]
    fn one_failing_target_does_not_stop_the_batch() {
        let first = MockServer::start();
        let third = MockServer::start();

        let mut mocks = Vec::new();
        for server in [&first, &third] {
            mocks.push(server.mock(|when, then| {
                when.method(GET).path(COLLECTION);
                then.status(200).json_body(json!({"Members": []}));
            }));
        }

        let targets = vec![
            target_for(first.base_url()),
            // Nothing listens here; this target fails at the transport level.
            target_for("http://127.0.0.1:1".to_string()),
            target_for(third.base_url()),
        ];

        process_targets(&targets, "deleting metric report definitions", delete_target);

        for mock in &mocks {
            mock.assert();
        }
    }

    #[test]
    fn targets_run_in_order() {
        let mut seen = Vec::new();
        let targets = vec![
            target_for("192.168.0.120".to_string()),
            target_for("192.168.0.121".to_string()),
        ];

        process_targets(&targets, "noop", |target| {
            seen.push(target.address.clone());
            Ok(())
        });

        assert_eq!(seen, ["192.168.0.120", "192.168.0.121"]);
    }
}
