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

use std::path::Path;
use thiserror::Error;
use tracing::error;

/// One controller to operate on, built fresh per invocation from flags
/// or from one row of the target file. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub address: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("a single target requires --ip, --username and --password together")]
    IncompleteTarget,
    #[error("unable to read target file {path}: {source}")]
    UnreadableFile {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Resolve the ordered target list: either the batch file or a fully
/// specified single target. Runs before any network activity, so a
/// configuration error here terminates with zero calls made.
pub fn resolve(
    ip: Option<&str>,
    username: Option<&str>,
    password: Option<&str>,
    file: Option<&Path>,
) -> Result<Vec<Target>, TargetError> {
    if let Some(path) = file {
        return load_target_file(path);
    }
    match (ip, username, password) {
        (Some(address), Some(username), Some(password)) => Ok(vec![Target {
            address: address.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }]),
        _ => Err(TargetError::IncompleteTarget),
    }
}

/// Read the batch file: CSV, UTF-8, first row a header (always
/// discarded), columns positionally address/username/password. Trailing
/// columns are ignored and field contents are not validated; a bad
/// address simply fails later at the transport level. Rows that cannot
/// be parsed are logged and skipped without aborting the batch.
pub fn load_target_file(path: &Path) -> Result<Vec<Target>, TargetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| TargetError::UnreadableFile {
            path: path.display().to_string(),
            source,
        })?;

    let mut targets = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let line = index + 2; // line 1 is the header
        match record {
            Err(err) => error!("skipping line {line} of {}: {err}", path.display()),
            Ok(row) => {
                let (Some(address), Some(username), Some(password)) =
                    (row.get(0), row.get(1), row.get(2))
                else {
                    error!(
                        "skipping line {line} of {}: expected address,username,password",
                        path.display()
                    );
                    continue;
                };
                targets.push(Target {
                    address: address.to_string(),
                    username: username.to_string(),
                    password: password.to_string(),
                });
            }
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn write_file(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("targets.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn skips_header_and_preserves_row_order() {
        let dir = tempdir().unwrap();
        let path = write_file(
            &dir,
            "ip,username,password\n192.168.0.120,root,calvin\n192.168.0.121,admin,secret\n",
        );

        let targets = load_target_file(&path).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].address, "192.168.0.120");
        assert_eq!(targets[0].username, "root");
        assert_eq!(targets[0].password, "calvin");
        assert_eq!(targets[1].address, "192.168.0.121");
    }

    #[test]
    fn ignores_trailing_columns() {
        let dir = tempdir().unwrap();
        let path = write_file(
            &dir,
            "ip,username,password,reports\n192.168.0.120,root,calvin,PowerMetrics\n",
        );

        let targets = load_target_file(&path).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].password, "calvin");
    }

    #[test]
    fn skips_short_rows_without_aborting() {
        let dir = tempdir().unwrap();
        let path = write_file(
            &dir,
            "ip,username,password\n192.168.0.120,root\n192.168.0.121,admin,secret\n",
        );

        let targets = load_target_file(&path).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].address, "192.168.0.121");
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = load_target_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, TargetError::UnreadableFile { .. }));
    }

    #[test]
    fn single_target_requires_all_three_fields() {
        let err = resolve(Some("192.168.0.120"), Some("root"), None, None).unwrap_err();
        assert!(matches!(err, TargetError::IncompleteTarget));

        let targets = resolve(Some("192.168.0.120"), Some("root"), Some("calvin"), None).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].address, "192.168.0.120");
    }

    #[test]
    fn file_takes_precedence_when_supplied() {
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "ip,username,password\n10.0.0.1,root,calvin\n");

        let targets = resolve(None, None, None, Some(&path)).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].address, "10.0.0.1");
    }
}
