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

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, Url};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Classified outcome of a failed management-API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} for {method} {url}: {body}")]
    Status {
        method: Method,
        url: String,
        status: u16,
        body: String,
    },
    #[error("invalid response from {url}: {detail}")]
    Decode { url: String, detail: String },
    #[error("cannot build request URL for `{path}`: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },
}

/// HTTP client bound to one management controller. Credentials are sent
/// as basic auth on every request; there is no session or token caching.
#[derive(Debug)]
pub struct DeviceClient {
    base_url: Url,
    http: Client,
    username: String,
    password: String,
}

impl DeviceClient {
    /// `verify_tls: false` maps to `danger_accept_invalid_certs` for
    /// controllers with self-signed certificates. Addresses without a
    /// scheme are dialed over HTTPS.
    pub fn new(address: &str, username: &str, password: &str, verify_tls: bool) -> Result<Self> {
        let raw = if address.contains("://") {
            address.to_string()
        } else {
            format!("https://{address}")
        };
        let base_url = Url::parse(&raw).with_context(|| format!("parsing address `{address}`"))?;
        let http = Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .user_agent(HeaderValue::from_static("telemetryctl/0.1"))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            base_url,
            http,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// GET a resource and decode its JSON body.
    pub fn get(&self, path: &str) -> Result<Value, ApiError> {
        let (url, body) = self.send(Method::GET, path, None)?;
        serde_json::from_str(&body).map_err(|err| ApiError::Decode {
            url,
            detail: err.to_string(),
        })
    }

    /// PATCH a resource with a JSON body. The response body is discarded.
    pub fn patch(&self, path: &str, body: &Value) -> Result<(), ApiError> {
        self.send(Method::PATCH, path, Some(body)).map(|_| ())
    }

    /// DELETE a resource. The response body is discarded.
    pub fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None).map(|_| ())
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(String, String), ApiError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| ApiError::InvalidPath {
                path: path.to_string(),
                source,
            })?;

        debug!(%method, %url, "issuing request");
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status().as_u16();
        let text = response.text().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        // The management API answers 200 for every method used here;
        // anything else is a protocol failure.
        if status != 200 {
            warn!(%method, %url, status, "request rejected");
            return Err(ApiError::Status {
                method,
                url: url.to_string(),
                status,
                body: text,
            });
        }

        debug!(%method, %url, status, "request succeeded");
        Ok((url.to_string(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;
    use serde_json::json;

    #[test]
    fn sends_basic_auth_and_parses_json() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/redfish/v1/TelemetryService")
                .header("authorization", "Basic cm9vdDpjYWx2aW4=");
            then.status(200).json_body(json!({"ServiceEnabled": true}));
        });

        let client = DeviceClient::new(&server.base_url(), "root", "calvin", true).unwrap();
        let body = client.get("/redfish/v1/TelemetryService").unwrap();

        mock.assert();
        assert_eq!(body["ServiceEnabled"], true);
    }

    #[test]
    fn non_200_is_a_status_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/redfish/v1/thing");
            then.status(404).body("not found");
        });

        let client = DeviceClient::new(&server.base_url(), "u", "p", true).unwrap();
        let err = client.delete("/redfish/v1/thing").unwrap_err();
        match err {
            ApiError::Status { status, body, .. } => {
                assert_eq!(status, 404);
                assert_eq!(body, "not found");
            }
            other => panic!("expected status failure, got {other:?}"),
        }
    }

    #[test]
    fn invalid_json_is_a_decode_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/redfish/v1/thing");
            then.status(200).body("<html>surprise</html>");
        });

        let client = DeviceClient::new(&server.base_url(), "u", "p", true).unwrap();
        let err = client.get("/redfish/v1/thing").unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn connection_refused_is_a_transport_failure() {
        let client = DeviceClient::new("http://127.0.0.1:1", "u", "p", true).unwrap();
        let err = client.get("/redfish/v1/thing").unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
    }

    #[test]
    fn patch_sends_json_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/redfish/v1/TelemetryService")
                .json_body(json!({"ServiceEnabled": false}));
            then.status(200).json_body(json!({}));
        });

        let client = DeviceClient::new(&server.base_url(), "u", "p", true).unwrap();
        client
            .patch(
                "/redfish/v1/TelemetryService",
                &json!({"ServiceEnabled": false}),
            )
            .unwrap();
        mock.assert();
    }

    #[test]
    fn bare_address_gets_https_scheme() {
        let client = DeviceClient::new("192.168.0.120", "u", "p", false).unwrap();
        assert_eq!(client.base_url.scheme(), "https");
        assert_eq!(client.base_url.host_str(), Some("192.168.0.120"));
    }
}
