//! HTTP GET with status validation.

use std::time::Duration;

use reqwest::Response;
use stacklight_settings::UserCredentials;
use tracing::debug;

use crate::error::{CheckError, Result};
use crate::status::ExpectedStatus;

/// Issues GET requests and fails on unexpected status codes.
#[derive(Debug, Clone)]
pub struct HttpChecker {
    client: reqwest::Client,
}

/// Bound on a single request, connection included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

impl HttpChecker {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// GET `url` and require a status in `expected`.
    ///
    /// `params` are sent as the query string, `auth` as HTTP basic auth. The
    /// query string is left out of error messages as it may carry passwords.
    pub async fn check_get(
        &self,
        url: &str,
        expected: &ExpectedStatus,
        params: &[(&str, &str)],
        auth: Option<&UserCredentials>,
    ) -> Result<Response> {
        let mut request = self.client.get(url);
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(creds) = auth {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(url, status = status.as_u16(), expected = %expected, "GET");

        if expected.contains(status) {
            Ok(response)
        } else {
            Err(CheckError::UnexpectedStatus {
                url: url.to_string(),
                expected: expected.clone(),
                actual: status.as_u16(),
            })
        }
    }
}
