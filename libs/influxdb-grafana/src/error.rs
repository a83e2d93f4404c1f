//! Check failures.

use std::fmt;

use thiserror::Error;

use crate::status::ExpectedStatus;

/// A step of the plugin online check, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnlineStep {
    InfluxdbPing,
    InfluxdbRequiresAuth,
    InfluxdbUserAuthorized,
    InfluxdbUserNotAdmin,
    InfluxdbRootIsAdmin,
    GrafanaLoginPage,
    GrafanaAdminAuthorized,
    GrafanaRequiresAuth,
}

impl OnlineStep {
    pub const ALL: [OnlineStep; 8] = [
        Self::InfluxdbPing,
        Self::InfluxdbRequiresAuth,
        Self::InfluxdbUserAuthorized,
        Self::InfluxdbUserNotAdmin,
        Self::InfluxdbRootIsAdmin,
        Self::GrafanaLoginPage,
        Self::GrafanaAdminAuthorized,
        Self::GrafanaRequiresAuth,
    ];

    /// What the step verifies.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InfluxdbPing => "Check that the InfluxDB server replies to ping requests",
            Self::InfluxdbRequiresAuth => "Check that the InfluxDB API requires authentication",
            Self::InfluxdbUserAuthorized => "Check that the InfluxDB user is authorized",
            Self::InfluxdbUserNotAdmin => "Check that the InfluxDB user doesn't have admin rights",
            Self::InfluxdbRootIsAdmin => "Check that the InfluxDB root user has admin rights",
            Self::GrafanaLoginPage => "Check that the Grafana UI server is running",
            Self::GrafanaAdminAuthorized => "Check that the Grafana admin user is authorized",
            Self::GrafanaRequiresAuth => "Check that the Grafana API requires authentication",
        }
    }
}

impl fmt::Display for OnlineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InfluxdbPing => "influxdb_ping",
            Self::InfluxdbRequiresAuth => "influxdb_requires_auth",
            Self::InfluxdbUserAuthorized => "influxdb_user_authorized",
            Self::InfluxdbUserNotAdmin => "influxdb_user_not_admin",
            Self::InfluxdbRootIsAdmin => "influxdb_root_is_admin",
            Self::GrafanaLoginPage => "grafana_login_page",
            Self::GrafanaAdminAuthorized => "grafana_admin_authorized",
            Self::GrafanaRequiresAuth => "grafana_requires_auth",
        };
        f.write_str(name)
    }
}

/// Errors raised by plugin checks.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The service answered with a status the check does not accept.
    #[error("unexpected HTTP status from {url}: expected {expected}, got {actual}")]
    UnexpectedStatus {
        url: String,
        expected: ExpectedStatus,
        actual: u16,
    },

    /// The query returned no rows at all.
    #[error("no data found for query: {query}")]
    NotFound { query: String },

    /// A row was found but holds another value.
    #[error("{header} Expected {expected} but found {actual}")]
    ValueMismatch {
        header: String,
        expected: String,
        actual: String,
    },

    /// The response body does not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// VIP or protocol lookup failed.
    #[error("failed to resolve {service}: {source}")]
    Discovery {
        service: String,
        #[source]
        source: anyhow::Error,
    },

    /// A delegated operation (plugin lifecycle, dashboard UI) failed.
    #[error("{operation} failed: {source}")]
    Collaborator {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("no {0} configured for this client")]
    MissingCollaborator(&'static str),

    /// A step of the online check failed; later steps did not run.
    #[error("online check {step} failed: {source}")]
    Step {
        step: OnlineStep,
        #[source]
        source: Box<CheckError>,
    },
}

impl CheckError {
    /// The innermost error, looking through online-check steps.
    pub fn root(&self) -> &CheckError {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// The online-check step that failed, if any.
    pub fn failed_step(&self) -> Option<OnlineStep> {
        match self {
            Self::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound { .. })
    }

    pub fn is_value_mismatch(&self) -> bool {
        matches!(self.root(), Self::ValueMismatch { .. })
    }

    /// The unexpected status code, if this is a status mismatch.
    pub fn unexpected_status(&self) -> Option<u16> {
        match self.root() {
            Self::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }
}

pub type Result<T, E = CheckError> = std::result::Result<T, E>;
