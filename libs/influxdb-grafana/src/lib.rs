//! # stacklight-influxdb-grafana
//!
//! HTTP-level checks of the InfluxDB-Grafana plugin.
//!
//! [`InfluxdbPluginApi`] locates InfluxDB and Grafana through their VIPs,
//! issues queries and page requests, and fails on the first unexpected
//! status code or value. Plugin lifecycle and browser checks are delegated to
//! the deployment framework through [`PluginManager`] and [`DashboardUi`].
//!
//! ## Failures
//!
//! - [`CheckError::UnexpectedStatus`]: a service answered with a status the
//!   check does not accept
//! - [`CheckError::NotFound`]: a query returned no rows at all
//! - [`CheckError::ValueMismatch`]: a row was found with another value
//!
//! No check retries; use [`InfluxdbPluginApi::wait_plugin_online`] to poll.

mod api;
mod checker;
mod collaborators;
mod endpoint;
mod error;
pub mod query;
mod status;

pub use api::InfluxdbPluginApi;
pub use checker::{HttpChecker, DEFAULT_REQUEST_TIMEOUT};
pub use collaborators::{DashboardUi, PluginManager};
pub use endpoint::{Protocol, ServiceDiscovery, ServiceEndpoint, StaticDiscovery};
pub use error::{CheckError, OnlineStep, Result};
pub use query::{QueryResponse, SeriesPoint};
pub use status::ExpectedStatus;
