//! Shared fixtures for the InfluxDB-Grafana contract tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use stacklight_influxdb_grafana::{InfluxdbPluginApi, Protocol, ServiceDiscovery};
use stacklight_settings::influxdb_grafana;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LEGACY_PACKAGE: &str = "/plugins/influxdb_grafana-0.9-0.9.0-1.noarch.rpm";
pub const CURRENT_PACKAGE: &str = "/plugins/influxdb_grafana-1.0-1.0.0-1.noarch.rpm";

/// Statuses that make every online step pass, in step order.
pub const ONLINE_STATUSES: [u16; 8] = [204, 401, 200, 403, 200, 200, 200, 401];

/// Discovery whose VIP table can change between lookups.
pub struct FakeDiscovery {
    vips: Mutex<HashMap<String, String>>,
    protocol: Protocol,
    protocol_lookups: AtomicUsize,
}

impl FakeDiscovery {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            vips: Mutex::new(HashMap::new()),
            protocol,
            protocol_lookups: AtomicUsize::new(0),
        }
    }

    pub fn set_vip(&self, name: &str, address: &str) {
        self.vips
            .lock()
            .unwrap()
            .insert(name.to_string(), address.to_string());
    }

    pub fn protocol_lookups(&self) -> usize {
        self.protocol_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceDiscovery for FakeDiscovery {
    async fn vip_address(&self, name: &str) -> anyhow::Result<String> {
        self.vips
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("VIP '{name}' not found"))
    }

    async fn http_protocol(&self) -> anyhow::Result<Protocol> {
        self.protocol_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.protocol)
    }
}

/// Mock InfluxDB and Grafana servers.
pub struct Backends {
    pub influxdb: MockServer,
    pub grafana: MockServer,
}

impl Backends {
    pub async fn start() -> Self {
        stacklight_testing::init_test_tracing();
        Self {
            influxdb: MockServer::start().await,
            grafana: MockServer::start().await,
        }
    }

    /// Client for a plugin package, pointed at the mock servers.
    pub fn api(&self, package: &str) -> InfluxdbPluginApi {
        let discovery = FakeDiscovery::new(Protocol::Http);
        discovery.set_vip("influxdb", "127.0.0.1");
        discovery.set_vip("grafana", "127.0.0.1");

        let settings = influxdb_grafana::settings(Path::new(package)).with_ports(
            self.influxdb.address().port(),
            Some(self.grafana.address().port()),
        );
        InfluxdbPluginApi::new(settings, Arc::new(discovery)).unwrap()
    }

    /// Number of requests both servers received.
    pub async fn request_count(&self) -> usize {
        let influxdb = self.influxdb.received_requests().await.unwrap_or_default();
        let grafana = self.grafana.received_requests().await.unwrap_or_default();
        influxdb.len() + grafana.len()
    }

    /// Mount the eight online-check endpoints answering with `statuses`.
    pub async fn mount_online(&self, statuses: [u16; 8]) {
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(statuses[0]))
            .mount(&self.influxdb)
            .await;

        self.mount_query("influxdb", "rogue", "show measurements", statuses[1])
            .await;
        self.mount_query("influxdb", "influxdbpass", "show measurements", statuses[2])
            .await;
        self.mount_query("influxdb", "influxdbpass", "show stats", statuses[3])
            .await;
        self.mount_query("root", "r00tme", "show stats", statuses[4])
            .await;

        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(statuses[5]))
            .mount(&self.grafana)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/org"))
            .and(basic_auth("grafana", "grafanapass"))
            .respond_with(
                ResponseTemplate::new(statuses[6])
                    .set_body_json(json!({ "id": 1, "name": "Main Org." })),
            )
            .mount(&self.grafana)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/org"))
            .and(basic_auth("grafana", "rogue"))
            .respond_with(ResponseTemplate::new(statuses[7]))
            .mount(&self.grafana)
            .await;
    }

    async fn mount_query(&self, user: &str, password: &str, query: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("db", "lma"))
            .and(query_param("u", user))
            .and(query_param("p", password))
            .and(query_param("q", query))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "results": [{}] })))
            .mount(&self.influxdb)
            .await;
    }

    /// Answer `query` from `user` with `body`.
    pub async fn mount_query_result(&self, user: &str, query: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("u", user))
            .and(query_param("q", query))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.influxdb)
            .await;
    }
}

/// Query body with one series holding `rows`.
pub fn series_body(name: &str, rows: Vec<Value>) -> Value {
    json!({
        "results": [{
            "statement_id": 0,
            "series": [{
                "name": name,
                "columns": ["time", "value"],
                "values": rows
            }]
        }]
    })
}

/// Query body of a statement that matched nothing.
pub fn empty_body() -> Value {
    json!({ "results": [{ "statement_id": 0 }] })
}
