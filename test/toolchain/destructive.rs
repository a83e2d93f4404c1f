//! Disruptive toolchain scenarios against a recording environment.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p stacklight-toolchain-tests --test destructive
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stacklight_influxdb_grafana::{InfluxdbPluginApi, Protocol, StaticDiscovery};
use stacklight_settings::influxdb_grafana;
use stacklight_testing::{HealthError, PluginHealth, PollPolicy};
use stacklight_toolchain_tests::{Environment, ScenarioError, ScenarioStep, Toolchain};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records every environment operation; optionally fails one of them.
#[derive(Default)]
struct RecordingEnvironment {
    calls: Mutex<Vec<String>>,
    fail_on: Option<ScenarioStep>,
}

impl RecordingEnvironment {
    fn failing_on(step: ScenarioStep) -> Self {
        Self {
            fail_on: Some(step),
            ..Self::default()
        }
    }

    fn record(&self, step: ScenarioStep, call: String) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(step) {
            anyhow::bail!("{step} is broken");
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Environment for RecordingEnvironment {
    async fn revert_snapshot(&self, name: &str) -> anyhow::Result<()> {
        self.record(ScenarioStep::RevertSnapshot, format!("revert {name}"))
    }

    async fn emulate_whole_network_disaster(
        &self,
        delay_before_recover: Duration,
    ) -> anyhow::Result<()> {
        self.record(
            ScenarioStep::NetworkDisaster,
            format!("disaster {}s", delay_before_recover.as_secs()),
        )
    }

    async fn master_node_by_role(&self, roles: &[&str]) -> anyhow::Result<String> {
        self.record(ScenarioStep::LocateNode, format!("locate {}", roles.join(",")))?;
        Ok("node-3".to_string())
    }

    async fn simulate_network_interrupt_on_node(
        &self,
        node: &str,
        duration: Duration,
    ) -> anyhow::Result<()> {
        self.record(
            ScenarioStep::NetworkInterrupt,
            format!("interrupt {node} {}s", duration.as_secs()),
        )
    }

    async fn run_ostf(&self) -> anyhow::Result<()> {
        self.record(ScenarioStep::RunOstf, "ostf".to_string())
    }
}

/// Plugin that fails a fixed number of online checks before passing.
struct RecoveringPlugin {
    name: &'static str,
    failures_left: AtomicU32,
    checks: AtomicU32,
}

impl RecoveringPlugin {
    fn new(name: &'static str, failures: u32) -> Arc<Self> {
        Arc::new(Self {
            name,
            failures_left: AtomicU32::new(failures),
            checks: AtomicU32::new(0),
        })
    }

    fn checks(&self) -> u32 {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginHealth for RecoveringPlugin {
    fn plugin_name(&self) -> &str {
        self.name
    }

    async fn check_online(&self) -> Result<(), HealthError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(format!("{} backend unreachable", self.name).into());
        }
        Ok(())
    }
}

fn policy() -> PollPolicy {
    PollPolicy::new(Duration::from_secs(60), Duration::from_secs(5))
}

#[tokio::test(start_paused = true)]
async fn cluster_outage_recovers_all_plugins() {
    stacklight_testing::init_test_tracing();
    let env = Arc::new(RecordingEnvironment::default());
    let influxdb = RecoveringPlugin::new("influxdb_grafana", 3);
    let elasticsearch = RecoveringPlugin::new("elasticsearch_kibana", 0);
    let alerting = RecoveringPlugin::new("lma_infrastructure_alerting", 1);

    let toolchain = Toolchain::new(env.clone(), policy())
        .with_plugin(influxdb.clone())
        .with_plugin(elasticsearch.clone())
        .with_plugin(alerting.clone());
    toolchain.check_cluster_outage_toolchain().await.unwrap();

    assert_eq!(
        env.calls(),
        vec!["revert deploy_ha_toolchain", "disaster 420s", "ostf"]
    );
    assert_eq!(influxdb.checks(), 4);
    assert_eq!(elasticsearch.checks(), 1);
    assert_eq!(alerting.checks(), 2);
}

#[tokio::test(start_paused = true)]
async fn node_outage_interrupts_toolchain_node() {
    stacklight_testing::init_test_tracing();
    let env = Arc::new(RecordingEnvironment::default());
    let influxdb = RecoveringPlugin::new("influxdb_grafana", 1);

    let toolchain = Toolchain::new(env.clone(), policy()).with_plugin(influxdb.clone());
    toolchain.check_node_outage_toolchain().await.unwrap();

    assert_eq!(
        env.calls(),
        vec![
            "revert deploy_toolchain",
            "locate elasticsearch_kibana,influxdb_grafana,infrastructure_alerting",
            "interrupt node-3 30s",
            "ostf",
        ]
    );
    assert_eq!(influxdb.checks(), 2);
}

#[tokio::test(start_paused = true)]
async fn plugin_that_never_recovers_aborts_before_ostf() {
    stacklight_testing::init_test_tracing();
    let env = Arc::new(RecordingEnvironment::default());
    let influxdb = RecoveringPlugin::new("influxdb_grafana", 0);
    let elasticsearch = RecoveringPlugin::new("elasticsearch_kibana", u32::MAX);
    let alerting = RecoveringPlugin::new("lma_infrastructure_alerting", 0);

    let toolchain = Toolchain::new(env.clone(), policy())
        .with_plugin(influxdb)
        .with_plugin(elasticsearch.clone())
        .with_plugin(alerting.clone());
    let err = toolchain.check_cluster_outage_toolchain().await.unwrap_err();

    assert_eq!(err.step(), ScenarioStep::WaitPluginOnline);
    match &err {
        ScenarioError::PluginOffline { plugin, source } => {
            assert_eq!(plugin, "elasticsearch_kibana");
            assert_eq!(source.attempts(), policy().max_attempts());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(elasticsearch.checks(), 13);
    assert_eq!(alerting.checks(), 0);
    assert!(!env.calls().contains(&"ostf".to_string()));
}

/// Plugin whose online check never answers.
struct UnresponsivePlugin;

#[async_trait]
impl PluginHealth for UnresponsivePlugin {
    fn plugin_name(&self) -> &str {
        "influxdb_grafana"
    }

    async fn check_online(&self) -> Result<(), HealthError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn unresponsive_plugin_is_bounded_by_wait_timeout() {
    let env = Arc::new(RecordingEnvironment::default());
    let toolchain =
        Toolchain::new(env.clone(), policy()).with_plugin(Arc::new(UnresponsivePlugin));
    let start = tokio::time::Instant::now();

    let err = toolchain.check_node_outage_toolchain().await.unwrap_err();

    assert_eq!(start.elapsed(), Duration::from_secs(60));
    match &err {
        ScenarioError::PluginOffline { plugin, source } => {
            assert_eq!(plugin, "influxdb_grafana");
            assert!(source.is_stalled());
            assert_eq!(source.attempts(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!env.calls().contains(&"ostf".to_string()));
}

#[tokio::test]
async fn failed_revert_stops_the_scenario() {
    let env = Arc::new(RecordingEnvironment::failing_on(ScenarioStep::RevertSnapshot));
    let influxdb = RecoveringPlugin::new("influxdb_grafana", 0);

    let toolchain = Toolchain::new(env.clone(), policy()).with_plugin(influxdb.clone());
    let err = toolchain.check_node_outage_toolchain().await.unwrap_err();

    assert_eq!(err.step(), ScenarioStep::RevertSnapshot);
    assert_eq!(err.to_string(), "revert_snapshot failed: revert_snapshot is broken");
    assert_eq!(env.calls(), vec!["revert deploy_toolchain"]);
    assert_eq!(influxdb.checks(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_ostf_is_reported() {
    let env = Arc::new(RecordingEnvironment::failing_on(ScenarioStep::RunOstf));

    let toolchain = Toolchain::new(env.clone(), policy());
    let err = toolchain.check_cluster_outage_toolchain().await.unwrap_err();

    assert_eq!(err.step(), ScenarioStep::RunOstf);
    assert_eq!(env.calls().len(), 3);
}

#[tokio::test]
async fn influxdb_plugin_offline_after_outage() {
    stacklight_testing::init_test_tracing();
    let influxdb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&influxdb)
        .await;

    let settings = influxdb_grafana::settings(Path::new(
        "/plugins/influxdb_grafana-1.0-1.0.0-1.noarch.rpm",
    ))
    .with_ports(influxdb.address().port(), None);
    let discovery = StaticDiscovery::new(Protocol::Http)
        .with_vip("influxdb", "127.0.0.1")
        .with_vip("grafana", "127.0.0.1");
    let api = InfluxdbPluginApi::new(settings, Arc::new(discovery)).unwrap();

    let env = Arc::new(RecordingEnvironment::default());
    let policy = PollPolicy::new(Duration::from_secs(1), Duration::from_millis(200));
    let toolchain = Toolchain::new(env.clone(), policy).with_plugin(Arc::new(api));

    let err = toolchain.check_node_outage_toolchain().await.unwrap_err();
    match &err {
        ScenarioError::PluginOffline { plugin, source } => {
            assert_eq!(plugin, "influxdb_grafana");
            assert!(source.last_error().unwrap().to_string().contains("influxdb_ping"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(env.calls().len(), 3);
}
