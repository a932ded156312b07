//! Helper functions for integration tests

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pulseboard::{
    AlertEngine, Dashboard, DashboardEvent, Endpoint, HttpSource, SchedulerHandle, Settings,
    SyncOrchestrator,
};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Backend state served by the mock server
#[derive(Debug, Clone)]
pub struct FakeBackend {
    pub cpu_usage: f64,
    pub cpu_temperature: Option<f64>,
    pub memory_percent: f64,
    /// (name, mountpoint, percent)
    pub pools: Vec<(String, String, f64)>,
    /// Endpoints answering with a custom status and body
    pub overrides: HashMap<Endpoint, (u16, Value)>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            cpu_usage: 25.0,
            cpu_temperature: Some(45.0),
            memory_percent: 40.0,
            pools: vec![("Cache Pool".to_string(), "/mnt/cache".to_string(), 30.0)],
            overrides: HashMap::new(),
        }
    }
}

impl FakeBackend {
    pub fn with_cpu(mut self, usage: f64) -> Self {
        self.cpu_usage = usage;
        self
    }

    pub fn with_pools(mut self, pools: &[(&str, f64)]) -> Self {
        self.pools = pools
            .iter()
            .map(|(name, percent)| {
                let mountpoint = format!("/mnt/{}", name.to_lowercase());
                (name.to_string(), mountpoint, *percent)
            })
            .collect();
        self
    }

    pub fn failing(mut self, endpoint: Endpoint, status: u16) -> Self {
        self.overrides.insert(endpoint, (status, json!({})));
        self
    }

    pub fn reporting_error(mut self, endpoint: Endpoint, message: &str) -> Self {
        self.overrides.insert(endpoint, (200, json!({ "error": message })));
        self
    }

    pub fn body(&self, endpoint: Endpoint) -> Value {
        match endpoint {
            Endpoint::System => json!({
                "hostname": "tower",
                "platform": "Linux-6.1.0-x86_64",
                "uptime": "1d 2h 3m",
                "load_avg": [0.5, 0.4, 0.3]
            }),
            Endpoint::Cpu => json!({
                "usage": self.cpu_usage,
                "cores": 8,
                "threads": 16,
                "frequency": 3600.0,
                "temperature": self.cpu_temperature,
                "name": "Test CPU",
                "per_cpu_usage": [self.cpu_usage, self.cpu_usage]
            }),
            Endpoint::Memory => json!({
                "total": 16_000_000_000u64,
                "used": (160_000_000.0 * self.memory_percent) as u64,
                "free": 1_000_000_000u64,
                "percent": self.memory_percent,
                "swap_total": 0,
                "swap_used": 0,
                "swap_free": 0,
                "swap_percent": 0.0
            }),
            Endpoint::Pools => Value::Array(
                self.pools
                    .iter()
                    .map(|(name, mountpoint, percent)| {
                        json!({
                            "name": name,
                            "mountpoint": mountpoint,
                            "fstype": "xfs",
                            "total": 1_000_000_000_000u64,
                            "used": (10_000_000_000.0 * percent) as u64,
                            "free": 0,
                            "percent": percent
                        })
                    })
                    .collect(),
            ),
            Endpoint::Gpu => json!([{
                "name": "Test GPU",
                "temperature": 55.0,
                "utilization": 30.0,
                "memory_total": 8192.0,
                "memory_used": 1024.0,
                "driver_version": "550.54"
            }]),
            Endpoint::Network => json!({
                "bytes_sent": 1_000_000,
                "bytes_recv": 2_000_000,
                "active_interface": {
                    "name": "eth0",
                    "ipv4": "10.0.0.2",
                    "speed": 1000,
                    "mtu": 1500,
                    "is_up": true
                },
                "current_sent": 1_048_576.0,
                "current_recv": 2_097_152.0
            }),
            Endpoint::DiskIo => json!({
                "read_bytes": 10_000,
                "write_bytes": 20_000,
                "read_speed": 1024.0,
                "write_speed": 2048.0
            }),
            Endpoint::Temperatures => json!({"CPU": 45.0, "NVMe Drive": 38.0}),
            Endpoint::Processes => json!([
                {
                    "pid": 1,
                    "name": "init",
                    "cpu_percent": 0.5,
                    "memory_percent": 0.1,
                    "memory_mb": 12.0
                },
                {
                    "pid": 42,
                    "name": "postgres",
                    "cpu_percent": 12.0,
                    "memory_percent": 3.2,
                    "memory_mb": 512.0
                }
            ]),
        }
    }

    /// Replace every mock on the server with this backend state
    pub async fn mount(&self, server: &MockServer) {
        server.reset().await;

        for endpoint in Endpoint::ALL {
            let response = match self.overrides.get(&endpoint) {
                Some((status, body)) => ResponseTemplate::new(*status).set_body_json(body.clone()),
                None => ResponseTemplate::new(200).set_body_json(self.body(endpoint)),
            };

            Mock::given(method("GET"))
                .and(path(endpoint.path()))
                .respond_with(response)
                .mount(server)
                .await;
        }
    }
}

pub async fn start_backend(backend: &FakeBackend) -> MockServer {
    let server = MockServer::start().await;
    backend.mount(&server).await;
    server
}

pub fn http_orchestrator(base_url: &str, settings: Settings) -> SyncOrchestrator {
    let source = HttpSource::new(base_url, Duration::from_secs(2)).unwrap();
    let dashboard = Dashboard::new(settings, AlertEngine::default());
    SyncOrchestrator::new(Arc::new(source), dashboard)
}

/// Scheduler with a timer long enough that only the initial cycle is scheduled
pub fn spawn_scheduler(base_url: &str, settings: Settings) -> SchedulerHandle {
    SchedulerHandle::spawn(http_orchestrator(base_url, settings), Duration::from_secs(3600))
}

/// Scheduler whose initial scheduled cycle has already been applied
///
/// Needs a backend that serves a valid snapshot.
pub async fn spawn_settled_scheduler(base_url: &str, settings: Settings) -> SchedulerHandle {
    let orchestrator = http_orchestrator(base_url, settings);
    let mut events = orchestrator.dashboard().subscribe();
    let handle = SchedulerHandle::spawn(orchestrator, Duration::from_secs(3600));

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(DashboardEvent::Snapshot { .. }) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    })
    .await
    .expect("initial cycle did not complete");

    handle
}

/// Requests the server received for one endpoint
pub async fn request_count(server: &MockServer, endpoint: Endpoint) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == endpoint.path())
        .count()
}

/// Everything currently buffered in a receiver
pub fn drain(rx: &mut broadcast::Receiver<DashboardEvent>) -> Vec<DashboardEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
