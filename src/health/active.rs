//! Active health probing of backend services.
//!
//! # Responsibilities
//! - Probe every configured service's health path concurrently
//! - Bound each probe by a fixed timeout
//! - Aggregate results into a `HealthReport`

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;
use chrono::{SecondsFormat, Utc};
use futures_util::future::join_all;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use tokio::time;
use url::Url;

use crate::health::state::{overall, GatewayInfo, HealthReport, ServiceHealth, ServiceStatus};
use crate::observability::metrics;

pub struct HealthChecker {
    client: Client<HttpConnector, Body>,
    services: BTreeMap<String, Url>,
    path: String,
    timeout: Duration,
    started: Instant,
}

impl HealthChecker {
    pub fn new(
        client: Client<HttpConnector, Body>,
        services: BTreeMap<String, Url>,
        path: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            services,
            path,
            timeout,
            started: Instant::now(),
        }
    }

    /// Probe all services at once; total latency is bounded by one timeout.
    pub async fn check_all(&self) -> HealthReport {
        let probes = self.services.iter().map(|(name, url)| self.probe(name, url));
        let services = join_all(probes).await;

        HealthReport {
            status: overall(&services),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            gateway: GatewayInfo {
                version: env!("CARGO_PKG_VERSION"),
                uptime: self.started.elapsed().as_secs_f64(),
            },
            services,
        }
    }

    async fn probe(&self, name: &str, base: &Url) -> ServiceHealth {
        let uri = format!("{}{}", base.as_str().trim_end_matches('/'), self.path);
        let started = Instant::now();

        let online = match Request::get(&uri)
            .header("user-agent", "business-gateway-health-check")
            .body(Body::empty())
        {
            Ok(request) => match time::timeout(self.timeout, self.client.request(request)).await {
                Ok(Ok(response)) => {
                    let success = response.status().is_success();
                    if !success {
                        tracing::warn!(service = name, status = %response.status(), "Health check failed: non-success status");
                    }
                    success
                }
                Ok(Err(e)) => {
                    tracing::warn!(service = name, error = %e, "Health check failed: connection error");
                    false
                }
                Err(_) => {
                    tracing::warn!(service = name, "Health check failed: timeout");
                    false
                }
            },
            Err(e) => {
                tracing::error!(service = name, error = %e, "Failed to build health check request");
                false
            }
        };

        metrics::record_service_health(name, online);

        ServiceHealth {
            name: name.to_string(),
            url: base.to_string(),
            status: if online {
                ServiceStatus::Online
            } else {
                ServiceStatus::Offline
            },
            response_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::state::OverallStatus;
    use hyper_util::rt::TokioExecutor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn checker(services: BTreeMap<String, Url>) -> HealthChecker {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        HealthChecker::new(client, services, "/health".into(), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_all_online_is_healthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let services = BTreeMap::from([("auth".to_string(), server.uri().parse().unwrap())]);
        let report = checker(services).check_all().await;

        assert_eq!(report.status, OverallStatus::Healthy);
        assert_eq!(report.services[0].status, ServiceStatus::Online);
    }

    #[tokio::test]
    async fn test_unreachable_service_degrades() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = listener.local_addr().unwrap();
        drop(listener);

        let services = BTreeMap::from([
            ("auth".to_string(), server.uri().parse().unwrap()),
            ("sales".to_string(), format!("http://{dead}").parse().unwrap()),
        ]);
        let report = checker(services).check_all().await;

        assert!(!report.is_healthy());
        let sales = report.services.iter().find(|s| s.name == "sales").unwrap();
        assert_eq!(sales.status, ServiceStatus::Offline);
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let services = BTreeMap::from([("clients".to_string(), server.uri().parse().unwrap())]);
        let report = checker(services).check_all().await;

        assert_eq!(report.status, OverallStatus::Degraded);
        assert!(report.services[0].response_time_ms < 5_000);
    }
}
