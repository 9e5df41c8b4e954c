//! Health report types.
//!
//! # Aggregation
//! ```text
//! every service online  → healthy  (200)
//! any service offline   → degraded (503)
//! ```

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Online,
    Offline,
}

/// One probed service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub name: String,
    pub url: String,
    pub status: ServiceStatus,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayInfo {
    pub version: &'static str,
    /// Seconds since the gateway started.
    pub uptime: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub timestamp: String,
    pub gateway: GatewayInfo,
    pub services: Vec<ServiceHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == OverallStatus::Healthy
    }
}

/// Every service must be online for the gateway to report healthy.
pub fn overall(services: &[ServiceHealth]) -> OverallStatus {
    if services.iter().all(|s| s.status == ServiceStatus::Online) {
        OverallStatus::Healthy
    } else {
        OverallStatus::Degraded
    }
}
