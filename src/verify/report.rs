//! Per-service status records and the top-level run report.

use serde::{Deserialize, Serialize};

use crate::verify::descriptor::ServiceDescriptor;

/// Outcome of a check that may be intentionally skipped. `NotApplicable`
/// means the check was not performed, not that it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tristate {
    Pass,
    Fail,
    NotApplicable,
}

impl Tristate {
    /// Pass and NotApplicable both count toward overall health.
    pub fn acceptable(self) -> bool {
        !matches!(self, Tristate::Fail)
    }
}

/// One row of the report. Created fresh each run; each pipeline stage owns
/// specific fields (state checker: `container_running`; prober:
/// `endpoint_healthy`, `attempts_made`; auditor: `nonroot_verified`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub descriptor: ServiceDescriptor,
    pub container_running: bool,
    pub endpoint_healthy: Tristate,
    pub nonroot_verified: Tristate,
    pub attempts_made: u32,
    pub error_detail: Option<String>,
}

impl ServiceStatus {
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        ServiceStatus {
            descriptor,
            container_running: false,
            endpoint_healthy: Tristate::NotApplicable,
            nonroot_verified: Tristate::NotApplicable,
            attempts_made: 0,
            error_detail: None,
        }
    }

    pub fn healthy(&self) -> bool {
        self.container_running
            && self.endpoint_healthy.acceptable()
            && self.nonroot_verified.acceptable()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: String,
    /// True when the container runtime itself could not be queried.
    pub runtime_degraded: bool,
    /// One entry per configured descriptor, in configuration order.
    pub statuses: Vec<ServiceStatus>,
}

impl RunReport {
    pub fn new(runtime_degraded: bool, statuses: Vec<ServiceStatus>) -> Self {
        RunReport {
            generated_at: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S %z")
                .to_string(),
            runtime_degraded,
            statuses,
        }
    }

    /// Always derived from `statuses`, never stored, so the verdict cannot
    /// diverge from the data. Vacuously true for an empty configuration.
    pub fn overall_healthy(&self) -> bool {
        self.statuses.iter().all(ServiceStatus::healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(name: &str) -> ServiceStatus {
        ServiceStatus::new(ServiceDescriptor {
            name: name.to_string(),
            port: 8080,
            health_path: "/health".to_string(),
            expected_status: 200,
            timeout_seconds: 5,
            retries: 3,
            require_nonroot: false,
        })
    }

    #[test]
    fn empty_report_is_vacuously_healthy() {
        let report = RunReport::new(false, vec![]);
        assert!(report.overall_healthy());
    }

    #[test]
    fn fresh_status_is_unhealthy() {
        // container_running starts false; NA checks alone never make a pass
        assert!(!status("api").healthy());
    }

    #[test]
    fn not_applicable_counts_as_acceptable() {
        let mut s = status("api");
        s.container_running = true;
        s.endpoint_healthy = Tristate::NotApplicable;
        s.nonroot_verified = Tristate::NotApplicable;
        assert!(s.healthy());
    }

    #[test]
    fn single_fail_sinks_overall() {
        let mut ok = status("a");
        ok.container_running = true;
        ok.endpoint_healthy = Tristate::Pass;
        let mut bad = status("b");
        bad.container_running = true;
        bad.endpoint_healthy = Tristate::Fail;

        let report = RunReport::new(false, vec![ok, bad]);
        assert!(!report.overall_healthy());
    }

    #[test]
    fn tristate_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Tristate::NotApplicable).unwrap(),
            "\"not_applicable\""
        );
    }
}
