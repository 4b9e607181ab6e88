//! Endpoint prober: HTTP liveness checks with retry, per-request timeout,
//! and a bounded worker pool. Probes for different services are independent;
//! results are merged back by descriptor index so configuration order is
//! preserved regardless of completion order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::verify::descriptor::ServiceDescriptor;
use crate::verify::report::{ServiceStatus, Tristate};

/// Fixed wait between attempts, matching the deployment scripts this tool
/// replaces.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on concurrent probes; local deployments rarely exceed this.
pub const MAX_WORKERS: usize = 8;

/// HTTP capability. Err carries a human-readable cause ("connection
/// refused", "timeout after 5s") used verbatim as error detail.
pub trait EndpointProbe: Sync {
    fn get_status(&self, url: &str, timeout: Duration) -> std::result::Result<u16, String>;
}

pub struct HttpProbe {
    client: reqwest::blocking::Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        HttpProbe {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl EndpointProbe for HttpProbe {
    fn get_status(&self, url: &str, timeout: Duration) -> std::result::Result<u16, String> {
        match self.client.get(url).timeout(timeout).send() {
            Ok(resp) => Ok(resp.status().as_u16()),
            Err(e) if e.is_timeout() => Err(format!("timeout after {}s", timeout.as_secs())),
            Err(e) if e.is_connect() => Err("connection refused".to_string()),
            Err(e) => Err(format!("request error: {}", e)),
        }
    }
}

struct ProbeOutcome {
    healthy: bool,
    attempts: u32,
    detail: Option<String>,
}

/// Probes every running service that declares a health path. Services whose
/// container is down, or which declare no path, keep `NotApplicable`.
pub fn probe_all(
    statuses: &mut [ServiceStatus],
    probe: &dyn EndpointProbe,
    deadline: Instant,
    interval: Duration,
    verbose: bool,
) {
    let eligible: Vec<usize> = statuses
        .iter()
        .enumerate()
        .filter(|(_, s)| s.container_running && s.descriptor.has_endpoint())
        .map(|(i, _)| i)
        .collect();

    if eligible.is_empty() {
        return;
    }

    let shared: &[ServiceStatus] = statuses;
    let cursor = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, ProbeOutcome)>();
    let workers = eligible.len().min(MAX_WORKERS);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let cursor = &cursor;
            let eligible = &eligible;
            scope.spawn(move || loop {
                let k = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(&idx) = eligible.get(k) else { break };
                let outcome =
                    probe_one(&shared[idx].descriptor, probe, deadline, interval, verbose);
                if tx.send((idx, outcome)).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    for (idx, outcome) in rx {
        let s = &mut statuses[idx];
        s.endpoint_healthy = if outcome.healthy {
            Tristate::Pass
        } else {
            Tristate::Fail
        };
        s.attempts_made = outcome.attempts;
        if let Some(detail) = outcome.detail {
            s.error_detail = Some(detail);
        }
    }
}

fn probe_one(
    desc: &ServiceDescriptor,
    probe: &dyn EndpointProbe,
    deadline: Instant,
    interval: Duration,
    verbose: bool,
) -> ProbeOutcome {
    let url = desc.health_url();
    let mut attempts = 0;
    let mut last_err = String::new();

    while attempts < desc.retries {
        let now = Instant::now();
        if now >= deadline {
            return ProbeOutcome {
                healthy: false,
                attempts,
                detail: Some("global timeout exceeded".to_string()),
            };
        }

        // per-request timeout never extends past the global deadline
        let timeout = Duration::from_secs(desc.timeout_seconds).min(deadline - now);
        attempts += 1;

        match probe.get_status(&url, timeout) {
            Ok(code) if code == desc.expected_status => {
                return ProbeOutcome {
                    healthy: true,
                    attempts,
                    detail: None,
                };
            }
            Ok(code) => last_err = format!("status {}", code),
            Err(e) => last_err = e,
        }

        if verbose {
            eprintln!(
                "  {} attempt {}/{}: {}",
                desc.name, attempts, desc.retries, last_err
            );
        }

        if attempts < desc.retries {
            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(interval.min(remaining));
        }
    }

    ProbeOutcome {
        healthy: false,
        attempts,
        detail: Some(last_err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted prober: a queue of responses per URL, last entry repeating.
    struct FakeProbe {
        responses: Mutex<HashMap<String, Vec<std::result::Result<u16, String>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProbe {
        fn new(responses: &[(&str, Vec<std::result::Result<u16, String>>)]) -> Self {
            FakeProbe {
                responses: Mutex::new(
                    responses
                        .iter()
                        .map(|(url, r)| (url.to_string(), r.clone()))
                        .collect(),
                ),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl EndpointProbe for FakeProbe {
        fn get_status(&self, url: &str, _timeout: Duration) -> std::result::Result<u16, String> {
            self.calls.lock().unwrap().push(url.to_string());
            let mut map = self.responses.lock().unwrap();
            let queue = map.get_mut(url).expect("unexpected url probed");
            if queue.len() > 1 {
                queue.remove(0)
            } else {
                queue[0].clone()
            }
        }
    }

    fn status(name: &str, port: u32, path: &str, running: bool) -> ServiceStatus {
        let mut s = ServiceStatus::new(ServiceDescriptor {
            name: name.to_string(),
            port,
            health_path: path.to_string(),
            expected_status: 200,
            timeout_seconds: 5,
            retries: 3,
            require_nonroot: false,
        });
        s.container_running = running;
        s
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(3600)
    }

    #[test]
    fn healthy_endpoint_passes_first_attempt() {
        let probe = FakeProbe::new(&[("http://localhost:8080/health", vec![Ok(200)])]);
        let mut sts = vec![status("api", 8080, "/health", true)];
        probe_all(&mut sts, &probe, far_deadline(), Duration::ZERO, false);
        assert_eq!(sts[0].endpoint_healthy, Tristate::Pass);
        assert_eq!(sts[0].attempts_made, 1);
        assert!(sts[0].error_detail.is_none());
    }

    #[test]
    fn persistent_503_exhausts_retries() {
        let probe = FakeProbe::new(&[("http://localhost:8080/health", vec![Ok(503)])]);
        let mut sts = vec![status("api", 8080, "/health", true)];
        probe_all(&mut sts, &probe, far_deadline(), Duration::ZERO, false);
        assert_eq!(sts[0].endpoint_healthy, Tristate::Fail);
        assert_eq!(sts[0].attempts_made, 3);
        assert!(sts[0].error_detail.as_deref().unwrap().contains("503"));
    }

    #[test]
    fn recovers_on_second_attempt() {
        let probe = FakeProbe::new(&[(
            "http://localhost:8080/health",
            vec![Err("connection refused".to_string()), Ok(200)],
        )]);
        let mut sts = vec![status("api", 8080, "/health", true)];
        probe_all(&mut sts, &probe, far_deadline(), Duration::ZERO, false);
        assert_eq!(sts[0].endpoint_healthy, Tristate::Pass);
        assert_eq!(sts[0].attempts_made, 2);
    }

    #[test]
    fn down_container_is_skipped() {
        let probe = FakeProbe::new(&[]);
        let mut sts = vec![status("api", 8080, "/health", false)];
        probe_all(&mut sts, &probe, far_deadline(), Duration::ZERO, false);
        assert_eq!(sts[0].endpoint_healthy, Tristate::NotApplicable);
        assert_eq!(sts[0].attempts_made, 0);
        assert_eq!(probe.call_count(), 0);
    }

    #[test]
    fn empty_health_path_is_skipped() {
        let probe = FakeProbe::new(&[]);
        let mut sts = vec![status("db", 5432, "", true)];
        probe_all(&mut sts, &probe, far_deadline(), Duration::ZERO, false);
        assert_eq!(sts[0].endpoint_healthy, Tristate::NotApplicable);
        assert_eq!(probe.call_count(), 0);
    }

    #[test]
    fn one_failing_service_does_not_block_others() {
        let probe = FakeProbe::new(&[
            ("http://localhost:8080/health", vec![Err("connection refused".to_string())]),
            ("http://localhost:8081/health", vec![Ok(200)]),
        ]);
        let mut sts = vec![
            status("bad", 8080, "/health", true),
            status("good", 8081, "/health", true),
        ];
        probe_all(&mut sts, &probe, far_deadline(), Duration::ZERO, false);
        assert_eq!(sts[0].endpoint_healthy, Tristate::Fail);
        assert_eq!(sts[1].endpoint_healthy, Tristate::Pass);
        // order preserved: statuses still indexed by configuration order
        assert_eq!(sts[0].descriptor.name, "bad");
        assert_eq!(sts[1].descriptor.name, "good");
    }

    #[test]
    fn expired_deadline_abandons_probe() {
        let probe = FakeProbe::new(&[("http://localhost:8080/health", vec![Ok(200)])]);
        let mut sts = vec![status("api", 8080, "/health", true)];
        let past = Instant::now() - Duration::from_secs(1);
        probe_all(&mut sts, &probe, past, Duration::ZERO, false);
        assert_eq!(sts[0].endpoint_healthy, Tristate::Fail);
        assert_eq!(sts[0].attempts_made, 0);
        assert_eq!(
            sts[0].error_detail.as_deref(),
            Some("global timeout exceeded")
        );
        assert_eq!(probe.call_count(), 0);
    }
}
