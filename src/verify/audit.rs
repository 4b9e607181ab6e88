//! Rootless audit: verifies the effective user inside each container is not
//! uid 0. Runs `id -u` through the runtime's exec capability.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::verify::probe::MAX_WORKERS;
use crate::verify::report::{ServiceStatus, Tristate};
use crate::verify::runtime::ContainerRuntime;

/// Ceiling on a single exec; clamped further by the global deadline.
const EXEC_TIMEOUT: Duration = Duration::from_secs(10);

struct AuditOutcome {
    verified: Tristate,
    detail: Option<String>,
}

/// Audits every running service with `require_nonroot` set. Containers that
/// are down, or services that opted out, keep `NotApplicable` without any
/// exec call. A runtime without exec support degrades the whole stage to
/// `NotApplicable` with a warning.
pub fn audit_all(
    statuses: &mut [ServiceStatus],
    runtime: &dyn ContainerRuntime,
    deadline: Instant,
    verbose: bool,
) {
    let eligible: Vec<usize> = statuses
        .iter()
        .enumerate()
        .filter(|(_, s)| s.container_running && s.descriptor.require_nonroot)
        .map(|(i, _)| i)
        .collect();

    if eligible.is_empty() {
        return;
    }

    if !runtime.supports_exec() {
        eprintln!("warn: runtime does not support exec, skipping rootless audit");
        return;
    }

    let shared: &[ServiceStatus] = statuses;
    let cursor = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, AuditOutcome)>();
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
                    audit_one(&shared[idx].descriptor.name, runtime, deadline, verbose);
                if tx.send((idx, outcome)).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    for (idx, outcome) in rx {
        let s = &mut statuses[idx];
        s.nonroot_verified = outcome.verified;
        if let Some(detail) = outcome.detail {
            s.error_detail = match s.error_detail.take() {
                Some(prev) => Some(format!("{}; {}", prev, detail)),
                None => Some(detail),
            };
        }
    }
}

fn audit_one(
    name: &str,
    runtime: &dyn ContainerRuntime,
    deadline: Instant,
    verbose: bool,
) -> AuditOutcome {
    let now = Instant::now();
    if now >= deadline {
        return AuditOutcome {
            verified: Tristate::Fail,
            detail: Some("global timeout exceeded".to_string()),
        };
    }

    // exec is bounded like the HTTP probes: never past the global deadline
    let timeout = EXEC_TIMEOUT.min(deadline - now);
    let output = match runtime.exec(name, &["id", "-u"], timeout) {
        Ok(out) => out,
        Err(e) => {
            let detail = if Instant::now() >= deadline {
                "global timeout exceeded".to_string()
            } else {
                format!("rootless audit: {}", e)
            };
            return AuditOutcome {
                verified: Tristate::Fail,
                detail: Some(detail),
            };
        }
    };

    let uid: u32 = match output.trim().parse() {
        Ok(uid) => uid,
        Err(_) => {
            return AuditOutcome {
                verified: Tristate::Fail,
                detail: Some(format!("rootless audit: unexpected id output {:?}", output.trim())),
            };
        }
    };

    if verbose {
        eprintln!("  {} runs as uid {}", name, uid);
    }

    if uid == 0 {
        AuditOutcome {
            verified: Tristate::Fail,
            detail: Some("uid=0".to_string()),
        }
    } else {
        AuditOutcome {
            verified: Tristate::Pass,
            detail: None,
        }
    }
}
