//! Container state checker: cross-references expected services against the
//! runtime's set of running containers.

use std::time::Instant;

use crate::verify::report::ServiceStatus;
use crate::verify::runtime::ContainerRuntime;

/// One runtime query for the whole run. A missing container is recorded and
/// the remaining descriptors are still checked; a failed query marks every
/// status unreachable instead of aborting. Returns true when the runtime
/// itself was unreachable.
pub fn check(
    statuses: &mut [ServiceStatus],
    runtime: &dyn ContainerRuntime,
    deadline: Instant,
) -> bool {
    let budget = deadline.saturating_duration_since(Instant::now());
    let running = match runtime.running_containers(budget) {
        Ok(set) => set,
        Err(e) => {
            eprintln!("warn: {}", e);
            for s in statuses.iter_mut() {
                s.container_running = false;
                s.error_detail = Some("runtime unreachable".to_string());
            }
            return true;
        }
    };

    for s in statuses.iter_mut() {
        s.container_running = running.contains(&s.descriptor.name);
        if !s.container_running {
            s.error_detail = Some("container not running".to_string());
        }
    }
    false
}
