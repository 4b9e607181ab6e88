pub mod audit;
pub mod descriptor;
pub mod output;
pub mod probe;
pub mod report;
pub mod runtime;
pub mod state;

use std::path::Path;
use std::time::{Duration, Instant};

use crate::utils::Result;
use probe::{HttpProbe, RETRY_INTERVAL};
use report::{RunReport, ServiceStatus};
use runtime::CliRuntime;

/// Runs the whole pipeline and renders the report. Returns the overall
/// verdict; only configuration errors escape before a report is produced.
pub fn run_verify(
    config: Option<&Path>,
    output_format: &str,
    runtime_cli: &str,
    global_timeout_secs: u64,
    verbose: bool,
) -> Result<bool> {
    eprintln!("[1/4] Loading service descriptors...");
    let services = descriptor::load(config)?;
    let mut statuses: Vec<ServiceStatus> =
        services.into_iter().map(ServiceStatus::new).collect();

    let deadline = Instant::now() + Duration::from_secs(global_timeout_secs);
    let runtime = CliRuntime::new(runtime_cli);

    eprintln!("[2/4] Querying container runtime...");
    let degraded = state::check(&mut statuses, &runtime, deadline);

    eprintln!("[3/4] Probing health endpoints...");
    probe::probe_all(&mut statuses, &HttpProbe::new(), deadline, RETRY_INTERVAL, verbose);

    eprintln!("[4/4] Auditing container users...");
    audit::audit_all(&mut statuses, &runtime, deadline, verbose);

    let report = RunReport::new(degraded, statuses);
    output::display(&report, output_format, verbose)?;
    Ok(report.overall_healthy())
}
