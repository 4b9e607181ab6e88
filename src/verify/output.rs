//! Output layer: renders a RunReport as text or json.

use crate::utils::{Result, StackcheckError};
use crate::verify::report::{RunReport, ServiceStatus, Tristate};

pub fn display(report: &RunReport, format: &str, verbose: bool) -> Result<()> {
    match format {
        "json" => display_json(report),
        "text" => {
            display_text(report, verbose);
            Ok(())
        }
        other => Err(StackcheckError::System(format!("unknown format: {}", other))),
    }
}

// ── JSON ────────────────────────────────────────────────────────────────────

fn display_json(report: &RunReport) -> Result<()> {
    // overall_healthy is computed here, never stored on the report
    let value = serde_json::json!({
        "generated_at": report.generated_at,
        "overall_healthy": report.overall_healthy(),
        "runtime_degraded": report.runtime_degraded,
        "statuses": report.statuses,
    });
    let json = serde_json::to_string_pretty(&value)
        .map_err(|e| StackcheckError::System(format!("JSON serialize: {}", e)))?;
    println!("{}", json);
    Ok(())
}

// ── Text ────────────────────────────────────────────────────────────────────

fn display_text(report: &RunReport, verbose: bool) {
    print_section("DEPLOYMENT HEALTH");
    println!("  Generated at : {}", report.generated_at);
    if report.runtime_degraded {
        println!("  ⚠ container runtime unreachable — all services reported down");
    }

    print_section(&format!("SERVICES ({})", report.statuses.len()));
    for (i, s) in report.statuses.iter().enumerate() {
        println!("  [{}/{}]", i + 1, report.statuses.len());
        display_service_text(s, verbose);
    }

    print_section("VERDICT");
    if report.overall_healthy() {
        println!("  ✓ all services healthy");
    } else {
        let failing = report.statuses.iter().filter(|s| !s.healthy()).count();
        println!("  ✗ {} of {} services unhealthy", failing, report.statuses.len());
    }
    println!();
}

fn display_service_text(s: &ServiceStatus, verbose: bool) {
    let glyph = if s.healthy() { "✓" } else { "✗" };
    println!("  {} {} (port {})", glyph, s.descriptor.name, s.descriptor.port);

    println!(
        "      Container  : {}",
        if s.container_running { "✓ running" } else { "✗ not running" }
    );

    match s.endpoint_healthy {
        Tristate::Pass => println!(
            "      Endpoint   : ✓ {} ({} attempt{})",
            s.descriptor.health_url(),
            s.attempts_made,
            if s.attempts_made == 1 { "" } else { "s" }
        ),
        Tristate::Fail => println!(
            "      Endpoint   : ✗ {} ({} attempt{})",
            s.descriptor.health_url(),
            s.attempts_made,
            if s.attempts_made == 1 { "" } else { "s" }
        ),
        Tristate::NotApplicable => println!("      Endpoint   : - skipped"),
    }

    match s.nonroot_verified {
        Tristate::Pass => println!("      Rootless   : ✓ non-root"),
        Tristate::Fail => println!("      Rootless   : ✗ running as root"),
        Tristate::NotApplicable => println!("      Rootless   : - skipped"),
    }

    if let Some(detail) = &s.error_detail {
        println!("      Detail     : {}", detail);
    }

    if verbose {
        println!(
            "      Policy     : expect {}  timeout {}s  retries {}  nonroot {}",
            s.descriptor.expected_status,
            s.descriptor.timeout_seconds,
            s.descriptor.retries,
            if s.descriptor.require_nonroot { "required" } else { "optional" }
        );
    }
    println!();
}

fn print_section(title: &str) {
    println!("\n{}", "─".repeat(60));
    println!("  {}", title);
    println!("{}", "─".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::descriptor::ServiceDescriptor;

    #[test]
    fn unknown_format_rejected() {
        let report = RunReport::new(false, vec![]);
        assert!(display(&report, "yaml", false).is_err());
    }

    #[test]
    fn json_value_includes_computed_verdict() {
        let mut s = ServiceStatus::new(ServiceDescriptor {
            name: "api".to_string(),
            port: 8080,
            health_path: "/health".to_string(),
            expected_status: 200,
            timeout_seconds: 5,
            retries: 3,
            require_nonroot: false,
        });
        s.container_running = true;
        s.endpoint_healthy = Tristate::Pass;
        let report = RunReport::new(false, vec![s]);

        let value = serde_json::json!({
            "overall_healthy": report.overall_healthy(),
            "statuses": report.statuses,
        });
        assert_eq!(value["overall_healthy"], true);
        assert_eq!(value["statuses"][0]["endpoint_healthy"], "pass");
        assert_eq!(value["statuses"][0]["descriptor"]["name"], "api");
    }
}
