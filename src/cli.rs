use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stackcheck")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")"))]
#[command(about = "Deployment health verifier for container service stacks")]
#[command(long_about = "Deployment health verifier for container service stacks.\n\n\
Step progress is written to stderr; stdout carries only the rendered report, \
so `--output json` is safe to pipe into other tooling.")]
pub struct Cli {
    /// TOML file with [[service]] descriptors (default: embedded service list)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    pub output: String,

    /// Container runtime CLI (podman or docker)
    #[arg(short, long, default_value = "podman")]
    pub runtime: String,

    /// Ceiling on the whole run, in seconds; slower probes are abandoned
    #[arg(long, default_value_t = 120)]
    pub global_timeout: u64,

    /// Show per-attempt probe results and audited uids
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_documents_stream_split() {
        let cmd = Cli::command();
        let about = cmd.get_long_about().unwrap().to_string();
        assert!(about.contains("stderr"));
        assert!(about.contains("stdout"));
    }
}
