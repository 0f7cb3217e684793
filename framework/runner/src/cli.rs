use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct ScenarioCli {
    /// Base URL of the target API, e.g. `http://localhost:8001`
    #[clap(short, long)]
    pub connection_string: Option<String>,

    /// The number of virtual users to run
    #[clap(long)]
    pub users: Option<usize>,

    /// Assign a behaviour to a number of virtual users. Specify the behaviour and the number of
    /// users to assign it to in the format `behaviour:count`, for example `--behaviour=allocate:5`.
    ///
    /// The count is optional and defaults to 1. The flag can be given multiple times. The total
    /// number of assigned users must not exceed `--users`; any remainder runs the default
    /// behaviour.
    #[clap(long, short, value_parser = parse_user_behaviour)]
    pub behaviour: Vec<(String, usize)>,

    /// The number of seconds to run the scenario for
    #[clap(long)]
    pub duration: Option<u64>,

    /// Run as a soak test, ignoring any configured duration and continuing until stopped
    #[clap(long, default_value = "false")]
    pub soak: bool,

    /// Do not show a progress bar on the CLI.
    ///
    /// Recommended for CI environments where the bar only adds noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Where emitted metrics go
    #[clap(long, value_enum, default_value_t = ReporterOpt::Graphite)]
    pub reporter: ReporterOpt,

    /// Hostname of the metrics collector
    #[clap(long, default_value = "localhost")]
    pub metrics_host: String,

    /// Port of the metrics collector
    #[clap(long, default_value = "2003")]
    pub metrics_port: u16,

    /// Namespace that scenario resources are created in
    #[clap(long, default_value = "default")]
    pub namespace: String,

    /// Replica count that scale-up steps target
    #[clap(long, default_value = "100")]
    pub fleet_size: u32,

    /// Seconds a convergence wait may run before it is reported as timed out
    #[clap(long, default_value = "1800")]
    pub deadline_seconds: u64,

    /// Minimum think-time between a user's scenario iterations, in milliseconds
    #[clap(long, default_value = "500")]
    pub min_wait_ms: u64,

    /// Maximum think-time between a user's scenario iterations, in milliseconds
    #[clap(long, default_value = "900")]
    pub max_wait_ms: u64,

    /// Identifier for this run, used to keep resource names from colliding across runs.
    /// Generated when not set.
    #[clap(long)]
    pub run_id: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterOpt {
    /// Stream plaintext records to a Graphite-compatible collector
    Graphite,
    /// Keep metrics in memory
    InMemory,
    /// Discard metrics
    Noop,
}

fn parse_user_behaviour(s: &str) -> anyhow::Result<(String, usize)> {
    let mut parts = s.split(':');
    let name = parts
        .next()
        .map(|s| s.to_string())
        .ok_or(anyhow::anyhow!("No name specified for behaviour"))?;

    let count = parts
        .next()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1);

    Ok((name, count))
}
