use std::time::Duration;

use airtouch::frame::Generation;
use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod discover;
pub mod monitor;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find consoles on the local network.
    Discover(DiscoverArgs),
    /// Connect to a console and print the messages it sends.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    let command = match command {
        Command::Version(args) => return version::run(args),
        other => other,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;

    runtime.block_on(async move {
        match command {
            Command::Discover(args) => discover::run(args, format).await,
            Command::Monitor(args) => monitor::run(args, format).await,
            Command::Version(args) => version::run(args),
        }
    })
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum GenerationArg {
    #[value(name = "4", alias = "airtouch4")]
    AirTouch4,
    #[value(name = "5", alias = "airtouch5")]
    AirTouch5,
}

impl From<GenerationArg> for Generation {
    fn from(arg: GenerationArg) -> Self {
        match arg {
            GenerationArg::AirTouch4 => Generation::AirTouch4,
            GenerationArg::AirTouch5 => Generation::AirTouch5,
        }
    }
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Ask this host directly instead of broadcasting.
    #[arg(long, env = "AIRTOUCH_HOST")]
    pub host: Option<String>,
    /// Only search for one console generation.
    #[arg(long, value_name = "GEN")]
    pub generation: Option<GenerationArg>,
    /// UDP port the consoles listen on (defaults to the generation's port).
    #[arg(long, requires = "generation")]
    pub discovery_port: Option<u16>,
    /// Local UDP port to bind (defaults to the discovery port; 0 = any).
    #[arg(long)]
    pub local_port: Option<u16>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Console host name or address.
    #[arg(long, env = "AIRTOUCH_HOST")]
    pub host: String,
    /// Console generation.
    #[arg(long, value_name = "GEN", default_value = "5")]
    pub generation: GenerationArg,
    /// TCP port (defaults to 9004 for AirTouch 4, 9005 for AirTouch 5).
    #[arg(long)]
    pub port: Option<u16>,
    /// How long to monitor (e.g. 300s, 500ms).
    #[arg(long, default_value = "300s")]
    pub duration: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else if let Some(num) = input.strip_suffix('m') {
        (num, "m")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
