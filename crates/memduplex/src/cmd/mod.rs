use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod echo;
pub mod pump;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream bytes through a pair and verify they arrive intact.
    Pump(PumpArgs),
    /// Bounce a message back and forth between the two endpoints.
    Echo(EchoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Pump(args) => pump::run(args, format),
        Command::Echo(args) => echo::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PumpArgs {
    /// Total bytes to transfer.
    #[arg(long, default_value = "1048576")]
    pub bytes: u64,
    /// Bytes per write call.
    #[arg(long, default_value = "4096", value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk: u32,
    /// Reader buffer size.
    #[arg(long, default_value = "1024", value_parser = clap::value_parser!(u32).range(1..))]
    pub read_buf: u32,
    /// Drive the reader with async reads on a tokio runtime.
    #[arg(long = "async")]
    pub r#async: bool,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Number of round trips.
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u32).range(1..))]
    pub rounds: u32,
    /// Payload size per round trip.
    #[arg(long, default_value = "64", value_parser = clap::value_parser!(u32).range(1..))]
    pub payload: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
