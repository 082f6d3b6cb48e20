use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Call a method and print the reply.
    Call(CallArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, socket: Option<&str>, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Call(args) => call::run(args, socket, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Method name (e.g. core.version, tm.stats).
    pub method: String,
    /// Arguments: s:<text>, i:<int>, d:<double>, or a bare value
    /// (integer if it parses as one, text otherwise).
    #[arg(allow_negative_numbers = true)]
    pub args: Vec<String>,
    /// Connect, write and read timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
