use clap::{Parser, Subcommand};

/// The name of this executable; any other argv[0] is a tool to stand in for
pub const BINARY_NAME : &str = "shadow-ir";

#[derive(Debug,Parser)]
#[command(name = BINARY_NAME, version, about)]
#[command(after_long_help="When invoked under the name of a tool (e.g. through a symlink named `gcc` or\n`ar-and-emit-ir`) the arguments are interpreted as that tool's command line.\n\nLogging is controlled with various -v options or via the RUST_LOG/RUST_LOG_STYLE\nas described in https://docs.rs/env_logger documentation.")]
pub struct Options {
    #[command(subcommand)]
    pub subcommand : ShadowCommand
}

#[derive(Debug,Subcommand)]
pub enum ShadowCommand {
    /// Run a tool command, generating bitcode alongside its native outputs
    #[command(display_order=0)]
    Run(ToolOptions),
    /// Print the IR and real commands computed for a tool command as JSON,
    /// without running anything
    #[command(display_order=1)]
    Plan(ToolOptions),
}

#[derive(Clone,Debug,Parser)]
pub struct ToolOptions {
    /// Generate verbose output.  Twice for additional verbosity.
    #[arg(short, long, action=clap::ArgAction::Count)]
    pub verbose : u8,
    /// The tool command to wrap (tool name first)
    #[arg(last = true, required = true)]
    pub command : Vec<String>,
}

impl Options {
    pub fn verbosity(&self) -> u8 {
        match &self.subcommand {
            ShadowCommand::Run(o) | ShadowCommand::Plan(o) => o.verbose,
        }
    }
}
