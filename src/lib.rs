pub mod shadow;

use std::ffi::OsString;

use crate::shadow::dispatch::plan_entrypoint;
use crate::shadow::options::{Options, ShadowCommand};
use crate::shadow::sequencer::wrapper_entrypoint;

pub fn run_shadow(opt : Options) -> anyhow::Result<i32> {
    match opt.subcommand {
        ShadowCommand::Run(tool_opts) => { wrapper_entrypoint(tool_opts.command.into_iter().map(OsString::from)) }
        ShadowCommand::Plan(tool_opts) => { plan_entrypoint(&tool_opts)?; Ok(0) }
    }
}

/// Run as the tool named by argv[0]
pub fn run_wrapper<I>(args : I) -> anyhow::Result<i32>
where I : IntoIterator<Item = OsString>
{
    wrapper_entrypoint(args)
}

/// Send log output to stderr, so that stdout belongs to the wrapped tool
pub fn init_logging(verbose : u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}
