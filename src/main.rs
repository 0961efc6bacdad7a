use clap::Parser;
use std::ffi::OsString;
use std::path::Path;

use shadow::shadow::options::{Options, BINARY_NAME};
use shadow::shadow::sequencer::exit_code;

fn main() {
    let args : Vec<OsString> = std::env::args_os().collect();
    let invoked_as = args.first()
        .and_then(|a| Path::new(a).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let result =
        if invoked_as == BINARY_NAME {
            let opt = Options::parse_from(args);
            shadow::init_logging(opt.verbosity());
            shadow::run_shadow(opt)
        } else {
            shadow::init_logging(0);
            shadow::run_wrapper(args)
        };

    match result {
        Ok(ec) => std::process::exit(ec),
        Err(err) => {
            log::error!("{:#}", err);
            std::process::exit(exit_code(&err));
        }
    }
}
