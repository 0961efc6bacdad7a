use log::warn;

use crate::shadow::artifact::{bitcode_name, is_shared_library, is_static_library};
use crate::shadow::clang_support::{classify, ClassifiedArgument, FrontEnd};
use crate::shadow::command::{ir_link_command, BuildMode, RewriteContext, Role, ShadowStep, WrapperCommand};
use crate::shadow::compile::native_compatible;
use crate::shadow::error::WrapperError;
use crate::shadow::resolver::find_bitcode;

/// Marker flag that suppresses IR generation for a single link
pub const NO_EMIT_IR_FLAG : &str = "--no-emit-ir";

/// Output name used by the compiler driver when no `-o` is given
const DEFAULT_OUTPUT : &str = "a.out";

/// Encode a library path as a `-l` reference to its bitcode
///
/// The IR link tool adds the `lib` prefix back, so it must be present on the
/// original name.  Unversioned shared objects are referenced by their plain
/// library name; versioned ones and archives name the bitcode sibling.
fn library_reference(path : &str, command : &[String]) -> Result<Option<String>, WrapperError> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let rest = match file_name.strip_prefix("lib") {
        Some(rest) if !rest.is_empty() => rest,
        _ => {
            if is_shared_library(path) {
                return Err(WrapperError::InvalidLibraryName(path.to_owned(), command.to_vec()));
            }
            // An archive without the prefix is linked like any object
            return Ok(None);
        }
    };
    if let Some(name) = rest.strip_suffix(".so") {
        return Ok(Some(format!("-l{}", name)));
    }
    Ok(Some(format!("-l{}", bitcode_name(rest))))
}

/// Compute the IR link command for a compiler driver invocation that links
pub fn rewrite_link(front_end : FrontEnd,
                    command : &[String],
                    ctx : &RewriteContext) -> Result<WrapperCommand, WrapperError> {
    let mut candidates : Vec<String> = Vec::new();
    let mut libs : Vec<String> = Vec::new();
    let mut output : Option<&str> = None;
    let mut shared = false;
    let mut freestanding = false;
    let mut opt_out = false;

    for arg in classify(command)? {
        match arg {
            ClassifiedArgument::Flag(f) => {
                if f == "-shared" {
                    shared = true;
                } else if f == "-ffreestanding" {
                    freestanding = true;
                } else if f == NO_EMIT_IR_FLAG {
                    opt_out = true;
                } else if f == "-pthread" {
                    // the IR link tool only understands -l
                    libs.push("-lpthread".to_owned());
                } else if f.starts_with("-l") {
                    libs.push(f.to_owned());
                }
                // nothing else affects the IR link
            }
            ClassifiedArgument::FlagWithValue(f, v) => {
                if f == "-l" {
                    libs.push(format!("-l{}", v));
                }
            }
            ClassifiedArgument::Output { path, .. } => {
                output = Some(path);
            }
            ClassifiedArgument::Input(path) => {
                if is_shared_library(path) || is_static_library(path) {
                    if let Some(lib) = library_reference(path, command)? {
                        libs.push(lib);
                        continue;
                    }
                }
                candidates.push(path.to_owned());
            }
        }
    }

    let real_command : Vec<String> =
        native_compatible(command).into_iter().filter(|a| a != NO_EMIT_IR_FLAG).collect();
    if opt_out {
        return Ok(WrapperCommand::nothing_to_do(Role::Link, BuildMode::NoOp, real_command));
    }
    if candidates.is_empty() {
        return Err(WrapperError::NoInputFiles(command.to_vec()));
    }

    let native_output = match output {
        Some(o) => o,
        None => {
            warn!("Could not determine the output file, assuming {}: {:?}", DEFAULT_OUTPUT, command);
            DEFAULT_OUTPUT
        }
    };
    let mode = if shared || is_shared_library(native_output) { BuildMode::SharedLib } else { BuildMode::Executable };

    if !freestanding {
        libs.push("-lc".to_owned());
        if front_end == FrontEnd::Cxx {
            libs.push("-lc++".to_owned());
        }
    }

    let res = find_bitcode(&candidates, ctx.probe, ctx.cwd);
    if !res.missing.is_empty() {
        if !ctx.policy.skip_missing_linker_input {
            return Err(WrapperError::MissingLinkInputs(res.missing, ctx.cwd.to_path_buf(), command.to_vec()));
        }
        warn!("Linking without bitcode for {:?}", res.missing);
    }

    let ir_command = ir_link_command(ctx.toolchain, &res.found, &libs, &bitcode_name(native_output));
    let step = if res.found.is_empty() { ShadowStep::AppendEmptyMember } else { ShadowStep::Direct };
    Ok(WrapperCommand::generate(Role::Link, mode, ir_command, real_command).with_step(step))
}
