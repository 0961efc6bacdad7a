use log::info;
use std::ffi::OsString;

use crate::shadow::archive::{rewrite_archive, rewrite_index};
use crate::shadow::clang_support::{compiler_front_end, is_linker_command_name, is_non_generative};
use crate::shadow::command::{BuildMode, Invocation, RewriteContext, Role, WrapperCommand};
use crate::shadow::compile::{native_compatible, rewrite_compile};
use crate::shadow::error::WrapperError;
use crate::shadow::fileop::rewrite_fileop;
use crate::shadow::link::rewrite_link;
use crate::shadow::options::ToolOptions;
use crate::shadow::policy::{Policy, Toolchain};
use crate::shadow::resolver::FileCommandProbe;

/// Suffix of wrapper links that stand in for a tool (e.g., `clang-and-emit-ir`)
pub const WRAPPER_SUFFIX : &str = "-and-emit-ir";

/// The tool a wrapper invocation stands in for: the basename of argv[0]
/// without the wrapper suffix, with gcc-style driver names mapped to clang
pub fn program_name(argv0 : &str) -> &str {
    let base = argv0.rsplit('/').next().unwrap_or(argv0);
    let base = base.strip_suffix(WRAPPER_SUFFIX).unwrap_or(base);
    match base {
        "cc" | "gcc" => "clang",
        "c++" | "g++" => "clang++",
        other => other,
    }
}

/// Replace argv[0] of the invocation with the name of the tool it stands for
pub fn normalize_invocation(inv : Invocation) -> Invocation {
    let program = program_name(inv.program()).to_owned();
    inv.with_program(&program)
}

fn is_tool(name : &str, tool : &str) -> bool {
    // cross-prefixed (x86_64-linux-gnu-ar) or wrapped (llvm-ar, gcc-ar)
    name == tool || name.ends_with(&format!("-{}", tool))
}

/// The role an invocation impersonates, from its program name and flags
pub fn select_role(command : &[String]) -> Result<Role, WrapperError> {
    let name = command[0].as_str();
    match name {
        "mv" => return Ok(Role::Move),
        "ln" => return Ok(Role::Symlink),
        "cp" => return Ok(Role::Copy),
        "install" => return Ok(Role::Install),
        _ => {}
    }
    if is_tool(name, "ar") {
        Ok(Role::Archive)
    } else if is_tool(name, "ranlib") {
        Ok(Role::Index)
    } else if is_linker_command_name(name) {
        Err(WrapperError::NotImplemented(name.to_owned(), command.to_vec()))
    } else if compiler_front_end(name).is_some() {
        if command.iter().skip(1).any(|a| a == "-c" || a == "-S") {
            Ok(Role::Compile)
        } else {
            Ok(Role::Link)
        }
    } else {
        Err(WrapperError::UnsupportedInvocation(name.to_owned(), command.to_vec()))
    }
}

/// Compute the IR and real commands for a (normalized) invocation
pub fn compute_wrapper_command(inv : &Invocation, ctx : &RewriteContext) -> Result<WrapperCommand, WrapperError> {
    let command = inv.tokens();
    let role = select_role(command)?;
    match role {
        Role::Compile | Role::Link => {
            let front_end = match compiler_front_end(inv.program()) {
                Some(fe) => fe,
                None => return Err(WrapperError::UnsupportedInvocation(inv.program().to_owned(), command.to_vec())),
            };
            if is_non_generative(command) {
                info!("No code generated by {:?}", command);
                return Ok(WrapperCommand::nothing_to_do(role, BuildMode::NoOp, native_compatible(command)));
            }
            if role == Role::Compile {
                rewrite_compile(front_end, command, ctx)
            } else {
                rewrite_link(front_end, command, ctx)
            }
        }
        Role::Archive => rewrite_archive(command, ctx),
        // only ever produced by rewrite_archive
        Role::ArchiveInspect => Err(WrapperError::UnsupportedInvocation(inv.program().to_owned(), command.to_vec())),
        Role::Index => Ok(rewrite_index(command)),
        Role::Move | Role::Symlink | Role::Copy | Role::Install => Ok(rewrite_fileop(role, command, ctx)),
    }
}

/// Print the commands computed for a tool command as JSON without running them
pub fn plan_entrypoint(tool_options : &ToolOptions) -> anyhow::Result<()> {
    let inv = normalize_invocation(Invocation::from_os_args(tool_options.command.iter().map(OsString::from))?);
    let policy = Policy::from_env();
    let toolchain = Toolchain::from_env();
    let cwd = std::env::current_dir()?;
    let probe = FileCommandProbe;
    let ctx = RewriteContext { policy : &policy, toolchain : &toolchain, probe : &probe, cwd : &cwd };
    let wc = compute_wrapper_command(&inv, &ctx)?;
    println!("{}", serde_json::to_string_pretty(&wc)?);
    Ok(())
}
