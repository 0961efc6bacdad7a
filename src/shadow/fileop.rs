use log::info;

use crate::shadow::artifact::{bitcode_name, is_tracked_artifact};
use crate::shadow::command::{BuildMode, RewriteContext, Role, WrapperCommand};

/// Options of mv/ln/cp whose value is the next argument
static FILEOP_UNARY_OPTIONS : &[&str] = &["-t", "-S"];

/// Options of install whose value is the next argument
static INSTALL_UNARY_OPTIONS : &[&str] = &["-t", "-S", "-m", "-o", "-g"];

fn unary_options(role : Role) -> &'static [&'static str] {
    match role {
        Role::Install => INSTALL_UNARY_OPTIONS,
        _ => FILEOP_UNARY_OPTIONS,
    }
}

/// Returns true for `--force` or a short option cluster containing `f`
fn is_force_flag(arg : &str) -> bool {
    if arg.starts_with("--") {
        arg == "--force"
    } else {
        arg.starts_with('-') && arg[1..].contains('f')
    }
}

/// Mirror a file relocation (mv/ln/cp/install) for the bitcode siblings of
/// the libraries and libtool objects it touches
///
/// Directory targets and other operands are passed through unchanged.  A
/// relocation that touches no tracked artifact has nothing to mirror.
pub fn rewrite_fileop(role : Role, command : &[String], ctx : &RewriteContext) -> WrapperCommand {
    if role == Role::Install && !ctx.policy.install_bitcode {
        return WrapperCommand::nothing_to_do(role, BuildMode::NoOp, command.to_vec());
    }

    let unary = unary_options(role);
    let mut ir_command = vec![command[0].clone()];
    let mut has_force = false;
    let mut has_artifacts = false;
    let mut options_done = false;
    let mut it = command.iter().skip(1);
    while let Some(arg) = it.next() {
        if !options_done && arg.starts_with('-') && arg.len() > 1 {
            if arg == "--" {
                options_done = true;
            } else if unary.contains(&arg.as_str()) {
                ir_command.push(arg.clone());
                if let Some(value) = it.next() {
                    ir_command.push(value.clone());
                }
                continue;
            } else {
                has_force = has_force || is_force_flag(arg);
            }
            ir_command.push(arg.clone());
        } else if is_tracked_artifact(arg) {
            has_artifacts = true;
            ir_command.push(bitcode_name(arg));
        } else {
            ir_command.push(arg.clone());
        }
    }

    if !has_artifacts {
        info!("No libraries relocated by {:?}", command);
        return WrapperCommand::nothing_to_do(role, BuildMode::NoOp, command.to_vec());
    }
    // A stale sibling from a previous build must be overwritten without prompting
    if (role == Role::Move || role == Role::Symlink) && !has_force {
        ir_command.insert(1, "-f".to_owned());
    }
    WrapperCommand::generate(role, BuildMode::NoOp, ir_command, command.to_vec())
}
