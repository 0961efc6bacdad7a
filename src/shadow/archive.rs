use log::info;

use crate::shadow::artifact::bitcode_name;
use crate::shadow::command::{ir_link_command, BuildMode, RewriteContext, Role, ShadowStep, WrapperCommand};
use crate::shadow::error::WrapperError;
use crate::shadow::resolver::resolve_bitcode;

/// The operation requested from `ar`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArOperation {
    /// `cq`: create the archive from the members
    Create,
    /// `r`: insert members, replacing existing ones
    Replace,
    /// `x`, `t`, `p`, or a bare `s`; nothing changes in the archive contents
    Inspect,
    Unsupported,
}

/// Letters that may appear in an `ar` operation token (operations and modifiers)
const AR_OPERATION_LETTERS : &str = "dmpqrstxabcDfilNoOPSTuUvV";

/// Long options of `ar` whose value is the next argument
static AR_VALUED_OPTIONS : &[&str] = &["--plugin", "--target", "--output"];

/// Classify an `ar` operation token (`rcs`, `-cqs`, `t`, ...)
///
/// Tokens with letters that are not `ar` operations or modifiers are never
/// operations.
pub fn ar_operation(op : &str) -> ArOperation {
    let op = op.strip_prefix('-').unwrap_or(op);
    if op.is_empty() || !op.chars().all(|c| AR_OPERATION_LETTERS.contains(c)) {
        ArOperation::Unsupported
    } else if op.contains('r') {
        ArOperation::Replace
    } else if op.contains('c') && op.contains('q') {
        ArOperation::Create
    } else if op.contains('x') || op.contains('t') || op.contains('p') || op == "s" {
        ArOperation::Inspect
    } else {
        ArOperation::Unsupported
    }
}

/// Index of the operation token, after any long options (`--plugin <path>`,
/// `--target=bfd`) that precede it
fn operation_index(command : &[String]) -> Option<usize> {
    let mut idx = 1;
    while let Some(arg) = command.get(idx) {
        if !arg.starts_with("--") {
            return Some(idx);
        }
        idx += if AR_VALUED_OPTIONS.contains(&arg.as_str()) { 2 } else { 1 };
    }
    None
}

/// Number of positional arguments the modifiers put between the operation
/// and the archive (the member position for `a`/`b`/`i`, the count for `N`)
fn modifier_arguments(op : &str) -> usize {
    let relpos = op.contains('a') || op.contains('b') || op.contains('i');
    usize::from(relpos) + usize::from(op.contains('N'))
}

/// Compute the IR command for an `ar` invocation that modifies an archive
///
/// The IR of an archive is the IR link of the bitcode of its members.  Since
/// the link replaces the output file wholesale, replacing members is done by
/// recombining the previous archive bitcode with the new members.
pub fn rewrite_archive(command : &[String], ctx : &RewriteContext) -> Result<WrapperCommand, WrapperError> {
    let op_idx = match operation_index(command) {
        Some(idx) => idx,
        None => return Err(WrapperError::UnsupportedInvocation(command[0].clone(), command.to_vec())),
    };
    let op_token = &command[op_idx];
    let op = ar_operation(op_token);
    match op {
        ArOperation::Inspect => {
            return Ok(WrapperCommand::nothing_to_do(Role::ArchiveInspect, BuildMode::NoOp, command.to_vec()));
        }
        ArOperation::Unsupported => {
            return Err(WrapperError::UnsupportedArOperation(op_token.clone(), command.to_vec()));
        }
        ArOperation::Create | ArOperation::Replace => {}
    }
    let archive_idx = op_idx + 1 + modifier_arguments(op_token);
    let archive_ir = match command.get(archive_idx) {
        Some(archive) => bitcode_name(archive),
        None => return Err(WrapperError::UnsupportedInvocation(command[0].clone(), command.to_vec())),
    };

    let members = &command[archive_idx + 1..];
    let inputs = resolve_bitcode(members, ctx.policy.skip_missing_linker_input, ctx.probe, ctx.cwd)?;
    let ir_command = ir_link_command(ctx.toolchain, &inputs, &[], &archive_ir);
    let step =
        if op == ArOperation::Replace {
            ShadowStep::RecombineArchive { archive_ir : archive_ir.clone() }
        } else if inputs.is_empty() {
            info!("Creating an empty bitcode archive {:?}", archive_ir);
            ShadowStep::AppendEmptyMember
        } else {
            ShadowStep::Direct
        };
    Ok(WrapperCommand::generate(Role::Archive, BuildMode::StaticLib, ir_command, command.to_vec())
       .with_step(step))
}

/// `ranlib` only rebuilds the native symbol index
pub fn rewrite_index(command : &[String]) -> WrapperCommand {
    WrapperCommand::nothing_to_do(Role::Index, BuildMode::NoOp, command.to_vec())
}
