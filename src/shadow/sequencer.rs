use log::{error, info};
use std::convert::Infallible;
use std::ffi::{CString, OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::shadow::clang_support::is_metadata_query;
use crate::shadow::command::{empty_ir_command, with_extra_input, Invocation, RewriteContext, ShadowStep, WrapperCommand};
use crate::shadow::dispatch::{compute_wrapper_command, normalize_invocation, program_name};
use crate::shadow::error::WrapperError;
use crate::shadow::policy::{to_absolute, Policy, Toolchain, NO_EMIT_IR};
use crate::shadow::resolver::FileCommandProbe;

/// Exit code for failures of the wrapper itself (as opposed to the commands
/// it runs).  Non-zero and recognizable; 76 is otherwise arbitrary.
pub const WRAPPER_FAILURE_EXIT_CODE : i32 = 76;

/// Which of the two commands of an invocation is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ir,
    Real,
}

impl fmt::Display for Step {
    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Ir => write!(f, "IR generation"),
            Step::Real => write!(f, "original"),
        }
    }
}

/// Failures of the subprocesses run for an invocation
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("The {0} command {1:?} failed ({2}) in {3:?}")]
    CommandFailed(Step, Vec<String>, ExitStatus, PathBuf),
    #[error("Error {3:?} starting the {0} command {1:?} in {2:?}")]
    SpawnFailed(Step, Vec<String>, PathBuf, std::io::Error),
    #[error("Error {1:?} moving archive bitcode {0:?} aside")]
    ArchiveRelocation(PathBuf, std::io::Error),
    #[error("Error {1:?} creating a temporary bitcode file in {0:?}")]
    TempFile(PathBuf, std::io::Error),
}

impl RunError {
    pub fn step(&self) -> Step {
        match self {
            RunError::CommandFailed(step, _, _, _) => *step,
            RunError::SpawnFailed(step, _, _, _) => *step,
            RunError::ArchiveRelocation(_, _) | RunError::TempFile(_, _) => Step::Ir,
        }
    }

    /// The exit code the wrapper reports for this failure: that of the failed
    /// command (128 + the signal number if it was killed)
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::CommandFailed(_, _, status, _) => {
                status.code()
                    .or_else(|| status.signal().map(|s| 128 + s))
                    .unwrap_or(1)
            }
            RunError::SpawnFailed(_, _, _, _) => 127,
            RunError::ArchiveRelocation(_, _) | RunError::TempFile(_, _) => WRAPPER_FAILURE_EXIT_CODE,
        }
    }
}

/// Map an error escaping an entry point to the process exit code
pub fn exit_code(err : &anyhow::Error) -> i32 {
    match err.downcast_ref::<RunError>() {
        Some(run_err) => run_err.exit_code(),
        None => WRAPPER_FAILURE_EXIT_CODE,
    }
}

/// Reasons to hand the invocation straight to the real tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bypass {
    /// IR generation is globally disabled
    OptOut,
    /// Version or help query
    MetadataQuery,
}

pub fn bypass_reason(policy : &Policy, command : &[String]) -> Option<Bypass> {
    if policy.no_emit_ir {
        Some(Bypass::OptOut)
    } else if is_metadata_query(command) {
        Some(Bypass::MetadataQuery)
    } else {
        None
    }
}

/// Replace the current process image with `program`, passing `command` as
/// its argument vector (argv[0] included).  Only returns on failure.
pub fn replace_process<S : AsRef<OsStr>>(program : &Path, command : &[S]) -> anyhow::Result<Infallible> {
    let path = CString::new(program.as_os_str().as_bytes())?;
    let argv = command.iter()
        .map(|a| CString::new(a.as_ref().as_bytes()))
        .collect::<Result<Vec<CString>, _>>()?;
    Ok(nix::unistd::execv(&path, &argv)?)
}

/// Archive bitcode that has been moved out of the way while the archive is
/// recombined
///
/// Unless the recombination completes, the previous bitcode is moved back
/// when this is dropped; otherwise the moved copy is deleted.
struct RelocatedArchiveIr {
    original : PathBuf,
    relocated : tempfile::TempPath,
    restore : bool,
}

impl Drop for RelocatedArchiveIr {
    fn drop(&mut self) {
        if self.restore {
            if let Err(err) = std::fs::rename(&self.relocated, &self.original) {
                error!("Could not restore archive bitcode {:?} from {:?}: {}", self.original, &*self.relocated, err);
            }
        }
    }
}

fn path_string(p : &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// Runs the commands of an invocation in order
pub struct Sequencer<'a> {
    pub policy : &'a Policy,
    pub toolchain : &'a Toolchain,
    pub cwd : &'a Path,
}

impl<'a> Sequencer<'a> {
    /// Replace the program name of the real command with the executable to run
    pub fn resolve_real_command(&self, real_command : &[String]) -> Result<Vec<String>, WrapperError> {
        let exe = self.resolve_program(&real_command[0], real_command)?;
        let mut resolved = real_command.to_vec();
        resolved[0] = path_string(&exe);
        Ok(resolved)
    }

    /// The executable to run for the real tool `program` of `command`
    fn resolve_program(&self, program : &str, command : &[String]) -> Result<PathBuf, WrapperError> {
        self.toolchain.resolve_real(program, self.policy.delegate_to_system_compiler, self.cwd)
            .ok_or_else(|| WrapperError::ToolNotFound(program.to_owned(), command.to_vec()))
    }

    /// Directory for scratch bitcode that ends up as an input of the IR
    /// command: next to its output
    fn scratch_dir(&self, wc : &WrapperCommand) -> PathBuf {
        wc.ir_output()
            .map(|out| to_absolute(self.cwd, out))
            .and_then(|out| out.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| self.cwd.to_path_buf())
    }

    /// Run the IR command (if any) and then the real command
    ///
    /// If the IR command fails the real command is not run, so that the
    /// build never sees a native output without its bitcode.
    pub fn execute(&self, wc : &WrapperCommand) -> anyhow::Result<()> {
        let real_command = self.resolve_real_command(&wc.real_command)?;
        if wc.nothing_to_do {
            info!("Nothing to do for {:?}", wc.real_command);
        } else {
            self.run_ir_step(wc)?;
        }
        self.run(Step::Real, &real_command)?;
        Ok(())
    }

    fn run_ir_step(&self, wc : &WrapperCommand) -> Result<(), RunError> {
        match &wc.shadow_step {
            ShadowStep::Direct => self.run(Step::Ir, &wc.ir_command),
            ShadowStep::AppendEmptyMember => {
                let dir = self.scratch_dir(wc);
                let empty = tempfile::Builder::new()
                    .prefix(".shadow-ir-empty-")
                    .suffix(".bc")
                    .tempfile_in(&dir)
                    .map_err(|e| RunError::TempFile(dir.clone(), e))?
                    .into_temp_path();
                let empty_name = path_string(&empty);
                self.run(Step::Ir, &empty_ir_command(self.toolchain, &empty_name))?;
                self.run(Step::Ir, &with_extra_input(&wc.ir_command, &empty_name))
            }
            ShadowStep::RecombineArchive { archive_ir } => {
                let original = to_absolute(self.cwd, archive_ir);
                let dir = self.scratch_dir(wc);
                let relocated = tempfile::Builder::new()
                    .prefix(".shadow-ir-")
                    .suffix(".bc")
                    .tempfile_in(&dir)
                    .map_err(|e| RunError::ArchiveRelocation(original.clone(), e))?
                    .into_temp_path();
                let mut previous = RelocatedArchiveIr { original, relocated, restore : false };
                if previous.original.exists() {
                    std::fs::rename(&previous.original, &previous.relocated)
                        .map_err(|e| RunError::ArchiveRelocation(previous.original.clone(), e))?;
                    previous.restore = true;
                } else {
                    self.run(Step::Ir, &empty_ir_command(self.toolchain, &path_string(&previous.relocated)))?;
                }
                self.run(Step::Ir, &with_extra_input(&wc.ir_command, &path_string(&previous.relocated)))?;
                previous.restore = false;
                Ok(())
            }
        }
    }

    fn run(&self, step : Step, command : &[String]) -> Result<(), RunError> {
        match step {
            Step::Ir => info!("IR: {:?}", command),
            Step::Real => info!("Original: {:?}", command),
        }
        let mut cmd = Command::new(&command[0]);
        cmd.args(&command[1..]).current_dir(self.cwd);
        if step == Step::Ir {
            // Tools reached through a wrapper link must not generate IR again
            cmd.env(NO_EMIT_IR, "1");
        }
        let status = cmd.status()
            .map_err(|e| RunError::SpawnFailed(step, command.to_vec(), self.cwd.to_path_buf(), e))?;
        if !status.success() {
            return Err(RunError::CommandFailed(step, command.to_vec(), status, self.cwd.to_path_buf()));
        }
        Ok(())
    }
}

/// Hand the invocation to the real tool unmodified, replacing this process
///
/// argv[0] is replaced by the name of the tool the wrapper stands for; the
/// other arguments are passed through byte for byte.
fn pass_through(seq : &Sequencer, args : &[OsString], reason : Bypass) -> anyhow::Result<i32> {
    let lossy : Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
    let program = match lossy.first() {
        Some(argv0) => program_name(argv0),
        None => return Err(WrapperError::EmptyCommand.into()),
    };
    info!("Passing {:?} through unmodified ({:?})", lossy, reason);
    let exe = seq.resolve_program(program, &lossy)?;
    let mut argv = args.to_vec();
    argv[0] = OsString::from(program);
    match replace_process(&exe, &argv)? {}
}

/// Run as the tool named by argv[0] of `args`
///
/// Returns the exit code for the wrapper process.
pub fn wrapper_entrypoint<I>(args : I) -> anyhow::Result<i32>
where I : IntoIterator<Item = OsString>
{
    let args : Vec<OsString> = args.into_iter().collect();
    let policy = Policy::from_env();
    let toolchain = Toolchain::from_env();
    let cwd = std::env::current_dir()?;
    let seq = Sequencer { policy : &policy, toolchain : &toolchain, cwd : &cwd };

    // Checked before the arguments are decoded, so that opting out passes
    // any argument vector through
    if policy.no_emit_ir {
        return pass_through(&seq, &args, Bypass::OptOut);
    }
    let inv = normalize_invocation(Invocation::from_os_args(args.iter().cloned())?);
    if let Some(reason) = bypass_reason(&policy, inv.tokens()) {
        return pass_through(&seq, &args, reason);
    }

    let probe = FileCommandProbe;
    let ctx = RewriteContext { policy : &policy, toolchain : &toolchain, probe : &probe, cwd : &cwd };
    let wc = compute_wrapper_command(&inv, &ctx)?;
    seq.execute(&wc)?;
    Ok(0)
}
