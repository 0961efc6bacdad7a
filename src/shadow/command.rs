use std::ffi::OsString;
use std::path::Path;

use crate::shadow::error::WrapperError;
use crate::shadow::policy::{IR_LINK_TOOL, Policy, Toolchain};
use crate::shadow::resolver::FileTypeProbe;

/// Flag telling the IR link tool to record `-l` references as library metadata
pub const LIBRARY_METADATA_FLAG : &str = "-libmd";

/// The command line of a wrapped tool invocation
///
/// The first token names the impersonated program; every token has been
/// trimmed of surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    tokens : Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(tokens : I) -> Result<Invocation, WrapperError>
    where I : IntoIterator<Item = S>,
          S : AsRef<str>
    {
        let tokens : Vec<String> = tokens.into_iter().map(|t| t.as_ref().trim().to_owned()).collect();
        if tokens.is_empty() {
            return Err(WrapperError::EmptyCommand);
        }
        Ok(Invocation { tokens })
    }

    /// Build an invocation from raw process arguments
    pub fn from_os_args<I>(args : I) -> Result<Invocation, WrapperError>
    where I : IntoIterator<Item = OsString>
    {
        let mut tokens = Vec::new();
        for arg in args {
            tokens.push(arg.into_string().map_err(WrapperError::NonUtf8Argument)?);
        }
        Invocation::new(tokens)
    }

    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Replace the program token (e.g., after alias resolution)
    pub fn with_program(mut self, program : &str) -> Invocation {
        self.tokens[0] = program.to_owned();
        self
    }
}

/// The toolchain function an invocation impersonates
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Compile,
    Link,
    Archive,
    /// An `ar` invocation that only reads the archive.  Never selected from
    /// the program name; the archive rewriter reports it after reading the
    /// operation.
    ArchiveInspect,
    Index,
    Move,
    Symlink,
    Copy,
    Install,
}

/// The kind of artifact the invocation builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildMode {
    Object,
    StaticLib,
    SharedLib,
    Executable,
    NoOp,
}

/// How the IR command has to be completed by the sequencer before it runs
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShadowStep {
    /// Run the IR command as-is
    Direct,
    /// Synthesize an empty IR module and add it as the last input
    AppendEmptyMember,
    /// Move the existing archive bitcode aside and add it as an input, so the
    /// new members are combined with the previous contents
    RecombineArchive { archive_ir : String },
}

/// The pair of commands computed for one invocation
///
/// `ir_command` is empty if and only if `nothing_to_do` is set; the
/// constructors maintain that.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WrapperCommand {
    pub role : Role,
    pub mode : BuildMode,
    pub ir_command : Vec<String>,
    pub real_command : Vec<String>,
    pub nothing_to_do : bool,
    pub shadow_step : ShadowStep,
}

impl WrapperCommand {
    /// Only the real command runs
    pub fn nothing_to_do(role : Role, mode : BuildMode, real_command : Vec<String>) -> WrapperCommand {
        WrapperCommand { role, mode,
                         ir_command : Vec::new(),
                         real_command,
                         nothing_to_do : true,
                         shadow_step : ShadowStep::Direct }
    }

    /// Run `ir_command` and then `real_command`
    ///
    /// An empty IR command degrades to `nothing_to_do`.
    pub fn generate(role : Role, mode : BuildMode, ir_command : Vec<String>, real_command : Vec<String>) -> WrapperCommand {
        if ir_command.is_empty() {
            return WrapperCommand::nothing_to_do(role, mode, real_command);
        }
        WrapperCommand { role, mode, ir_command, real_command,
                         nothing_to_do : false,
                         shadow_step : ShadowStep::Direct }
    }

    pub fn with_step(mut self, step : ShadowStep) -> WrapperCommand {
        if !self.nothing_to_do {
            self.shadow_step = step;
        }
        self
    }

    /// The output path of the IR command (the argument of its last `-o`)
    pub fn ir_output(&self) -> Option<&str> {
        ir_output_of(&self.ir_command)
    }
}

fn ir_output_of(cmd : &[String]) -> Option<&str> {
    cmd.iter().rposition(|a| a == "-o")
        .and_then(|idx| cmd.get(idx + 1))
        .map(|s| s.as_str())
}

/// Everything the rewriters consult besides the command line itself
pub struct RewriteContext<'a> {
    pub policy : &'a Policy,
    pub toolchain : &'a Toolchain,
    pub probe : &'a dyn FileTypeProbe,
    pub cwd : &'a Path,
}

/// A command that compiles an empty translation unit to an IR module at `output`
pub fn empty_ir_command(toolchain : &Toolchain, output : &str) -> Vec<String> {
    let mut cmd = vec![toolchain.ir_tool("clang")];
    cmd.extend(["-c", "-emit-llvm", "-o", output, "-x", "c", "/dev/null"].iter().map(|s| s.to_string()));
    cmd
}

/// An IR link command combining `inputs` into `output`, recording `libs`
pub fn ir_link_command(toolchain : &Toolchain, inputs : &[String], libs : &[String], output : &str) -> Vec<String> {
    let mut cmd = vec![toolchain.ir_tool(IR_LINK_TOOL), LIBRARY_METADATA_FLAG.to_owned()];
    cmd.extend(inputs.iter().cloned());
    cmd.extend(libs.iter().cloned());
    cmd.push("-o".to_owned());
    cmd.push(output.to_owned());
    cmd
}

/// Add one more input to an IR link command, ahead of its output flag
pub fn with_extra_input(cmd : &[String], input : &str) -> Vec<String> {
    let mut extended = cmd.to_vec();
    let at = cmd.iter().rposition(|a| a == "-o").unwrap_or(cmd.len());
    extended.insert(at, input.to_owned());
    extended
}
