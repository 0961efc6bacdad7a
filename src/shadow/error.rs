use std::path::PathBuf;

/// Structural failures of the rewriting engine
///
/// Every variant carries the command line that caused it so that the failure
/// can be reproduced by hand.  Failures of the subprocesses themselves are
/// reported separately (see `sequencer::RunError`).
#[derive(thiserror::Error, Debug)]
pub enum WrapperError {
    #[error("Unsupported invocation of {0:?}: {1:?}")]
    UnsupportedInvocation(String, Vec<String>),
    #[error("No -o flag, but multiple input files {0:?} in command {1:?}")]
    AmbiguousOutput(Vec<String>, Vec<String>),
    #[error("No input files found in command {0:?}")]
    NoInputFiles(Vec<String>),
    #[error("Cannot generate IR for input {0:?} (export SKIP_ASSEMBLY_FILES=1 to emit an empty IR file instead) in command {1:?}")]
    UnsupportedInputKind(String, Vec<String>),
    #[error("Missing bitcode for {0:?} (working directory {1:?})")]
    MissingBitcodeInputs(Vec<String>, PathBuf),
    #[error("Missing bitcode for link inputs {0:?} (working directory {1:?}) in command {2:?}; export SKIP_MISSING_LINKER_INPUT=1 to ignore them")]
    MissingLinkInputs(Vec<String>, PathBuf, Vec<String>),
    #[error("Unsupported ar operation {0:?} ('cq' or 'r' are supported) in command {1:?}")]
    UnsupportedArOperation(String, Vec<String>),
    #[error("Wrapping direct invocations of {0:?} is not implemented: {1:?}")]
    NotImplemented(String, Vec<String>),
    #[error("Flag {0:?} without parameter in command {1:?}")]
    MissingOptionValue(String, Vec<String>),
    #[error("Shared library {0:?} is not prefixed with 'lib' in command {1:?}")]
    InvalidLibraryName(String, Vec<String>),
    #[error("Could not find executable {0:?} for command {1:?}")]
    ToolNotFound(String, Vec<String>),
    #[error("Argument {0:?} is not valid UTF-8")]
    NonUtf8Argument(std::ffi::OsString),
    #[error("Empty command line")]
    EmptyCommand,
}
