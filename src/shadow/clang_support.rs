use std::collections::HashSet;

use crate::shadow::error::WrapperError;

/// Regular expressions for the programs that are recognized as C++ compiler
/// front ends (checked before the C front ends since `c++` ends in `c`)
static CXX_COMPILE_COMMANDS: &[&str] =
    &[r"^(?:.*-)?clang\+\+(?:-\d+(?:\.\d+)*)?$",
      r"^(?:.*-)?g\+\+(?:-\d+(?:\.\d+)*)?$",
      r"^(?:.*-)?c\+\+(?:-\d+(?:\.\d+)*)?$"
    ];

/// Regular expressions for the programs that are recognized as C compiler front ends
static C_COMPILE_COMMANDS: &[&str] =
    &[r"^(?:.*-)?clang(?:-\d+(?:\.\d+)*)?$",
      r"^(?:.*-)?gcc(?:-\d+(?:\.\d+)*)?$",
      r"^(?:.*-)?cc(?:-\d+(?:\.\d+)*)?$"
    ];

/// Direct linker invocations, which we refuse to wrap
static LINKER_COMMANDS: &[&str] =
    &[r"^(?:.*-)?ld$",
      r"^(?:.*-)?ld\..+$",
      r"^(?:.*-)?gold$",
      r"^(?:.*-)?lld$"
    ];

lazy_static::lazy_static! {
    static ref CXX_COMPILE_COMMAND_RE : regex::RegexSet = regex::RegexSet::new(CXX_COMPILE_COMMANDS).unwrap();
    static ref C_COMPILE_COMMAND_RE : regex::RegexSet = regex::RegexSet::new(C_COMPILE_COMMANDS).unwrap();
    static ref LINKER_COMMAND_RE : regex::RegexSet = regex::RegexSet::new(LINKER_COMMANDS).unwrap();
}

/// The language family of a compiler front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FrontEnd {
    C,
    Cxx
}

impl FrontEnd {
    /// Name of the IR-capable front end used for the shadow build
    pub fn ir_compiler_name(self) -> &'static str {
        match self {
            FrontEnd::C => "clang",
            FrontEnd::Cxx => "clang++",
        }
    }
}

/// Determine whether the given program name is a C or C++ compiler we know
pub fn compiler_front_end(cmd_name : &str) -> Option<FrontEnd> {
    if CXX_COMPILE_COMMAND_RE.is_match(cmd_name) {
        Some(FrontEnd::Cxx)
    } else if C_COMPILE_COMMAND_RE.is_match(cmd_name) {
        Some(FrontEnd::C)
    } else {
        None
    }
}

/// Return true if the program name is a raw linker (ld, gold, lld, ld.*)
pub fn is_linker_command_name(cmd_name : &str) -> bool {
    LINKER_COMMAND_RE.is_match(cmd_name)
}

/// Compiler and linker driver flags whose value is the following argument.
///
/// Collected from `clang --help-hidden` and `gcc -v --help`.
static SINGLE_ARG_OPTIONS : &[&str] =
    &["-o",
      "-A",
      "-B",
      "-D",
      "-U",
      "-F",
      "-I",
      "-L",
      "-l",
      "-T",
      "-u",
      "-e",
      "-x",
      "-z",
      "-MF",
      "-MJ",
      "-MQ",
      "-MT",
      "-arch",
      "-target",
      "-rpath",
      "-mllvm",
      "-aux-info",
      "-dumpbase",
      "-dumpdir",
      "-idirafter",
      "-iframework",
      "-imacros",
      "-imultiarch",
      "-imultilib",
      "-include",
      "-include-pch",
      "-iprefix",
      "-iquote",
      "-isysroot",
      "-isystem",
      "-ivfsoverlay",
      "-iwithprefix",
      "-iwithprefixbefore",
      "-iwithsysroot",
      "-cxx-isystem",
      "-current_version",
      "-compatibility_version",
      "-install_name",
      "-arcmt-migrate-report-output",
      "-ccc-arcmt-migrate",
      "-ccc-gcc-name",
      "-ccc-install-dir",
      "-ccc-objcmt-migrate",
      "-dependency-dot",
      "-dependency-file",
      "-fmodules-user-build-path",
      "-module-dependency-dir",
      "-resource-dir",
      "-serialize-diagnostics",
      "-working-directory",
      "-Xanalyzer",
      "-Xassembler",
      "-Xclang",
      "-Xlinker",
      "-Xpreprocessor",
      "--param",
      "--base_file",
      "--file-alignment",
      "--heap",
      "--image-base",
      "--major-image-version",
      "--major-os-version",
      "--major-subsystem-version",
      "--minor-image-version",
      "--minor-os-version",
      "--minor-subsystem-version",
      "--out-implib",
      "--output-def",
      "--section-alignment",
      "--stack",
      "--subsystem"
    ];

lazy_static::lazy_static! {
    static ref SINGLE_ARG_OPTION_SET : HashSet<&'static str> = SINGLE_ARG_OPTIONS.iter().copied().collect();
}

/// Return true if the argument is an option (as opposed to an input file).  A
/// lone dash names stdin and is treated as an input.
pub fn is_option_arg(arg : &str) -> bool {
    arg.starts_with('-') && arg.len() > 1
}

/// Return true if the argument is a gcc/clang option whose value is the next
/// argument
pub fn next_arg_is_option_value(arg : &str) -> bool {
    SINGLE_ARG_OPTION_SET.contains(arg)
}

/// Return the value of a joined output flag (`-ofoo.o`), if this is one
pub fn joined_output(arg : &str) -> Option<&str> {
    match arg.strip_prefix("-o") {
        Some(rest) if !rest.is_empty() && !arg.starts_with("-obj") => Some(rest),
        _ => None,
    }
}

/// One classified position of a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedArgument<'a> {
    /// A flag that stands alone
    Flag(&'a str),
    /// A flag together with the value it consumed
    FlagWithValue(&'a str, &'a str),
    /// A positional input
    Input(&'a str),
    /// The output path; `joined` is true for the `-ofile` spelling
    Output { path : &'a str, joined : bool },
}

impl ClassifiedArgument<'_> {
    /// Number of command line tokens this classification consumed
    pub fn token_count(&self) -> usize {
        match self {
            ClassifiedArgument::FlagWithValue(_, _) => 2,
            ClassifiedArgument::Output { joined : false, .. } => 2,
            _ => 1,
        }
    }
}

/// Classify the arguments of `command` (excluding argv[0]) from left to right
///
/// Flags that take a value consume exactly one extra token; every token ends
/// up in exactly one classification.
pub fn classify(command : &[String]) -> Result<Vec<ClassifiedArgument<'_>>, WrapperError> {
    let mut classified = Vec::new();
    let mut it = command.iter().skip(1);
    while let Some(arg) = it.next() {
        if next_arg_is_option_value(arg) {
            let value = it.next().ok_or_else(
                || WrapperError::MissingOptionValue(arg.clone(), command.to_vec()))?;
            if arg == "-o" {
                classified.push(ClassifiedArgument::Output { path : value, joined : false });
            } else {
                classified.push(ClassifiedArgument::FlagWithValue(arg, value));
            }
        } else if let Some(path) = joined_output(arg) {
            classified.push(ClassifiedArgument::Output { path, joined : true });
        } else if is_option_arg(arg) {
            classified.push(ClassifiedArgument::Flag(arg));
        } else {
            classified.push(ClassifiedArgument::Input(arg));
        }
    }
    Ok(classified)
}

/// Returns true if the compiler invocation produces no code output, so that
/// there is nothing to mirror in the shadow build
///
/// Preprocessing, dependency generation, syntax checks, configuration dumps,
/// and invocations that already emit bitcode all fall in this category.
pub fn is_non_generative(command : &[String]) -> bool {
    command.iter().skip(1).any(|arg| {
        arg == "-E"
            || arg == "-M"     // implies -E
            || arg == "-MM"    // implies -E
            || arg == "-fsyntax-only"
            || arg == "-emit-llvm"
            || arg == "-dumpversion"
            || arg == "-dumpmachine"
            || arg.starts_with("-print-")
            || arg.starts_with("--print-")
    })
}

/// Returns true if the invocation only asks the tool for its version or usage
pub fn is_metadata_query(command : &[String]) -> bool {
    let args = &command[1.min(command.len())..];
    (args.len() == 1 && args[0] == "-v")
        || args.iter().any(|a| a == "--version" || a == "-version" || a == "--help" || a == "-help")
}
