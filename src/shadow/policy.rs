use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Bypass IR generation entirely; the real tool is executed unmodified
pub const NO_EMIT_IR : &str = "NO_EMIT_IR";
/// Run the system compiler from `PATH` as the real tool, not the one in the
/// IR toolchain directory
pub const DELEGATE_TO_SYSTEM_COMPILER : &str = "DELEGATE_TO_SYSTEM_COMPILER";
/// Emit an empty IR module for assembly inputs that cannot be converted
pub const SKIP_ASSEMBLY_FILES : &str = "SKIP_ASSEMBLY_FILES";
/// Drop link inputs without bitcode instead of failing
pub const SKIP_MISSING_LINKER_INPUT : &str = "SKIP_MISSING_LINKER_INPUT";
/// Mirror `install` invocations for bitcode siblings
pub const INSTALL_BITCODE : &str = "INSTALL_BITCODE";
/// Directory containing the IR-capable compiler and link tool
pub const IR_TOOLCHAIN_BINDIR : &str = "IR_TOOLCHAIN_BINDIR";

/// The name of the IR link tool
pub const IR_LINK_TOOL : &str = "llvm-link";

/// An environment variable counts as set if it is present, non-empty, and not `0`
pub fn env_flag_set(value : Option<&OsStr>) -> bool {
    match value {
        None => false,
        Some(v) => !v.is_empty() && v != "0",
    }
}

/// Policy switches read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    pub no_emit_ir : bool,
    pub delegate_to_system_compiler : bool,
    pub skip_assembly_files : bool,
    pub skip_missing_linker_input : bool,
    pub install_bitcode : bool,
}

impl Policy {
    pub fn from_env() -> Policy {
        Policy::from_lookup(|name| std::env::var_os(name))
    }

    /// Build the policy from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup : F) -> Policy
    where F : Fn(&str) -> Option<OsString>
    {
        let flag = |name| env_flag_set(lookup(name).as_deref());
        Policy { no_emit_ir : flag(NO_EMIT_IR),
                 delegate_to_system_compiler : flag(DELEGATE_TO_SYSTEM_COMPILER),
                 skip_assembly_files : flag(SKIP_ASSEMBLY_FILES),
                 skip_missing_linker_input : flag(SKIP_MISSING_LINKER_INPUT),
                 install_bitcode : flag(INSTALL_BITCODE),
        }
    }
}

/// Where the IR tools and the real tools are found
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
    /// Directory holding the IR-capable `clang`, `clang++`, and `llvm-link`
    pub bindir : Option<PathBuf>,
    /// Search path for the real tools (defaults to `PATH`)
    pub search_path : Option<OsString>,
}

impl Toolchain {
    pub fn from_env() -> Toolchain {
        Toolchain { bindir : std::env::var_os(IR_TOOLCHAIN_BINDIR)
                                 .filter(|d| !d.is_empty())
                                 .map(PathBuf::from),
                    search_path : std::env::var_os("PATH"),
        }
    }

    fn in_bindir(&self, name : &str) -> Option<PathBuf> {
        self.bindir.as_ref()
            .map(|d| d.join(name))
            .filter(|p| p.is_file())
    }

    /// The command token used to run the named IR tool
    ///
    /// If the tool exists in the toolchain directory its full path is used,
    /// otherwise the bare name is left for `PATH` lookup.
    pub fn ir_tool(&self, name : &str) -> String {
        match self.in_bindir(name) {
            Some(p) => p.to_string_lossy().into_owned(),
            None => name.to_owned(),
        }
    }

    /// Find the executable to run as the real tool
    ///
    /// Unless delegating to the system compiler, the toolchain directory is
    /// preferred.  Any candidate that is this wrapper itself is skipped so
    /// that a wrapper link named after the tool does not recurse.
    pub fn resolve_real(&self, name : &str, delegate_to_system : bool, cwd : &Path) -> Option<PathBuf> {
        if name.contains('/') {
            return Some(to_absolute(cwd, name));
        }
        let this_exe = std::env::current_exe().ok().and_then(|p| p.canonicalize().ok());
        let is_self = |p : &PathBuf| {
            match (&this_exe, p.canonicalize()) {
                (Some(me), Ok(other)) => *me == other,
                _ => false,
            }
        };
        if !delegate_to_system {
            if let Some(p) = self.in_bindir(name) {
                if !is_self(&p) {
                    return Some(p);
                }
            }
        }
        let mut candidates = which::which_in_all(name, self.search_path.as_ref(), cwd).ok()?;
        candidates.find(|p| !is_self(p))
    }
}

/// If the `partial_path` is already absolute, just return it.
///
/// Otherwise, make the path absolute by prefixing the `cwd`.
pub fn to_absolute(cwd : &Path, partial_path : &str) -> PathBuf {
    // PathBuf::push replaces the whole buffer when given an absolute path
    let mut p = PathBuf::from(cwd);
    p.push(partial_path);
    p
}
