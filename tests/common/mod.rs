use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use shadow::shadow::command::{Invocation, RewriteContext, WrapperCommand};
use shadow::shadow::dispatch::{compute_wrapper_command, normalize_invocation};
use shadow::shadow::policy::{Policy, Toolchain};
use shadow::shadow::resolver::FileTypeProbe;

/// A fake tool: records its invocation in `tools.log` and writes its `-o`
/// output, which holds the contents of every input file it was given (so
/// the IR link of members can be checked by reading the result)
const FAKE_TOOL : &str = r#"#!/bin/sh
PATH=/usr/bin:/bin:$PATH
echo "@NAME@ NO_EMIT_IR=${NO_EMIT_IR:-} $*" >> "@LOG@"
out=""
prev=""
inputs=""
for a in "$@"; do
    if [ "$prev" = "-o" ]; then
        out="$a"
    elif [ -f "$a" ]; then
        inputs="$inputs $a"
    fi
    prev="$a"
done
if [ -n "$out" ]; then
    if [ -n "$inputs" ]; then
        cat $inputs > "$out"
    else
        echo "@NAME@" > "$out"
    fi
fi
exit @CODE@
"#;

#[allow(dead_code)]
/// A directory of fake tools standing in for both the IR toolchain and the
/// system tools
pub struct FakeTools {
    pub dir : TempDir,
}

impl FakeTools {
    #[allow(dead_code)]
    pub fn new() -> anyhow::Result<FakeTools> {
        Ok(FakeTools { dir : tempfile::tempdir()? })
    }

    #[allow(dead_code)]
    /// Add a tool that exits with `code`
    pub fn add(&self, name : &str, code : i32) -> anyhow::Result<&FakeTools> {
        let script = FAKE_TOOL.replace("@NAME@", name)
                              .replace("@LOG@", &self.log_path().to_string_lossy())
                              .replace("@CODE@", &code.to_string());
        let path = self.dir.path().join(name);
        std::fs::write(&path, script)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        Ok(self)
    }

    #[allow(dead_code)] // used in test_sequencer, but not test_rewrite
    pub fn with_tools(names : &[&str]) -> anyhow::Result<FakeTools> {
        let tools = FakeTools::new()?;
        for name in names {
            tools.add(name, 0)?;
        }
        Ok(tools)
    }

    #[allow(dead_code)]
    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("tools.log")
    }

    #[allow(dead_code)]
    /// Each recorded invocation as `<tool> NO_EMIT_IR=<value> <args>`
    pub fn log(&self) -> Vec<String> {
        std::fs::read_to_string(self.log_path())
            .map(|s| s.lines().map(String::from).collect())
            .unwrap_or_default()
    }

    #[allow(dead_code)]
    pub fn toolchain(&self) -> Toolchain {
        Toolchain { bindir : Some(self.dir.path().to_path_buf()),
                    search_path : Some(self.dir.path().as_os_str().to_owned()) }
    }
}

/// Reports every file whose name ends in `.bc` as bitcode
pub struct SuffixProbe;

impl FileTypeProbe for SuffixProbe {
    fn describe(&self, _cwd : &Path, paths : &[String]) -> anyhow::Result<Vec<String>> {
        Ok(paths.iter()
           .map(|p| if p.ends_with(".bc") { "LLVM IR bitcode".to_owned() } else { "data".to_owned() })
           .collect())
    }
}

#[allow(dead_code)]
pub fn cmd(s : &str) -> Vec<String> {
    s.split_whitespace().map(String::from).collect()
}

/// Compute the wrapper command for `s` as if run in `cwd`
pub fn plan(policy : &Policy, toolchain : &Toolchain, cwd : &Path, s : &str) -> anyhow::Result<WrapperCommand> {
    let inv = normalize_invocation(Invocation::new(cmd(s))?);
    let ctx = RewriteContext { policy, toolchain, probe : &SuffixProbe, cwd };
    Ok(compute_wrapper_command(&inv, &ctx)?)
}
