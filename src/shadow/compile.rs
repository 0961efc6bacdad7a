use log::{info, warn};
use std::path::Path;

use crate::shadow::artifact::{bitcode_name, strip_libtool_dir};
use crate::shadow::clang_support::{classify, ClassifiedArgument, FrontEnd};
use crate::shadow::command::{empty_ir_command, BuildMode, RewriteContext, Role, WrapperCommand};
use crate::shadow::error::WrapperError;
use crate::shadow::policy::to_absolute;

/// Flags that some of the compilers we stand in for reject, removed from
/// both the IR and the real command
static NATIVE_INCOMPATIBLE_FLAGS : &[&str] =
    &["-fexcess-precision=standard",
      "-frounding-math"
    ];

/// Flags required by the real compile but not accepted when emitting IR
static IR_INCOMPATIBLE_FLAGS : &[&str] =
    &["-Wa,--noexecstack"
    ];

/// Flags that are always appended to the IR compile command.  User
/// supplied duplicates (and any conflicting `-g*`/`-finline`) are dropped.
static IR_COMPILE_FLAGS : &[&str] =
    &["-c",
      "-gline-tables-only",
      "-emit-llvm",
      "-fno-inline"
    ];

/// Architecture directories whose assembly sources commonly have a portable
/// C implementation one directory up (e.g., musl's `src/string/x86_64/memcpy.s`
/// next to `src/string/memcpy.c`)
static ARCH_DIRS : &[&str] =
    &["x86_64",
      "i386",
      "aarch64",
      "arm",
      "mips",
      "mips64",
      "powerpc",
      "powerpc64",
      "riscv64",
      "s390x"
    ];

/// Remove the flags that the real compilers may reject
pub fn native_compatible(tokens : &[String]) -> Vec<String> {
    tokens.iter()
        .filter(|t| !NATIVE_INCOMPATIBLE_FLAGS.contains(&t.as_str()))
        .cloned()
        .collect()
}

fn is_assembly(path : &str) -> bool {
    path.ends_with(".s") || path.ends_with(".S")
}

/// Find a C source standing in for an architecture-specific assembly file
fn portable_c_source(path : &str, cwd : &Path) -> Option<String> {
    let stem = &path[..path.len() - 2];
    ARCH_DIRS.iter()
        .map(|arch| format!("/{}/", arch))
        .filter(|dir| stem.contains(dir.as_str()))
        .map(|dir| format!("{}.c", stem.replacen(dir.as_str(), "/", 1)))
        .find(|candidate| to_absolute(cwd, candidate).is_file())
}

/// The object file the compiler writes when there is no `-o`: the input's
/// file stem in the current directory
fn implicit_output(input : &str, assemble_only : bool) -> String {
    let stem = Path::new(input).file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.to_owned());
    format!("{}.{}", stem, if assemble_only { "s" } else { "o" })
}

/// Compute the IR command for a compile-only (`-c` or `-S`) invocation
pub fn rewrite_compile(front_end : FrontEnd,
                       command : &[String],
                       ctx : &RewriteContext) -> Result<WrapperCommand, WrapperError> {
    let real_command = native_compatible(command);
    let mut ir_command = vec![ctx.toolchain.ir_tool(front_end.ir_compiler_name())];
    let mut inputs : Vec<&str> = Vec::new();
    let mut output : Option<&str> = None;
    let mut compile_only = false;
    let mut assemble_only = false;
    let mut placeholder = false;

    for arg in classify(command)? {
        match arg {
            ClassifiedArgument::Flag(f) => {
                if f == "-c" {
                    compile_only = true;
                } else if f == "-S" {
                    assemble_only = true;
                } else if f.starts_with("-g")
                    || f == "-finline"
                    || IR_COMPILE_FLAGS.contains(&f)
                    || NATIVE_INCOMPATIBLE_FLAGS.contains(&f)
                    || IR_INCOMPATIBLE_FLAGS.contains(&f) {
                    continue;
                } else {
                    ir_command.push(f.to_owned());
                }
            }
            ClassifiedArgument::FlagWithValue(f, v) => {
                ir_command.push(f.to_owned());
                ir_command.push(v.to_owned());
            }
            ClassifiedArgument::Output { path, .. } => {
                output = Some(path);
            }
            ClassifiedArgument::Input(path) => {
                if path == "-" {
                    info!("Compiling from stdin, which cannot be replayed for IR: {:?}", command);
                    return Ok(WrapperCommand::nothing_to_do(Role::Compile, BuildMode::NoOp, real_command));
                }
                inputs.push(path);
                if !is_assembly(path) {
                    ir_command.push(path.to_owned());
                } else if let Some(c_source) = portable_c_source(path, ctx.cwd) {
                    info!("Compiling {:?} in place of assembly file {:?}", c_source, path);
                    ir_command.push(c_source);
                } else if ctx.policy.skip_assembly_files {
                    warn!("Generating an empty IR file for assembly input {:?}", path);
                    placeholder = true;
                } else {
                    return Err(WrapperError::UnsupportedInputKind(path.to_owned(), command.to_vec()));
                }
            }
        }
    }

    if inputs.is_empty() {
        return Err(WrapperError::NoInputFiles(command.to_vec()));
    }
    let native_output = match output {
        Some(o) => o.to_owned(),
        None => {
            if inputs.len() != 1 {
                return Err(WrapperError::AmbiguousOutput(
                    inputs.iter().map(|s| s.to_string()).collect(),
                    command.to_vec()));
            }
            implicit_output(inputs[0], assemble_only && !compile_only)
        }
    };

    // libtool deletes everything else in its object directory, so the
    // bitcode goes one level up
    let ir_output = bitcode_name(&strip_libtool_dir(&native_output).unwrap_or(native_output));

    if placeholder {
        let ir_command = empty_ir_command(ctx.toolchain, &ir_output);
        return Ok(WrapperCommand::generate(Role::Compile, BuildMode::Object, ir_command, real_command));
    }

    ir_command.extend(IR_COMPILE_FLAGS.iter().map(|s| s.to_string()));
    ir_command.push("-o".to_owned());
    ir_command.push(ir_output);
    Ok(WrapperCommand::generate(Role::Compile, BuildMode::Object, ir_command, real_command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::policy::{Policy, Toolchain};
    use crate::shadow::resolver::tests::FakeProbe;

    fn cmd(s : &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn rewrite_in(cwd : &Path, policy : &Policy, front_end : FrontEnd, s : &str) -> Result<WrapperCommand, WrapperError> {
        let toolchain = Toolchain::default();
        let probe = FakeProbe::new(&[]);
        let ctx = RewriteContext { policy, toolchain : &toolchain, probe : &probe, cwd };
        rewrite_compile(front_end, &cmd(s), &ctx)
    }

    fn rewrite(front_end : FrontEnd, s : &str) -> Result<WrapperCommand, WrapperError> {
        rewrite_in(Path::new("/nonexistent"), &Policy::default(), front_end, s)
    }

    fn count(cmd : &[String], flag : &str) -> usize {
        cmd.iter().filter(|a| *a == flag).count()
    }

    #[test]
    fn test_implicit_output() -> anyhow::Result<()> {
        let wc = rewrite(FrontEnd::Cxx, "clang++ -c foo.c")?;
        assert_eq!(wc.ir_command[0], "clang++");
        assert_eq!(wc.ir_output(), Some("foo.o.bc"));
        assert_eq!(count(&wc.ir_command, "-gline-tables-only"), 1);
        assert_eq!(count(&wc.ir_command, "-fno-inline"), 1);
        assert_eq!(count(&wc.ir_command, "-emit-llvm"), 1);
        assert_eq!(wc.real_command, cmd("clang++ -c foo.c"));
        assert_eq!(wc.mode, BuildMode::Object);
        Ok(())
    }

    #[test]
    fn test_explicit_output() -> anyhow::Result<()> {
        let wc = rewrite(FrontEnd::Cxx, "clang++ -o .obj/foo.o -c foo.c")?;
        assert_eq!(wc.ir_output(), Some(".obj/foo.o.bc"));
        assert_eq!(count(&wc.ir_command, "-o"), 1);
        let wc = rewrite(FrontEnd::C, "clang -c src/foo.c -o.obj/foo.o")?;
        assert_eq!(wc.ir_output(), Some(".obj/foo.o.bc"));
        assert_eq!(wc.real_command, cmd("clang -c src/foo.c -o.obj/foo.o"));
        Ok(())
    }

    #[test]
    fn test_debug_and_inline_flags_replaced() -> anyhow::Result<()> {
        let wc = rewrite(FrontEnd::C, "clang -g -ggdb3 -finline -emit-llvm -fno-inline -O2 -c foo.c")?;
        assert!(!wc.ir_command.iter().any(|a| a.starts_with("-g") && a != "-gline-tables-only"));
        assert_eq!(count(&wc.ir_command, "-gline-tables-only"), 1);
        assert_eq!(count(&wc.ir_command, "-finline"), 0);
        assert_eq!(count(&wc.ir_command, "-fno-inline"), 1);
        assert_eq!(count(&wc.ir_command, "-emit-llvm"), 1);
        assert_eq!(count(&wc.ir_command, "-O2"), 1);
        Ok(())
    }

    #[test]
    fn test_incompatible_flags() -> anyhow::Result<()> {
        let wc = rewrite(FrontEnd::C, "gcc -fexcess-precision=standard -frounding-math -Wa,--noexecstack -c foo.c")?;
        for flag in &["-fexcess-precision=standard", "-frounding-math"] {
            assert_eq!(count(&wc.ir_command, flag), 0);
            assert_eq!(count(&wc.real_command, flag), 0);
        }
        assert_eq!(count(&wc.ir_command, "-Wa,--noexecstack"), 0);
        assert_eq!(count(&wc.real_command, "-Wa,--noexecstack"), 1);
        Ok(())
    }

    #[test]
    fn test_assemble_only_becomes_compile() -> anyhow::Result<()> {
        let wc = rewrite(FrontEnd::C, "clang -S foo.c")?;
        assert_eq!(count(&wc.ir_command, "-S"), 0);
        assert_eq!(count(&wc.ir_command, "-c"), 1);
        assert_eq!(wc.ir_output(), Some("foo.s.bc"));
        Ok(())
    }

    #[test]
    fn test_libtool_output() -> anyhow::Result<()> {
        let wc = rewrite(FrontEnd::C, "clang -c foo.c -fPIC -o .libs/foo.o")?;
        assert_eq!(wc.ir_output(), Some("foo.o.bc"));
        assert_eq!(wc.real_command, cmd("clang -c foo.c -fPIC -o .libs/foo.o"));
        Ok(())
    }

    #[test]
    fn test_input_errors() {
        assert!(matches!(rewrite(FrontEnd::C, "clang -c -Wall"), Err(WrapperError::NoInputFiles(_))));
        assert!(matches!(rewrite(FrontEnd::C, "clang -c a.c b.c"), Err(WrapperError::AmbiguousOutput(_, _))));
        assert!(matches!(rewrite(FrontEnd::C, "clang -c -I"), Err(WrapperError::MissingOptionValue(_, _))));
        match rewrite(FrontEnd::C, "clang -c start.S -o start.o") {
            Err(WrapperError::UnsupportedInputKind(path, _)) => assert_eq!(path, "start.S"),
            other => panic!("Expected unsupported input, got {:?}", other),
        }
    }

    #[test]
    fn test_assembly_policies() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("src/string/x86_64"))?;
        std::fs::write(dir.path().join("src/string/memcpy.c"), "")?;

        let policy = Policy::default();
        let wc = rewrite_in(dir.path(), &policy, FrontEnd::C,
                            "clang -c src/string/x86_64/memcpy.s -o obj/memcpy.o")?;
        assert!(wc.ir_command.contains(&"src/string/memcpy.c".to_owned()));
        assert_eq!(wc.ir_output(), Some("obj/memcpy.o.bc"));

        let skipping = Policy { skip_assembly_files : true, ..Policy::default() };
        let wc = rewrite_in(dir.path(), &skipping, FrontEnd::C,
                            "clang -c src/thread/x86_64/clone.s -o obj/clone.o")?;
        assert!(!wc.nothing_to_do);
        assert_eq!(wc.ir_command, ["clang", "-c", "-emit-llvm", "-o", "obj/clone.o.bc", "-x", "c", "/dev/null"]);
        Ok(())
    }

    #[test]
    fn test_stdin_input() -> anyhow::Result<()> {
        let wc = rewrite(FrontEnd::C, "clang -x c -c - -o foo.o")?;
        assert!(wc.nothing_to_do);
        Ok(())
    }
}
