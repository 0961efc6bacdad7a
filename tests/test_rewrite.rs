use std::path::Path;
use tempfile::tempdir;

use shadow::shadow::artifact::bitcode_name;
use shadow::shadow::clang_support::classify;
use shadow::shadow::command::{BuildMode, Role, ShadowStep};
use shadow::shadow::error::WrapperError;
use shadow::shadow::policy::{Policy, Toolchain};
use shadow::shadow::resolver::resolve_bitcode;

mod common;
use common::{cmd, plan, SuffixProbe};

fn count(tokens : &[String], flag : &str) -> usize {
    tokens.iter().filter(|t| *t == flag).count()
}

#[test]
fn test_artifact_names() {
    assert_eq!(bitcode_name("foo.o"), "foo.o.bc");
    assert_eq!(bitcode_name("libfoo.so.1.2.3"), "libfoo.so.bc.1.2.3");
    assert_eq!(bitcode_name("libfoo.a.2"), "libfoo.a.bc.2");
}

#[test]
fn test_classification_partitions_real_command_lines() -> anyhow::Result<()> {
    let lines = ["cc -DHAVE_CONFIG_H -I. -I.. -isystem /usr/include/x -g -O2 -MT foo.lo -MD -MP -MF .deps/foo.Tpo -c foo.c -fPIC -DPIC -o .libs/foo.o",
                 "c++ -shared -fPIC -o libbar.so.1.0.0 a.o b.o -Wl,-soname,libbar.so.1 -Xlinker --as-needed -L/usr/lib -lz -lm",
                 "gcc -std=c99 -x c -include config.h -o prog main.c -",
                 "clang --param ssp-buffer-size=4 -mllvm -inline-threshold=0 -target x86_64-linux-gnu -c x.c"];
    for line in &lines {
        let command = cmd(line);
        let consumed : usize = classify(&command)?.iter().map(|c| c.token_count()).sum();
        assert_eq!(consumed, command.len() - 1, "Partition of {:?}", line);
    }
    Ok(())
}

#[test]
fn test_compile_properties() -> anyhow::Result<()> {
    let policy = Policy::default();
    let tc = Toolchain::default();
    let cwd = Path::new("/");

    let wc = plan(&policy, &tc, cwd, "clang++ -c foo.c")?;
    assert_eq!(wc.role, Role::Compile);
    assert_eq!(wc.ir_output(), Some(bitcode_name("foo.o").as_str()));
    assert_eq!(count(&wc.ir_command, "-gline-tables-only"), 1);
    assert_eq!(count(&wc.ir_command, "-fno-inline"), 1);
    assert_eq!(count(&wc.ir_command, "-emit-llvm"), 1);
    assert!(!wc.ir_command.iter().any(|t| t.starts_with("-g") && t != "-gline-tables-only"));

    let wc = plan(&policy, &tc, cwd, "clang++ -o .obj/foo.o -c foo.c")?;
    assert_eq!(wc.ir_output(), Some(bitcode_name(".obj/foo.o").as_str()));

    let wc = plan(&policy, &tc, cwd, "gcc -g3 -fexcess-precision=standard -frounding-math -c foo.c")?;
    for flag in &["-fexcess-precision=standard", "-frounding-math"] {
        assert_eq!(count(&wc.ir_command, flag), 0);
        assert_eq!(count(&wc.real_command, flag), 0);
    }
    assert_eq!(count(&wc.real_command, "-g3"), 1);
    Ok(())
}

#[test]
fn test_link_properties() -> anyhow::Result<()> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("foo.o.bc"), "")?;
    let policy = Policy::default();
    let tc = Toolchain::default();

    assert_eq!(plan(&policy, &tc, dir.path(), "clang -shared foo.o")?.mode, BuildMode::SharedLib);
    assert_eq!(plan(&policy, &tc, dir.path(), "clang++ -o libfoo.so.1.0.0 foo.o")?.mode, BuildMode::SharedLib);
    assert_eq!(plan(&policy, &tc, dir.path(), "clang foo.o")?.mode, BuildMode::Executable);

    let c = plan(&policy, &tc, dir.path(), "cc foo.o")?.ir_command;
    assert_eq!((count(&c, "-lc"), count(&c, "-lc++")), (1, 0));
    let cxx = plan(&policy, &tc, dir.path(), "g++ foo.o")?.ir_command;
    assert_eq!((count(&cxx, "-lc"), count(&cxx, "-lc++")), (1, 1));
    let free = plan(&policy, &tc, dir.path(), "clang++ -ffreestanding foo.o")?.ir_command;
    assert_eq!((count(&free, "-lc"), count(&free, "-lc++")), (0, 0));

    let wc = plan(&policy, &tc, dir.path(), "clang -o foo foo.o /usr/lib/libbar.so")?;
    assert_eq!(count(&wc.ir_command, "-lbar"), 1);
    let wc = plan(&policy, &tc, dir.path(), "clang -o foo foo.o /usr/lib/libbar.so.1.2.3")?;
    assert_eq!(count(&wc.ir_command, "-lbar.so.bc.1.2.3"), 1);
    Ok(())
}

#[test]
fn test_link_rejects_unprefixed_shared_object() -> anyhow::Result<()> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("foo.o.bc"), "")?;
    let err = plan(&Policy::default(), &Toolchain::default(), dir.path(), "clang -o foo foo.o bar.so")
        .expect_err("bar.so has no lib prefix");
    assert!(matches!(err.downcast_ref::<WrapperError>(), Some(WrapperError::InvalidLibraryName(_, _))));
    Ok(())
}

#[test]
fn test_archive_properties() -> anyhow::Result<()> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("foo.o.bc"), "")?;
    let policy = Policy::default();
    let tc = Toolchain::default();

    for line in &["ar cqs foo foo.o", "ar r foo foo.o"] {
        let wc = plan(&policy, &tc, dir.path(), line)?;
        assert_eq!(wc.ir_command, ["llvm-link", "-libmd", "foo.o.bc", "-o", "foo.bc"]);
        assert_eq!(wc.ir_output(), Some(bitcode_name("foo").as_str()));
    }
    let wc = plan(&policy, &tc, dir.path(), "ar r foo foo.o foo.o")?;
    assert_eq!(count(&wc.ir_command, "foo.o.bc"), 2);
    assert_eq!(wc.shadow_step, ShadowStep::RecombineArchive { archive_ir : "foo.bc".to_owned() });

    assert!(plan(&policy, &tc, dir.path(), "ar x foo")?.nothing_to_do);
    assert!(plan(&policy, &tc, dir.path(), "ranlib foo")?.nothing_to_do);
    Ok(())
}

#[test]
fn test_fileop_properties() -> anyhow::Result<()> {
    let policy = Policy::default();
    let tc = Toolchain::default();
    let cwd = Path::new("/");

    assert!(plan(&policy, &tc, cwd, "mv -f foo.o bar.o")?.nothing_to_do);
    assert_eq!(plan(&policy, &tc, cwd, "mv -f foo.so bar.so")?.ir_command, cmd("mv -f foo.so.bc bar.so.bc"));
    assert_eq!(count(&plan(&policy, &tc, cwd, "mv libfoo.a ../lib")?.ir_command, "-f"), 1);
    assert_eq!(count(&plan(&policy, &tc, cwd, "ln -s libfoo.so.1 libfoo.so")?.ir_command, "-f"), 1);
    assert!(plan(&policy, &tc, cwd, "install libfoo.so /usr/lib")?.nothing_to_do);
    Ok(())
}

#[test]
fn test_resolver_tolerance() -> anyhow::Result<()> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("a.o.bc"), "")?;
    let inputs = cmd("a.o b.o");
    assert!(resolve_bitcode(&inputs, false, &SuffixProbe, dir.path()).is_err());
    assert_eq!(resolve_bitcode(&inputs, true, &SuffixProbe, dir.path())?, ["a.o.bc"]);
    Ok(())
}

#[test]
fn test_unsupported_invocations() -> anyhow::Result<()> {
    let policy = Policy::default();
    let tc = Toolchain::default();
    let cwd = Path::new("/");
    for (line, expect_not_implemented) in &[("ld -o foo foo.o", true), ("lld -o foo foo.o", true), ("make all", false)] {
        let err = plan(&policy, &tc, cwd, line).expect_err("not a wrappable tool");
        match err.downcast_ref::<WrapperError>() {
            Some(WrapperError::NotImplemented(_, _)) => assert!(*expect_not_implemented),
            Some(WrapperError::UnsupportedInvocation(_, _)) => assert!(!*expect_not_implemented),
            other => panic!("Unexpected error {:?}", other),
        }
    }
    Ok(())
}
