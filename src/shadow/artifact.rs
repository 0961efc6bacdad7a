/// Marker inserted into native artifact names to name their bitcode siblings
pub const BITCODE_MARKER : &str = "bc";

/// The directory libtool moves its real objects into
pub const LIBTOOL_OBJDIR : &str = ".libs/";

/// Split a path into (directory prefix including the trailing '/', file name)
fn split_file_name(path : &str) -> (&str, &str) {
    match path.rfind('/') {
        None => ("", path),
        Some(idx) => path.split_at(idx + 1),
    }
}

/// Return the path of the bitcode file corresponding to the native artifact
/// at `path`
///
/// Versioned shared objects and archives keep their version suffix after the
/// marker (`libfoo.so.1.2.3` becomes `libfoo.so.bc.1.2.3`), everything else
/// simply gets `.bc` appended.  Only the file name is examined, so dotted
/// directory names never affect the result.
pub fn bitcode_name(path : &str) -> String {
    let (dir, file) = split_file_name(path);
    let sibling = if file.contains(".so.") {
        file.replacen(".so.", &format!(".so.{}.", BITCODE_MARKER), 1)
    } else if file.contains(".a.") {
        file.replacen(".a.", &format!(".a.{}.", BITCODE_MARKER), 1)
    } else {
        format!("{}.{}", file, BITCODE_MARKER)
    };
    format!("{}{}", dir, sibling)
}

/// Returns true if the file name looks like a (possibly versioned) shared object
pub fn is_shared_library(path : &str) -> bool {
    let (_, file) = split_file_name(path);
    file.ends_with(".so") || file.contains(".so.")
}

/// Returns true if the file name looks like a (possibly versioned) static archive
pub fn is_static_library(path : &str) -> bool {
    let (_, file) = split_file_name(path);
    file.ends_with(".a") || file.contains(".a.")
}

/// Artifacts whose bitcode siblings follow them when the build system
/// relocates them with mv/ln/cp/install
///
/// Plain `.o` files are not tracked: their siblings are written next to the
/// final object path by the compile step.
pub fn is_tracked_artifact(path : &str) -> bool {
    is_shared_library(path) || is_static_library(path) || path.ends_with(".lo")
}

/// Remove the libtool object directory from a path, if present
///
/// libtool compiles into `.libs/foo.o` and then deletes everything else in
/// that directory, so bitcode is kept one level higher.
pub fn strip_libtool_dir(path : &str) -> Option<String> {
    if let Some(rest) = path.strip_prefix(LIBTOOL_OBJDIR) {
        return Some(rest.to_owned());
    }
    let inner = format!("/{}", LIBTOOL_OBJDIR);
    path.find(&inner).map(|idx| {
        let mut stripped = String::from(&path[..idx + 1]);
        stripped.push_str(&path[idx + inner.len()..]);
        stripped
    })
}
