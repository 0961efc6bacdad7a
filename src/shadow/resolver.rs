use log::{debug, warn};
use std::path::Path;
use std::process;

use crate::shadow::artifact::{bitcode_name, strip_libtool_dir};
use crate::shadow::error::WrapperError;
use crate::shadow::policy::to_absolute;

/// The string that `file` reports for LLVM bitcode
const BITCODE_FILE_TYPE : &str = "LLVM IR bitcode";

/// Something that can report the type of files on disk
pub trait FileTypeProbe {
    /// Describe each of the `paths` (relative to `cwd`), in order
    fn describe(&self, cwd : &Path, paths : &[String]) -> anyhow::Result<Vec<String>>;
}

/// Probe file types with the `file` utility
pub struct FileCommandProbe;

impl FileTypeProbe for FileCommandProbe {
    fn describe(&self, cwd : &Path, paths : &[String]) -> anyhow::Result<Vec<String>> {
        let out = process::Command::new("file")
            .arg("--brief")
            .arg("--")
            .args(paths)
            .current_dir(cwd)
            .output()?;
        let descriptions : Vec<String> =
            String::from_utf8_lossy(&out.stdout).lines().map(String::from).collect();
        if descriptions.len() != paths.len() {
            return Err(anyhow::anyhow!("Unexpected output from `file` for {:?}: {:?}", paths, descriptions));
        }
        Ok(descriptions)
    }
}

/// Outcome of looking for the bitcode of a set of inputs
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Bitcode files to use, in input order
    pub found : Vec<String>,
    /// Inputs for which no bitcode could be located
    pub missing : Vec<String>,
}

/// Locate the bitcode corresponding to each of the `paths`
///
/// Each path is resolved to its bitcode sibling, or to that sibling with the
/// libtool object directory removed.  Whatever is left is handed to the
/// `probe`, and accepted as-is if it already is a bitcode file.
pub fn find_bitcode(paths : &[String], probe : &dyn FileTypeProbe, cwd : &Path) -> Resolution {
    let exists = |p : &str| to_absolute(cwd, p).exists();
    let mut slots : Vec<Option<String>> = Vec::with_capacity(paths.len());
    let mut to_probe = Vec::new();
    for path in paths {
        let sibling = bitcode_name(path);
        if exists(&sibling) {
            slots.push(Some(sibling));
            continue;
        }
        match strip_libtool_dir(&sibling) {
            Some(relocated) if exists(&relocated) => {
                debug!("Found libtool-relocated bitcode {:?} for {:?}", relocated, path);
                slots.push(Some(relocated));
            }
            _ => {
                slots.push(None);
                to_probe.push(path.clone());
            }
        }
    }

    let probed : Vec<bool> =
        if to_probe.is_empty() {
            Vec::new()
        } else {
            match probe.describe(cwd, &to_probe) {
                Ok(descs) => descs.iter().map(|d| d.contains(BITCODE_FILE_TYPE)).collect(),
                Err(err) => {
                    warn!("Could not determine file types of {:?}: {}", to_probe, err);
                    vec![false; to_probe.len()]
                }
            }
        };

    let mut res = Resolution::default();
    let mut probed_it = to_probe.into_iter().zip(probed);
    for slot in slots {
        match slot {
            Some(bc) => res.found.push(bc),
            None => match probed_it.next() {
                Some((path, true)) => res.found.push(path),
                Some((path, false)) => res.missing.push(path),
                None => {}
            }
        }
    }
    res
}

/// Resolve the bitcode of all `paths`
///
/// In strict mode any missing bitcode is an error; in tolerant mode the
/// missing inputs are dropped (with a warning) and the remaining subset,
/// possibly empty, is returned.
pub fn resolve_bitcode(paths : &[String],
                       tolerant : bool,
                       probe : &dyn FileTypeProbe,
                       cwd : &Path) -> Result<Vec<String>, WrapperError> {
    let res = find_bitcode(paths, probe, cwd);
    if !res.missing.is_empty() {
        if !tolerant {
            return Err(WrapperError::MissingBitcodeInputs(res.missing, cwd.to_path_buf()));
        }
        warn!("Ignoring inputs without bitcode: {:?}", res.missing);
    }
    Ok(res.found)
}
