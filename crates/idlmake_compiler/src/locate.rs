//! Finding the compiler executable.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::InvokeError;

/// Resolves the configured compiler to an executable path.
///
/// A value containing a path separator is used as-is. A bare name is looked
/// up in `<home>/bin` first, then in each directory of `PATH`.
pub fn locate_compiler(compiler: &Path, home: Option<&Path>) -> Result<PathBuf, InvokeError> {
    locate_in(compiler, home, std::env::var_os("PATH"))
}

fn locate_in(
    compiler: &Path,
    home: Option<&Path>,
    path_var: Option<OsString>,
) -> Result<PathBuf, InvokeError> {
    let not_found = || InvokeError::ToolNotFound {
        path: compiler.to_path_buf(),
    };

    if compiler.components().count() > 1 {
        return if compiler.is_file() {
            Ok(compiler.to_path_buf())
        } else {
            Err(not_found())
        };
    }

    let mut dirs: Vec<PathBuf> = Vec::new();
    if let Some(home) = home {
        dirs.push(home.join("bin"));
    }
    if let Some(path_var) = path_var {
        dirs.extend(std::env::split_paths(&path_var));
    }

    for dir in dirs {
        for candidate in candidates(&dir, compiler) {
            if candidate.is_file() {
                debug!(compiler = %candidate.display(), "located compiler");
                return Ok(candidate);
            }
        }
    }
    Err(not_found())
}

fn candidates(dir: &Path, name: &Path) -> Vec<PathBuf> {
    let plain = dir.join(name);
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() || name.extension().is_some() {
        vec![plain]
    } else {
        let mut with_suffix = plain.clone().into_os_string();
        with_suffix.push(suffix);
        vec![plain, PathBuf::from(with_suffix)]
    }
}
