//! Conformance test helpers for the idlmake build engine.
//!
//! Provides [`ScriptedCompiler`], an in-process stand-in for a `slice2*`
//! compiler that follows the same stdout/stderr contract without spawning a
//! process, and [`Workspace`], an on-disk project layout with timestamp
//! controls for driving staleness deterministically.
//!
//! The scripted compiler understands these directives in source text:
//!
//! ```text
//! #include "Other.ice"     dependency on a file next to the source
//! #output Name.java        generate `<output_dir>/Name.java` instead of the default
//! #warning message         warning at that line
//! #depend-warning message  warning reported while listing dependencies
//! #error message           error at that line; the run exits 1
//! ```
//!
//! A source without `#output` lines produces `<output_dir>/<stem>.out`. Outputs
//! are written even when the source has errors, mirroring compilers that write
//! partial output before failing.

#![warn(missing_docs)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use idlmake_build::{BuildCoordinator, BuildSettings};
use idlmake_common::CompilerArgs;
use idlmake_compiler::{CompilerInvoker, InvokeError, Invocation, InvokeMode};
use idlmake_diagnostics::{Diagnostic, Location};
use idlmake_state::{ArtifactMap, DependencyMap};

/// In-process compiler double driven by directives in the source text.
#[derive(Debug)]
pub struct ScriptedCompiler {
    output_dir: PathBuf,
    compiler_mtime: Option<SystemTime>,
    missing: bool,
    /// Number of dependency-listing runs.
    pub depend_calls: usize,
    /// Number of generation runs.
    pub generate_calls: usize,
    /// Sources passed to the most recent generation run.
    pub last_generated: Vec<PathBuf>,
}

impl ScriptedCompiler {
    /// Creates a compiler that writes into `output_dir`.
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            compiler_mtime: None,
            missing: false,
            depend_calls: 0,
            generate_calls: 0,
            last_generated: Vec::new(),
        }
    }

    /// Sets the modification time reported for the compiler binary.
    pub fn set_compiler_mtime(&mut self, mtime: Option<SystemTime>) {
        self.compiler_mtime = mtime;
    }

    /// Makes every subsequent invocation fail with `ToolNotFound`.
    pub fn set_missing(&mut self, missing: bool) {
        self.missing = missing;
    }

    /// Returns the output file generated for `source`.
    pub fn output_for(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output_dir.join(format!("{stem}.out"))
    }

    fn scan(&self, source: &Path) -> Script {
        let text = std::fs::read_to_string(source).unwrap_or_default();
        let dir = source.parent().unwrap_or(Path::new(""));
        let mut script = Script::default();

        for (idx, line) in text.lines().enumerate() {
            let location = || Some(Location::new(source, idx as u32 + 1));
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("#include") {
                let name = rest.trim().trim_matches(|c| c == '"' || c == '<' || c == '>');
                script.includes.push(dir.join(name));
            } else if let Some(rest) = line.strip_prefix("#output") {
                script.outputs.push(self.output_dir.join(rest.trim()));
            } else if let Some(rest) = line.strip_prefix("#warning") {
                script.diagnostics.push(Diagnostic::warning(rest.trim(), location()));
            } else if let Some(rest) = line.strip_prefix("#depend-warning") {
                script.listing.push(Diagnostic::warning(rest.trim(), location()));
            } else if let Some(rest) = line.strip_prefix("#error") {
                script.diagnostics.push(Diagnostic::error(rest.trim(), location()));
            }
        }
        if script.outputs.is_empty() {
            script.outputs.push(self.output_for(source));
        }
        script
    }
}

/// What one source asks of the scripted compiler.
#[derive(Default)]
struct Script {
    includes: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
    listing: Vec<Diagnostic>,
    diagnostics: Vec<Diagnostic>,
}

fn write_failed(e: std::io::Error) -> InvokeError {
    InvokeError::ToolInvocationFailed {
        tool: PathBuf::from("slice2java"),
        source: e,
    }
}

impl CompilerInvoker for ScriptedCompiler {
    fn invoke(&mut self, sources: &[PathBuf], mode: InvokeMode) -> Result<Invocation, InvokeError> {
        if self.missing {
            return Err(InvokeError::ToolNotFound {
                path: PathBuf::from("slice2java"),
            });
        }

        let mut invocation = Invocation::default();
        match mode {
            InvokeMode::Depend => {
                self.depend_calls += 1;
                let mut dependencies = DependencyMap::new();
                for source in sources {
                    let script = self.scan(source);
                    dependencies.insert(source.clone(), script.includes);
                    invocation.diagnostics.extend(script.listing);
                }
                invocation.dependencies = dependencies;
            }
            InvokeMode::Generate => {
                self.generate_calls += 1;
                self.last_generated = sources.to_vec();
                let mut generated = ArtifactMap::new();
                for source in sources {
                    let script = self.scan(source);
                    std::fs::create_dir_all(&self.output_dir).map_err(write_failed)?;
                    let contents = std::fs::read_to_string(source).unwrap_or_default();
                    for out in &script.outputs {
                        std::fs::write(out, &contents).map_err(write_failed)?;
                    }
                    generated.insert(source.clone(), script.outputs);
                    invocation.diagnostics.extend(script.diagnostics);
                }
                invocation.generated = generated;
                if invocation.errors().next().is_some() {
                    invocation.exit_code = 1;
                }
            }
        }
        Ok(invocation)
    }

    fn compiler_mtime(&self) -> Option<SystemTime> {
        self.compiler_mtime
    }
}

/// An on-disk project: `slice/` for sources and `generated/` for output.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Creates the layout under `root`.
    pub fn new(root: &Path) -> Self {
        let ws = Self {
            root: root.to_path_buf(),
        };
        std::fs::create_dir_all(ws.slice_dir()).unwrap();
        ws
    }

    /// Returns the source directory.
    pub fn slice_dir(&self) -> PathBuf {
        self.root.join("slice")
    }

    /// Returns the output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("generated")
    }

    /// Writes a source file and returns its path.
    pub fn write_source(&self, name: &str, text: &str) -> PathBuf {
        let path = self.slice_dir().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    /// Returns the compiler arguments for this workspace.
    pub fn args(&self) -> CompilerArgs {
        CompilerArgs::new([
            "slice2java".to_string(),
            format!("-I{}", self.slice_dir().display()),
            "--output-dir".to_string(),
            self.output_dir().display().to_string(),
        ])
    }

    /// Returns build settings for this workspace.
    pub fn settings(&self) -> BuildSettings {
        BuildSettings::new(&self.output_dir())
    }

    /// Returns a coordinator driving a fresh [`ScriptedCompiler`].
    pub fn coordinator(&self) -> BuildCoordinator<ScriptedCompiler> {
        BuildCoordinator::new(ScriptedCompiler::new(&self.output_dir()), self.settings())
    }
}

/// Returns a time `secs` seconds before now.
pub fn seconds_ago(secs: u64) -> SystemTime {
    SystemTime::now() - Duration::from_secs(secs)
}

/// Sets the modification time of an existing file.
pub fn set_mtime(path: &Path, mtime: SystemTime) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(mtime).unwrap();
}
