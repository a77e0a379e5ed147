//! Project resolution: anchoring configured paths at the project root.

use crate::types::ProjectConfig;
use idlmake_common::CompilerArgs;
use std::path::{Path, PathBuf};

/// Default state directory name, relative to the output directory.
pub const DEFAULT_STATE_DIR: &str = ".idlmake";

/// A fully resolved project with every configured path made absolute.
#[derive(Debug, Clone)]
pub struct ResolvedProject {
    /// The project name.
    pub name: String,
    /// The directory containing `idlmake.toml`.
    pub root: PathBuf,
    /// Source files or directories to scan.
    pub sources: Vec<PathBuf>,
    /// Extensions identifying IDL sources inside source directories.
    pub extensions: Vec<String>,
    /// Directory receiving generated code.
    pub output_dir: PathBuf,
    /// Directory holding the persisted build state.
    pub state_dir: PathBuf,
    /// The compiler as configured: a bare name or an absolute path.
    pub compiler: PathBuf,
    /// Optional compiler installation root.
    pub compiler_home: Option<PathBuf>,
    /// Absolute include directories.
    pub include_dirs: Vec<PathBuf>,
    /// Extra flags passed verbatim.
    pub extra_args: Vec<String>,
    /// Flag introducing the output directory.
    pub output_dir_flag: String,
    /// Flag selecting dependency-listing mode.
    pub depend_flag: String,
    /// Flag selecting generate-and-list mode.
    pub generate_flag: String,
    /// Extensions of generated-looking files for GC.
    pub generated_extensions: Vec<String>,
    /// Whether GC prunes empty directories.
    pub prune_empty_dirs: bool,
}

impl ResolvedProject {
    /// Builds the argument vector that identifies this invocation configuration.
    ///
    /// Layout: `[executable, -I<dir>..., <output_dir_flag>, <output_dir>, extra...]`.
    /// The mode flag and the source list are appended per invocation and are
    /// not part of the identity.
    pub fn compiler_args(&self, executable: &Path) -> CompilerArgs {
        let mut args = vec![executable.display().to_string()];
        for dir in &self.include_dirs {
            args.push(format!("-I{}", dir.display()));
        }
        args.push(self.output_dir_flag.clone());
        args.push(self.output_dir.display().to_string());
        args.extend(self.extra_args.iter().cloned());
        CompilerArgs::new(args)
    }
}

/// Resolves a parsed configuration against the project root directory.
///
/// Relative paths are joined onto `root`; the state directory is joined onto
/// the output directory. A compiler given as a bare name (no separator) is kept
/// as-is so that it can be searched for later.
pub fn resolve_project(config: &ProjectConfig, root: &Path) -> ResolvedProject {
    let output_dir = anchor(root, &config.project.output_dir);
    let state_dir = anchor(
        &output_dir,
        config
            .project
            .state_dir
            .as_deref()
            .unwrap_or(DEFAULT_STATE_DIR),
    );

    let compiler_spec = PathBuf::from(&config.compiler.path);
    let compiler = if compiler_spec.components().count() > 1 {
        anchor(root, &config.compiler.path)
    } else {
        compiler_spec
    };

    ResolvedProject {
        name: config.project.name.clone(),
        root: root.to_path_buf(),
        sources: config
            .project
            .sources
            .iter()
            .map(|s| anchor(root, s))
            .collect(),
        extensions: config.project.extensions.clone(),
        output_dir,
        state_dir,
        compiler,
        compiler_home: config.compiler.home.as_deref().map(|h| anchor(root, h)),
        include_dirs: config
            .compiler
            .include_dirs
            .iter()
            .map(|d| anchor(root, d))
            .collect(),
        extra_args: config.compiler.extra_args.clone(),
        output_dir_flag: config.compiler.output_dir_flag.clone(),
        depend_flag: config.compiler.depend_flag.clone(),
        generate_flag: config.compiler.generate_flag.clone(),
        generated_extensions: config.gc.generated_extensions.clone(),
        prune_empty_dirs: config.gc.prune_empty_dirs,
    }
}

fn anchor(base: &Path, value: &str) -> PathBuf {
    let p = Path::new(value);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
