//! Configuration types deserialized from `idlmake.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// The top-level project configuration parsed from `idlmake.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Project metadata, source locations and the output directory.
    pub project: ProjectMeta,
    /// How to locate and invoke the external IDL compiler.
    pub compiler: CompilerConfig,
    /// Stale-file garbage collection settings.
    #[serde(default)]
    pub gc: GcConfig,
}

/// Core project settings.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name, used in progress output and as the tracker scope.
    pub name: String,
    /// Source files or directories, relative to the project root.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(default = "default_sources", deserialize_with = "deserialize_string_or_vec")]
    pub sources: Vec<String>,
    /// File extensions (without the dot) that identify IDL sources in directories.
    #[serde(default = "default_extensions", deserialize_with = "deserialize_string_or_vec")]
    pub extensions: Vec<String>,
    /// Directory receiving generated code, relative to the project root.
    pub output_dir: String,
    /// Directory holding the persisted build state, relative to `output_dir`.
    #[serde(default)]
    pub state_dir: Option<String>,
}

/// External compiler settings.
#[derive(Debug, Deserialize)]
pub struct CompilerConfig {
    /// Compiler executable: a bare name (searched for) or a path.
    pub path: String,
    /// Installation root; a bare `path` is looked up in `<home>/bin` first.
    #[serde(default)]
    pub home: Option<String>,
    /// Include directories passed as `-I<dir>`, relative to the project root.
    #[serde(default)]
    pub include_dirs: Vec<String>,
    /// Extra flags passed verbatim before the mode flag.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Flag that introduces the output directory.
    #[serde(default = "default_output_dir_flag")]
    pub output_dir_flag: String,
    /// Flag selecting dependency-listing mode.
    #[serde(default = "default_depend_flag")]
    pub depend_flag: String,
    /// Flag selecting generate-and-list mode.
    #[serde(default = "default_generate_flag")]
    pub generate_flag: String,
}

/// Stale-file garbage collection settings.
#[derive(Debug, Deserialize)]
pub struct GcConfig {
    /// Extensions of files in the output directory that look generated.
    ///
    /// Untracked files with these extensions are deleted by GC. When empty,
    /// only files tracked by a previous build are ever collected.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub generated_extensions: Vec<String>,
    /// Remove directories left empty under the output directory after GC.
    #[serde(default = "default_true")]
    pub prune_empty_dirs: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            generated_extensions: Vec::new(),
            prune_empty_dirs: true,
        }
    }
}

fn default_sources() -> Vec<String> {
    vec![".".to_string()]
}

fn default_extensions() -> Vec<String> {
    vec!["ice".to_string()]
}

fn default_output_dir_flag() -> String {
    "--output-dir".to_string()
}

fn default_depend_flag() -> String {
    "--depend-xml".to_string()
}

fn default_generate_flag() -> String {
    "--list-generated".to_string()
}

fn default_true() -> bool {
    true
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows TOML config to accept both `sources = "slice"` (string) and
/// `sources = ["slice", "extra"]` (array of strings).
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
