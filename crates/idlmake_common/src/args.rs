//! The ordered argument vector identifying a compiler invocation configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered compiler arguments: executable, include paths, output directory, flags.
///
/// Two builds are only comparable when their argument vectors are identical.
/// Any difference (including ordering) means generated code may differ even
/// when no source file changed, so the persisted build state is discarded.
#[derive(Clone, Default, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerArgs(Vec<String>);

impl CompilerArgs {
    /// Creates an argument vector from any sequence of string-like values.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(args.into_iter().map(Into::into).collect())
    }

    /// Parses the line-oriented persisted form: one argument per line.
    ///
    /// Every argument is newline-terminated, so only empty text means no
    /// arguments. A lone `"\n"` is one empty argument.
    pub fn from_lines(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        let text = text.strip_suffix('\n').unwrap_or(text);
        Self(text.split('\n').map(|l| l.trim_end_matches('\r').to_string()).collect())
    }

    /// Renders the line-oriented persisted form.
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for arg in &self.0 {
            out.push_str(arg);
            out.push('\n');
        }
        out
    }

    /// Returns the arguments as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns an iterator over the arguments.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CompilerArgs {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a CompilerArgs {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for CompilerArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_roundtrip() {
        let args = CompilerArgs::new(["slice2java", "-I/usr/share/slice", "--output-dir", "gen"]);
        let text = args.to_lines();
        assert_eq!(text, "slice2java\n-I/usr/share/slice\n--output-dir\ngen\n");
        assert_eq!(CompilerArgs::from_lines(&text), args);
    }

    #[test]
    fn empty_text_is_empty_args() {
        assert!(CompilerArgs::from_lines("").is_empty());
        assert_eq!(CompilerArgs::from_lines("a\n\nb\n").len(), 3);
        assert_eq!(CompilerArgs::from_lines("a"), CompilerArgs::new(["a"]));
    }

    #[test]
    fn empty_arguments_roundtrip() {
        for args in [
            CompilerArgs::new([""]),
            CompilerArgs::new(["a", ""]),
            CompilerArgs::new(["", "", "b"]),
            CompilerArgs::default(),
        ] {
            assert_eq!(CompilerArgs::from_lines(&args.to_lines()), args);
        }
        assert_eq!(CompilerArgs::from_lines("\n"), CompilerArgs::new([""]));
    }

    #[test]
    fn crlf_lines_are_tolerated() {
        let args = CompilerArgs::from_lines("a\r\nb\r\n");
        assert_eq!(args, CompilerArgs::new(["a", "b"]));
    }

    #[test]
    fn ordering_matters() {
        let a = CompilerArgs::new(["-Ia", "-Ib"]);
        let b = CompilerArgs::new(["-Ib", "-Ia"]);
        assert_ne!(a, b);
    }

    #[test]
    fn display_joins_with_spaces() {
        let args: CompilerArgs = ["slice2cs", "--tie"].into_iter().collect();
        assert_eq!(args.to_string(), "slice2cs --tie");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn serde_is_transparent() {
        let args = CompilerArgs::new(["x", "y"]);
        let json = serde_json::to_string(&args).unwrap();
        assert_eq!(json, r#"["x","y"]"#);
    }
}
