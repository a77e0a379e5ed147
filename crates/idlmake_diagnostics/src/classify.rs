//! Classification of free-form compiler output into diagnostics.
//!
//! The compiler prints lines such as:
//!
//! ```text
//! /work/slice/A.ice:3: error: syntax error
//! /work/slice/B.ice:12: warning: `Foo' is deprecated
//!     while parsing interface `Printer'
//! ```
//!
//! A line whose message starts with `warning:` is a warning. Any other line
//! that accompanies a non-zero exit code is an error, located at its own
//! `<path>:<line>:` prefix or, failing that, at the nearest preceding one.
//! Lines with no location anywhere before them are general failures.

use crate::diagnostic::{Diagnostic, Location};

const WARNING_MARKER: &str = "warning:";
const ERROR_MARKER: &str = "error:";

/// Splits a `<path>:<line>: rest` prefix off an output line.
///
/// The path is everything before the first `:<digits>:` sequence, so drive
/// letters such as `C:\` are not mistaken for a location.
pub fn split_location(line: &str) -> Option<(Location, &str)> {
    let bytes = line.as_bytes();
    let mut search_from = 0;
    while let Some(offset) = line[search_from..].find(':') {
        let colon = search_from + offset;
        let digits_start = colon + 1;
        let digits_len = bytes[digits_start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let digits_end = digits_start + digits_len;
        if colon > 0 && digits_len > 0 && bytes.get(digits_end) == Some(&b':') {
            let line_no: u32 = line[digits_start..digits_end].parse().ok()?;
            let file = line[..colon].trim();
            if file.is_empty() {
                return None;
            }
            let rest = line[digits_end + 1..].trim();
            return Some((Location::new(file, line_no), rest));
        }
        search_from = digits_start;
    }
    None
}

/// Classifies the compiler's diagnostic text given the process exit code.
///
/// Blank lines are dropped. With `exit_code == 0` non-warning lines are kept
/// as notes.
pub fn classify_output(text: &str, exit_code: i32) -> Vec<Diagnostic> {
    let failed = exit_code != 0;
    let mut nearest: Option<Location> = None;
    let mut out = Vec::new();

    for raw in text.lines() {
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let (location, rest) = match split_location(line) {
            Some((loc, rest)) => {
                nearest = Some(loc.clone());
                (Some(loc), rest)
            }
            None => (None, line.trim()),
        };

        if let Some(message) = strip_marker(rest, WARNING_MARKER) {
            out.push(Diagnostic::warning(message, location));
            continue;
        }
        if location.is_none() {
            if let Some(idx) = rest.find(WARNING_MARKER) {
                let message = rest[idx + WARNING_MARKER.len()..].trim();
                out.push(Diagnostic::warning(message, None));
                continue;
            }
        }

        let message = strip_marker(rest, ERROR_MARKER).unwrap_or(rest);
        if failed {
            let location = location.or_else(|| nearest.clone());
            out.push(Diagnostic::error(message, location));
        } else {
            out.push(Diagnostic::note(message, location));
        }
    }

    out
}

fn strip_marker<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.strip_prefix(marker).map(str::trim)
}
