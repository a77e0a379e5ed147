//! XML records for the dependency graph and the generated-file map.
//!
//! Both records share the schema the compiler prints on stdout, so the same
//! parsers read persisted state and live compiler output:
//!
//! ```xml
//! <dependencies>
//!   <source name="/work/slice/B.ice">
//!     <dependsOn name="/work/slice/A.ice"/>
//!   </source>
//! </dependencies>
//!
//! <generated>
//!   <source name="/work/slice/B.ice">
//!     <file name="/work/generated/B.java"/>
//!   </source>
//! </generated>
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::state::{ArtifactMap, DependencyMap};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const DEPENDENCIES_ROOT: &str = "dependencies";
const GENERATED_ROOT: &str = "generated";

#[derive(Debug, Default, Serialize, Deserialize)]
struct XmlSourceList {
    #[serde(rename = "source", default)]
    sources: Vec<XmlSource>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlSource {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "dependsOn", default, skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<XmlName>,
    #[serde(rename = "file", default, skip_serializing_if = "Vec::is_empty")]
    files: Vec<XmlName>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlName {
    #[serde(rename = "@name")]
    name: String,
}

/// Parses a `<dependencies>` document into a dependency map.
///
/// Empty input yields an empty map. A source listed twice has its edges merged.
pub fn parse_dependencies(xml: &str) -> Result<DependencyMap, StateError> {
    let list = parse_list(xml, DEPENDENCIES_ROOT)?;
    Ok(collect(list, |s| s.depends_on))
}

/// Parses a `<generated>` document into an artifact map.
///
/// Empty input yields an empty map. A source listed twice has its files merged.
pub fn parse_generated(xml: &str) -> Result<ArtifactMap, StateError> {
    let list = parse_list(xml, GENERATED_ROOT)?;
    Ok(collect(list, |s| s.files))
}

/// Renders a dependency map as a `<dependencies>` document.
pub fn write_dependencies(map: &DependencyMap) -> Result<String, StateError> {
    let list = XmlSourceList {
        sources: map
            .iter()
            .map(|(source, deps)| XmlSource {
                name: path_text(source),
                depends_on: deps.iter().map(|d| xml_name(d)).collect(),
                files: Vec::new(),
            })
            .collect(),
    };
    render(&list, DEPENDENCIES_ROOT)
}

/// Renders an artifact map as a `<generated>` document.
pub fn write_generated(map: &ArtifactMap) -> Result<String, StateError> {
    let list = XmlSourceList {
        sources: map
            .iter()
            .map(|(source, files)| XmlSource {
                name: path_text(source),
                depends_on: Vec::new(),
                files: files.iter().map(|f| xml_name(f)).collect(),
            })
            .collect(),
    };
    render(&list, GENERATED_ROOT)
}

fn parse_list(xml: &str, record: &'static str) -> Result<XmlSourceList, StateError> {
    if xml.trim().is_empty() {
        return Ok(XmlSourceList::default());
    }
    if let Some(root) = root_name(xml) {
        if root != record {
            return Err(StateError::Parse {
                record,
                reason: format!("expected <{record}> root element, found <{root}>"),
            });
        }
    }
    quick_xml::de::from_str(xml).map_err(|e| StateError::Parse {
        record,
        reason: e.to_string(),
    })
}

/// Returns the name of the document element, if one can be read.
fn root_name(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) | Event::Empty(e) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

fn collect(
    list: XmlSourceList,
    children: impl Fn(XmlSource) -> Vec<XmlName>,
) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut map: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for source in list.sources {
        let key = PathBuf::from(&source.name);
        let entry = map.entry(key).or_default();
        for child in children(source) {
            let path = PathBuf::from(child.name);
            if !entry.contains(&path) {
                entry.push(path);
            }
        }
    }
    map
}

fn render(list: &XmlSourceList, root: &str) -> Result<String, StateError> {
    let mut body = String::new();
    let mut ser = quick_xml::se::Serializer::with_root(&mut body, Some(root)).map_err(|e| {
        StateError::Serialization {
            reason: e.to_string(),
        }
    })?;
    ser.indent(' ', 2);
    list.serialize(ser).map_err(|e| StateError::Serialization {
        reason: e.to_string(),
    })?;
    let mut out = String::with_capacity(XML_DECLARATION.len() + body.len() + 1);
    out.push_str(XML_DECLARATION);
    out.push_str(&body);
    out.push('\n');
    Ok(out)
}

fn xml_name(path: &Path) -> XmlName {
    XmlName {
        name: path_text(path),
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
