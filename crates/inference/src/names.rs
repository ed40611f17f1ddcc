//! Class id to class name mapping owned by a detection model.
//!
//! Ultralytics exports store the mapping as a Python dict literal in the ONNX
//! metadata (`{0: 'resistor', 1: 'led'}`); plain-text label files with one
//! name per line are accepted as an override.

use regex::Regex;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// One `id: 'name'` entry followed by a comma or the end of the mapping.
static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\s*(\d+)\s*:\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")\s*(?:,|$)"#,
    )
    .expect("class name entry pattern is valid")
});

static ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(.)").expect("escape pattern is valid"));

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassNamesError {
    #[error("Malformed class names at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    #[error("Class id {0} appears more than once")]
    DuplicateId(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassNames(BTreeMap<u32, String>);

impl ClassNames {
    /// Build from a label file: line `n` names class `n`. Blank lines are
    /// kept as ids so later lines don't shift.
    pub fn from_lines(contents: &str) -> Self {
        Self(
            contents
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(id, line)| (id as u32, line.trim().to_string()))
                .collect(),
        )
    }

    pub fn get(&self, class_id: u32) -> Option<&str> {
        self.0.get(&class_id).map(String::as_str)
    }

    /// Name for `class_id`, or `Unknown_<id>` when the model has no entry for it.
    pub fn resolve(&self, class_id: u32) -> String {
        match self.get(class_id) {
            Some(name) => name.to_string(),
            None => format!("Unknown_{}", class_id),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for ClassNames {
    fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, name)| (id, name.into())).collect())
    }
}

/// Parses the `{int: 'str', ...}` literal written by the exporter.
impl FromStr for ClassNames {
    type Err = ClassNamesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let leading = s.len() - s.trim_start().len();
        let trimmed = s.trim();

        let inner = trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or(ClassNamesError::Malformed {
                offset: leading,
                reason: "expected a '{...}' mapping",
            })?;
        // Offset of `inner` within `s`
        let base = leading + 1;

        let mut names = BTreeMap::new();
        let mut consumed = 0;

        for caps in ENTRY.captures_iter(inner) {
            let entry = caps.get(0).map_or(consumed..consumed, |m| m.range());
            if entry.start != consumed {
                break;
            }
            consumed = entry.end;

            let id: u32 = caps[1].parse().map_err(|_| ClassNamesError::Malformed {
                offset: base + entry.start,
                reason: "class id out of range",
            })?;
            let raw = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            let name = ESCAPE.replace_all(raw, "$1").into_owned();

            if names.insert(id, name).is_some() {
                return Err(ClassNamesError::DuplicateId(id));
            }
        }

        if !inner[consumed..].trim().is_empty() {
            return Err(ClassNamesError::Malformed {
                offset: base + consumed,
                reason: "expected `id: 'name'` entries separated by ','",
            });
        }

        Ok(Self(names))
    }
}
