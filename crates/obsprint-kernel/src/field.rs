//! Fields, channel sets, and display keys.
//!
//! A [`Variable`] names one quantity as `<group>/<name>`. It may be split
//! into channels (`<name>_<channel>`), or, for the float fields of the
//! multi-level groups, refined by vertical level. Each renderable
//! combination is identified by a [`DisplayKey`].

use crate::error::PrintError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Groups whose float fields are fetched level by level.
pub const MULTI_LEVEL_GROUPS: [&str; 3] = ["GeoVaLs", "ObsDiag", "ObsBiasTerm"];

/// Declared element type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Integer,
    Float,
    Text,
    Timestamp,
    Boolean,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "text" | "string" => Ok(Self::Text),
            "timestamp" | "datetime" => Ok(Self::Timestamp),
            "boolean" | "bool" => Ok(Self::Boolean),
            other => Err(PrintError::UnsupportedElementType(other.to_string())),
        }
    }
}

/// A named quantity `<group>/<name>`, optionally split into channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    group: String,
    name: String,
    channels: Vec<i32>,
}

impl Variable {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            channels: Vec::new(),
        }
    }

    /// Parse `<group>/<name>`. A name without a group is accepted as-is.
    pub fn parse(full_name: &str) -> Result<Self, PrintError> {
        let full_name = full_name.trim();
        let (group, name) = full_name.split_once('/').unwrap_or(("", full_name));
        if name.is_empty() {
            return Err(PrintError::InvalidParameters(format!(
                "variable name is empty in {full_name:?}"
            )));
        }
        Ok(Self::new(group, name))
    }

    /// Attach a channel list. Channels keep their given order.
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = i32>) -> Self {
        self.channels = channels.into_iter().collect();
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channels(&self) -> &[i32] {
        &self.channels
    }

    /// `<group>/<name>`, or just `<name>` when there is no group.
    pub fn full_name(&self) -> String {
        if self.group.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.group, self.name)
        }
    }

    /// Number of sub-variables: the channel count, or 1 without channels.
    pub fn size(&self) -> usize {
        self.channels.len().max(1)
    }

    /// Name of the sub-variable at `index`: `<name>_<channel>`, or the plain
    /// name when the variable has no channels.
    pub fn variable(&self, index: usize) -> String {
        match self.channels.get(index) {
            Some(channel) => format!("{}_{channel}", self.name),
            None => self.name.clone(),
        }
    }

    /// Whether this variable's group stores fields per vertical level.
    pub fn is_multi_level(&self) -> bool {
        MULTI_LEVEL_GROUPS.contains(&self.group.as_str())
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// String identity of one renderable row of the output table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplayKey(String);

impl DisplayKey {
    /// `<group>/<name>_<channel>` for the sub-variable at `index`.
    pub fn for_channel(variable: &Variable, index: usize) -> Self {
        if variable.group().is_empty() {
            Self(variable.variable(index))
        } else {
            Self(format!("{}/{}", variable.group(), variable.variable(index)))
        }
    }

    /// `<full name> (level <n>)`.
    pub fn at_level(full_name: &str, level: i32) -> Self {
        Self(format!("{full_name} (level {level})"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display width in characters.
    pub fn width(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for DisplayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl AsRef<str> for DisplayKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Largest number of entries a channel set may expand to.
pub const MAX_CHANNEL_SET: usize = 1_000_000;

/// Parse a channel set such as `"1-3, 7"` into a sorted, de-duplicated set.
///
/// Items are separated by commas; `a-b` is an inclusive range. An empty or
/// blank string yields an empty set. Sets that would hold more than
/// [`MAX_CHANNEL_SET`] entries are rejected before they are expanded.
pub fn parse_channel_set(spec: &str) -> Result<BTreeSet<i32>, PrintError> {
    let mut channels = BTreeSet::new();
    for item in spec.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        match item.split_once('-') {
            Some((lo, hi)) => {
                let lo = parse_channel(lo, spec)?;
                let hi = parse_channel(hi, spec)?;
                if lo > hi {
                    return Err(PrintError::InvalidParameters(format!(
                        "descending channel range {item:?} in {spec:?}"
                    )));
                }
                let span =
                    usize::try_from(i64::from(hi) - i64::from(lo) + 1).unwrap_or(usize::MAX);
                if span > MAX_CHANNEL_SET.saturating_sub(channels.len()) {
                    return Err(PrintError::InvalidParameters(format!(
                        "channel range {item:?} in {spec:?} exceeds {MAX_CHANNEL_SET} entries"
                    )));
                }
                channels.extend(lo..=hi);
            }
            None => {
                channels.insert(parse_channel(item, spec)?);
            }
        }
    }
    Ok(channels)
}

fn parse_channel(token: &str, spec: &str) -> Result<i32, PrintError> {
    token.trim().parse::<i32>().map_err(|e| {
        PrintError::InvalidParameters(format!("bad channel {token:?} in {spec:?}: {e}"))
    })
}
