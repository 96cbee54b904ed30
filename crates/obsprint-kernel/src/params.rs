//! Print parameters.
//!
//! Parameters are read identically by every worker, and they alone decide
//! the order of collective calls. Nothing a worker discovers in its local
//! store may change that order.
//!
//! ```toml
//! column_width = 12
//! float_precision = 3
//! max_row = 50
//! message = "after background check"
//!
//! [[variables]]
//! name = "ObsValue/brightnessTemperature"
//! channels = "1-3, 7"
//!
//! [[variables]]
//! name = "GeoVaLs/air_temperature"
//! levels = [0, 5]
//! ```

use crate::error::PrintError;
use crate::field::{Variable, parse_channel_set};
use crate::paginate::RowWindow;
use crate::render::{CellFormat, Notation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Where the table is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputChannel {
    /// The regular informational channel.
    #[default]
    Info,
    /// The channel compared against reference output in tests.
    Test,
}

/// One declared variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariablePrintParameters {
    /// `<group>/<name>`.
    pub name: String,

    /// Channel set such as `"1-3, 7"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<String>,

    /// Levels to print for multi-level float fields.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub levels: BTreeSet<i32>,
}

impl VariablePrintParameters {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: None,
            levels: BTreeSet::new(),
        }
    }

    pub fn with_channels(mut self, channels: impl Into<String>) -> Self {
        self.channels = Some(channels.into());
        self
    }

    pub fn with_levels(mut self, levels: impl IntoIterator<Item = i32>) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    /// Parse the name and channel set.
    pub fn resolve(&self) -> Result<FieldSpec, PrintError> {
        let mut variable = Variable::parse(&self.name)?;
        if let Some(channels) = &self.channels {
            let channels = parse_channel_set(channels)?;
            if !channels.is_empty() && !self.levels.is_empty() {
                return Err(PrintError::InvalidParameters(format!(
                    "{}: channels and levels cannot both be given",
                    self.name
                )));
            }
            variable = variable.with_channels(channels);
        }
        Ok(FieldSpec {
            variable,
            levels: self.levels.clone(),
        })
    }
}

/// A declared variable after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub variable: Variable,
    pub levels: BTreeSet<i32>,
}

/// Everything that controls one print run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrintParameters {
    /// Variables to print, in table order.
    pub variables: Vec<VariablePrintParameters>,

    /// Text printed under the banner.
    pub message: Option<String>,

    /// Print the store summary before the tables.
    pub summary: bool,

    /// Only rows held by rank 0 are eligible (single-copy mode).
    pub print_rank0: bool,

    pub column_width: usize,
    pub float_precision: usize,
    pub scientific_notation: bool,

    /// Upper bound on the width of a table line.
    pub max_text_width: usize,

    /// Lowest original row number to print.
    pub min_row: usize,

    /// One past the highest original row number to print; `None` for no bound.
    pub max_row: Option<usize>,

    pub output: OutputChannel,

    /// Ignore `Derived<Group>` copies when fetching.
    pub skip_derived: bool,
}

impl Default for PrintParameters {
    fn default() -> Self {
        Self {
            variables: Vec::new(),
            message: None,
            summary: false,
            print_rank0: true,
            column_width: 20,
            float_precision: 6,
            scientific_notation: false,
            max_text_width: 120,
            min_row: 0,
            max_row: None,
            output: OutputChannel::Info,
            skip_derived: false,
        }
    }
}

impl PrintParameters {
    pub fn from_toml_str(text: &str) -> Result<Self, PrintError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self, PrintError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the row window and resolve every declared variable.
    ///
    /// Runs before any collective call, so an invalid configuration fails on
    /// every worker without output.
    pub fn validate(&self) -> Result<Vec<FieldSpec>, PrintError> {
        self.window()?;
        self.variables
            .iter()
            .map(VariablePrintParameters::resolve)
            .collect()
    }

    pub fn window(&self) -> Result<RowWindow, PrintError> {
        RowWindow::new(self.min_row, self.max_row)
    }

    pub fn cell_format(&self) -> CellFormat {
        CellFormat {
            column_width: self.column_width,
            float_precision: self.float_precision,
            notation: if self.scientific_notation {
                Notation::Scientific
            } else {
                Notation::Fixed
            },
        }
    }
}
