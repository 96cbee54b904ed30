//! Cell formatting and page rendering.
//!
//! Every cell, including the header, is right-aligned to a fixed width and
//! followed by `" | "`. Values equal to their type's missing sentinel print
//! as `missing`; boolean columns print as 0/1 and have no sentinel.

use crate::column::{Column, MissingValue};
use crate::field::DisplayKey;
use crate::gather::FilterData;
use crate::paginate::Page;
use std::io::{self, Write};

/// Label of the header row.
pub const LOCATION_LABEL: &str = "Location";

/// Text printed in place of a missing value.
pub const MISSING_LABEL: &str = "missing";

/// Float notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notation {
    #[default]
    Fixed,
    Scientific,
}

/// How cells are formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellFormat {
    pub column_width: usize,
    pub float_precision: usize,
    pub notation: Notation,
}

impl Default for CellFormat {
    fn default() -> Self {
        Self {
            column_width: 20,
            float_precision: 6,
            notation: Notation::Fixed,
        }
    }
}

impl CellFormat {
    pub fn format_float(&self, value: f32) -> String {
        let value = f64::from(value);
        match self.notation {
            Notation::Fixed => format!("{:.*}", self.float_precision, value),
            Notation::Scientific => format_scientific(value, self.float_precision),
        }
    }

    /// Text of the cell at `position`; out-of-range positions print as missing.
    pub fn cell(&self, column: &Column, position: usize) -> String {
        fn text_or_missing<T: MissingValue>(
            value: Option<&T>,
            show: impl FnOnce(&T) -> String,
        ) -> String {
            match value {
                Some(v) if !v.is_missing() => show(v),
                _ => MISSING_LABEL.to_string(),
            }
        }

        match column {
            Column::Integer(values) => text_or_missing(values.get(position), i32::to_string),
            Column::Float(values) => {
                text_or_missing(values.get(position), |v| self.format_float(*v))
            }
            Column::Text(values) => text_or_missing(values.get(position), String::clone),
            Column::Timestamp(values) => text_or_missing(values.get(position), |v| {
                v.format("%Y-%m-%dT%H:%M:%SZ").to_string()
            }),
            Column::Boolean(values) => values
                .get(position)
                .map_or_else(|| MISSING_LABEL.to_string(), i32::to_string),
        }
    }
}

/// Scientific notation with a signed exponent of at least two digits,
/// e.g. `1.500000e+02`.
pub fn format_scientific(value: f64, precision: usize) -> String {
    let raw = format!("{value:.precision$e}");
    match raw.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.abs())
            }
            Err(_) => raw,
        },
        None => raw,
    }
}

/// Width of the key column: the longest key, but never narrower than the
/// header label.
pub fn key_column_width<'a>(keys: impl IntoIterator<Item = &'a DisplayKey>) -> usize {
    keys.into_iter()
        .map(DisplayKey::width)
        .fold(LOCATION_LABEL.len(), usize::max)
}

/// Writes pages of gathered columns as text tables.
#[derive(Debug, Clone, Copy)]
pub struct TableRenderer {
    format: CellFormat,
    key_width: usize,
}

impl TableRenderer {
    pub fn new(format: CellFormat, key_width: usize) -> Self {
        Self { format, key_width }
    }

    /// Size the key column to fit every key in `data`.
    pub fn for_data(format: CellFormat, data: &FilterData) -> Self {
        Self::new(format, key_column_width(data.keys()))
    }

    pub fn key_width(&self) -> usize {
        self.key_width
    }

    /// Render every page, each followed by a blank line.
    pub fn render(&self, out: &mut dyn Write, pages: &[Page], data: &FilterData) -> io::Result<()> {
        for page in pages {
            self.render_page(out, page, data)?;
        }
        Ok(())
    }

    /// Header, separator, one line per cached key, then a blank line.
    pub fn render_page(
        &self,
        out: &mut dyn Write,
        page: &Page,
        data: &FilterData,
    ) -> io::Result<()> {
        let key_width = self.key_width;
        let width = self.format.column_width;

        write!(out, "{LOCATION_LABEL:>key_width$} | ")?;
        for entry in page.entries() {
            write!(out, "{:>width$} | ", entry.row)?;
        }
        writeln!(out)?;

        write!(out, "{}-+-", "-".repeat(key_width))?;
        for _ in page.entries() {
            write!(out, "{}-+-", "-".repeat(width))?;
        }
        writeln!(out)?;

        for (key, column) in data.iter() {
            write!(out, "{key:>key_width$} | ")?;
            for entry in page.entries() {
                let cell = self.format.cell(column, entry.position);
                write!(out, "{cell:>width$} | ")?;
            }
            writeln!(out)?;
        }
        writeln!(out)
    }
}
