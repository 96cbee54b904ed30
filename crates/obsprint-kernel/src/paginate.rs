//! Row selection and page layout.

use crate::error::PrintError;
use crate::reconcile::GlobalPermutation;

/// Width of the `" | "` appended to every table cell.
pub const SEPARATOR_OVERHEAD: usize = 3;

/// Half-open window `[min, max)` of original row numbers to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    min: usize,
    max: Option<usize>,
}

impl RowWindow {
    /// `max = None` leaves the window open above.
    pub fn new(min: usize, max: Option<usize>) -> Result<Self, PrintError> {
        if let Some(max) = max
            && min > max
        {
            return Err(PrintError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Every row.
    pub fn unbounded() -> Self {
        Self { min: 0, max: None }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    /// Pull a lower bound at or past the end back to the last row.
    pub fn clamp_to(self, total_rows: usize) -> Self {
        let min = if self.min >= total_rows {
            total_rows.saturating_sub(1)
        } else {
            self.min
        };
        Self { min, ..self }
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.min && self.max.is_none_or(|max| row < max)
    }
}

/// Number of row columns that fit on one page.
///
/// Never less than one, however narrow the configured width.
pub fn rows_per_page(max_text_width: usize, key_width: usize, column_width: usize) -> usize {
    (max_text_width.saturating_sub(key_width) / (column_width + SEPARATOR_OVERHEAD)).max(1)
}

/// One displayed row: its original row number and its gathered position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEntry {
    pub row: usize,
    pub position: usize,
}

/// A group of rows printed side by side.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    entries: Vec<PageEntry>,
}

impl Page {
    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Original row numbers on this page.
    pub fn rows(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.row).collect()
    }

    /// Gathered positions on this page.
    pub fn positions(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.position).collect()
    }
}

/// Select rows inside `window` whose apply bit is set, in ascending row
/// order, and split them into pages of `per_page` rows.
///
/// `apply` is indexed by gathered position; positions beyond its end are
/// treated as not selected.
pub fn paginate(
    permutation: &GlobalPermutation,
    apply: &[bool],
    window: &RowWindow,
    per_page: usize,
) -> Vec<Page> {
    let per_page = per_page.max(1);
    let selected: Vec<PageEntry> = permutation
        .iter()
        .filter(|&(row, position)| {
            window.contains(row) && apply.get(position).copied().unwrap_or(false)
        })
        .map(|(row, position)| PageEntry { row, position })
        .collect();

    selected
        .chunks(per_page)
        .map(|chunk| Page {
            entries: chunk.to_vec(),
        })
        .collect()
}
