//! Recovery of the original row order.
//!
//! After gathering, the concatenated row index is in rank order: each
//! worker's block lists the original row numbers of its local rows. The
//! index may have gaps (rows excluded upstream) and the blocks interleave
//! arbitrarily. For example, six original rows 0–5 with rows 0 and 5
//! excluded, spread over two workers holding `[2, 4]` and `[1, 3]`, gather to
//! `[2, 4, 1, 3]`. Sorting positions by row number gives the order
//! `[2, 0, 3, 1]`, which reads the rows back as `[1, 2, 3, 4]`.

/// Stable permutation of gathered positions into ascending original-row order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlobalPermutation {
    /// Gathered position of the k-th smallest original row.
    order: Vec<usize>,
    /// Original row numbers in ascending order.
    rows: Vec<usize>,
}

impl GlobalPermutation {
    /// Sort the positions `0..global_index.len()` by their original row number.
    ///
    /// Equal row numbers keep their gathered (rank) order.
    pub fn reconcile(global_index: &[usize]) -> Self {
        let mut order: Vec<usize> = (0..global_index.len()).collect();
        order.sort_by_key(|&position| global_index[position]);
        let rows = order.iter().map(|&position| global_index[position]).collect();
        Self { order, rows }
    }

    /// Number of gathered rows.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Gathered positions in ascending original-row order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Original row numbers, ascending.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Number of different original rows. Replicated rows count once.
    pub fn distinct_rows(&self) -> usize {
        self.rows
            .iter()
            .enumerate()
            .filter(|&(i, row)| i == 0 || self.rows[i - 1] != *row)
            .count()
    }

    /// `(original row, gathered position)` pairs in ascending row order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.order.iter().copied())
    }
}
