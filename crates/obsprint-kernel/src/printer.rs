//! The print procedure run by every worker.
//!
//! Order of work: validate parameters, gather every declared field, gather
//! the apply mask and row index, reconcile, paginate, then write the banner,
//! the skip notices and the table. Validation happens before the first
//! collective call, so an invalid window fails on all workers with no output
//! at all. Nothing is written until the last collective call has returned,
//! so a failing writer on one worker cannot leave the others waiting.

use crate::distribution::Distribution;
use crate::error::PrintError;
use crate::gather::{FieldSelector, SkipNotice};
use crate::paginate::{paginate, rows_per_page};
use crate::params::PrintParameters;
use crate::reconcile::GlobalPermutation;
use crate::render::TableRenderer;
use crate::store::{ObsStore, SelectionPredicate};
use std::io::{self, Write};
use tracing::{debug, trace};

/// Banner printed at the top of every run.
pub const BANNER: [&str; 3] = [
    "############################",
    "### Printing filter data ###",
    "############################",
];

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintReport {
    /// Number of table pages written.
    pub pages: usize,
    /// Number of rows shown across all pages.
    pub rows: usize,
    /// Number of display keys with a gathered column.
    pub columns: usize,
    /// Misses reported in the output.
    pub notices: Vec<SkipNotice>,
}

/// Runs the print procedure for one worker.
pub struct FilterPrinter<'a, D> {
    params: &'a PrintParameters,
    store: &'a dyn ObsStore,
    dist: &'a D,
}

impl<'a, D: Distribution> FilterPrinter<'a, D> {
    pub fn new(params: &'a PrintParameters, store: &'a dyn ObsStore, dist: &'a D) -> Self {
        Self {
            params,
            store,
            dist,
        }
    }

    /// Gather, reorder and write the table to `out`.
    ///
    /// Every worker must call this with the same parameters.
    pub fn run(
        &self,
        predicate: &dyn SelectionPredicate,
        out: &mut dyn Write,
    ) -> Result<PrintReport, PrintError> {
        trace!(rank = self.dist.rank(), "filter print started");
        debug!(params = ?self.params, "print parameters");

        let fields = self.params.validate()?;
        let window = self.params.window()?;

        let outcome = FieldSelector::new(self.store, self.dist, self.params.skip_derived)
            .select_all(&fields)?;

        let mut apply = predicate.evaluate(self.store, self.params.skip_derived);
        if self.params.print_rank0 && self.dist.rank() != 0 {
            apply.fill(false);
        }
        let global_apply = self.dist.all_gather(apply)?;
        let global_index = self.dist.all_gather(self.store.row_index())?;
        let permutation = GlobalPermutation::reconcile(&global_index);

        let window = window.clamp_to(permutation.distinct_rows());
        let renderer = TableRenderer::for_data(self.params.cell_format(), &outcome.data);
        let per_page = rows_per_page(
            self.params.max_text_width,
            renderer.key_width(),
            self.params.column_width,
        );
        let pages = paginate(&permutation, &global_apply, &window, per_page);
        debug!(
            total_rows = permutation.len(),
            pages = pages.len(),
            per_page,
            "paginated rows"
        );

        self.write_preamble(out)?;
        for notice in &outcome.notices {
            writeln!(out, "{notice}")?;
        }
        renderer.render(out, &pages, &outcome.data)?;
        out.flush()?;

        trace!(rank = self.dist.rank(), "filter print finished");
        Ok(PrintReport {
            pages: pages.len(),
            rows: pages.iter().map(|page| page.len()).sum(),
            columns: outcome.data.len(),
            notices: outcome.notices,
        })
    }

    fn write_preamble(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out)?;
        for line in BANNER {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
        writeln!(out)?;

        if let Some(message) = &self.params.message {
            writeln!(out, "{message}")?;
            writeln!(out)?;
        }
        if self.params.summary {
            write!(out, "{}", self.store.summary())?;
        }
        Ok(())
    }
}
