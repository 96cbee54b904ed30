use crate::support;
use obsprint_kernel::{
    Distribution, FilterPrinter, OutputChannel, PrintError, PrintParameters, PrintReport, SelectAll,
    SelectionPredicate, ThreadGroup, Variable,
};
use obsprint_store::{FieldMask, MemoryStore};
use std::fs::File;
use std::io::{self, Write};
use std::thread;
use tracing::info;

pub struct Args {
    pub config: String,
    pub data: String,
    pub workers: usize,
    pub distribution: String,
    pub exclude: Option<String>,
    pub mask: Option<String>,
    pub test_output: Option<String>,
}

pub fn run(args: Args) {
    let params = support::load_params_or_exit(&args.config);
    let dataset = support::load_dataset_or_exit(&args.data);
    let partition = support::parse_partition_or_exit(&args.distribution);
    let excluded = support::parse_excluded_or_exit(args.exclude.as_deref());

    let stores = dataset
        .partition(args.workers, &excluded, partition)
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        });

    let predicate: Box<dyn SelectionPredicate + Sync> = match &args.mask {
        Some(name) => {
            let variable = Variable::parse(name).unwrap_or_else(|e| {
                eprintln!("error: invalid --mask: {e}");
                std::process::exit(1);
            });
            Box::new(FieldMask::new(variable))
        }
        None => Box::new(SelectAll),
    };

    let (table, report) = match print_on_workers(&params, &stores, predicate.as_ref()) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = write_channel(params.output, args.test_output.as_deref(), &table) {
        eprintln!("error: failed to write output: {e}");
        std::process::exit(1);
    }
    info!(
        workers = stores.len(),
        pages = report.pages,
        rows = report.rows,
        columns = report.columns,
        skipped = report.notices.len(),
        "print finished"
    );
}

/// Run the printer on one thread per store. Only rank 0's text is kept; the
/// other ranks render into a sink.
fn print_on_workers(
    params: &PrintParameters,
    stores: &[MemoryStore],
    predicate: &(dyn SelectionPredicate + Sync),
) -> Result<(Vec<u8>, PrintReport), PrintError> {
    let groups = ThreadGroup::new(stores.len());
    let mut results = thread::scope(|scope| {
        let handles: Vec<_> = stores
            .iter()
            .zip(groups)
            .map(|(store, group)| {
                scope.spawn(move || -> Result<(Vec<u8>, PrintReport), PrintError> {
                    let printer = FilterPrinter::new(params, store, &group);
                    if group.rank() == 0 {
                        let mut out = Vec::new();
                        let report = printer.run(predicate, &mut out)?;
                        Ok((out, report))
                    } else {
                        let report = printer.run(predicate, &mut io::sink())?;
                        Ok((Vec::new(), report))
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    eprintln!("error: worker thread panicked");
                    std::process::exit(1);
                })
            })
            .collect::<Vec<_>>()
    });
    // Rank 0's result stands for the group.
    results.swap_remove(0)
}

fn write_channel(
    channel: OutputChannel,
    test_output: Option<&str>,
    table: &[u8],
) -> io::Result<()> {
    match (channel, test_output) {
        (OutputChannel::Info, _) => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(table)?;
            stdout.flush()
        }
        (OutputChannel::Test, Some(path)) => {
            let mut file = File::create(path)?;
            file.write_all(table)?;
            file.sync_all()
        }
        (OutputChannel::Test, None) => {
            let mut stderr = io::stderr().lock();
            stderr.write_all(table)?;
            stderr.flush()
        }
    }
}
