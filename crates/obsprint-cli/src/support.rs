use obsprint_kernel::{PrintParameters, parse_channel_set};
use obsprint_store::{Dataset, Partition};
use std::collections::BTreeSet;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Log to stderr. `--log-level` wins over `RUST_LOG`; `warn` otherwise.
pub fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|e| {
            eprintln!("error: invalid --log-level {level:?}: {e}");
            std::process::exit(1);
        }),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_params_or_exit(path: &str) -> PrintParameters {
    PrintParameters::load_toml(path).unwrap_or_else(|e| {
        eprintln!("error: failed to load {path}: {e}");
        std::process::exit(1);
    })
}

pub fn load_dataset_or_exit(path: &str) -> Dataset {
    Dataset::read_from_path(path).unwrap_or_else(|e| {
        eprintln!("error: failed to load {path}: {e}");
        std::process::exit(1);
    })
}

pub fn parse_partition_or_exit(name: &str) -> Partition {
    name.parse().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

/// Row numbers from a list such as `0,5-7`.
pub fn parse_excluded_or_exit(list: Option<&str>) -> BTreeSet<usize> {
    let Some(list) = list else {
        return BTreeSet::new();
    };
    let rows = parse_channel_set(list).unwrap_or_else(|e| {
        eprintln!("error: invalid --exclude: {e}");
        std::process::exit(1);
    });
    rows.into_iter()
        .map(|row| {
            usize::try_from(row).unwrap_or_else(|_| {
                eprintln!("error: invalid --exclude: negative row {row}");
                std::process::exit(1);
            })
        })
        .collect()
}
