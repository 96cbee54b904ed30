use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "obsprint",
    about = "obsprint: gather partitioned observation data and print it in original row order",
    version
)]
pub struct Cli {
    /// Log filter (e.g. `debug`, `obsprint_kernel=trace`); overrides RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split a dataset across worker threads and print the selected fields
    Print {
        /// Path to the print parameters (TOML)
        #[arg(long)]
        config: String,

        /// Path to the dataset (JSONL, one line per field)
        #[arg(long)]
        data: String,

        /// Number of worker threads
        #[arg(long, default_value_t = 1)]
        workers: usize,

        /// How rows are dealt to workers: round_robin, contiguous, or replicated
        #[arg(long, default_value = "round_robin")]
        distribution: String,

        /// Original row numbers to leave out, e.g. `0,5-7`
        #[arg(long)]
        exclude: Option<String>,

        /// Boolean field selecting the rows to print, as `Group/name`
        #[arg(long)]
        mask: Option<String>,

        /// File receiving the table when `output = "test"`; stderr otherwise
        #[arg(long)]
        test_output: Option<String>,
    },

    /// Describe a dataset without printing it
    Summary {
        /// Path to the dataset (JSONL)
        #[arg(long)]
        data: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
