//! obsprint CLI: the `obsprint` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Print {
            config,
            data,
            workers,
            distribution,
            exclude,
            mask,
            test_output,
        } => commands::print::run(commands::print::Args {
            config,
            data,
            workers,
            distribution,
            exclude,
            mask,
            test_output,
        }),

        Commands::Summary { data, json } => commands::summary::run(data, json),
    }
}
