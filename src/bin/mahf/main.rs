mod cli;
mod cmd_create;
mod cmd_insert;
mod cmd_select;
mod cmd_stats;
mod util;

use clap::Parser;
use env_logger::{Builder, Env};

use cli::{Cli, Command};

fn main() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run() {
        log::error!("{e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Create {
            path,
            nattrs,
            npages0,
            depth0,
            chvec,
        } => cmd_create::exec(&path, nattrs, npages0, depth0, &chvec),
        Command::Insert { path } => cmd_insert::exec(&path),
        Command::Select { path, pattern } => cmd_select::exec(&path, &pattern),
        Command::Stats { path } => cmd_stats::exec(&path),
    }
}
