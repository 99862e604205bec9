use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mahf", about = "Multi-attribute linear-hashed relation tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new relation.
    Create {
        /// Directory the relation's files will live in.
        #[arg(long)]
        path: PathBuf,
        /// Number of attributes per tuple.
        #[arg(long)]
        nattrs: u32,
        /// Initial number of primary pages. Must equal 2^depth0.
        #[arg(long, default_value_t = 1)]
        npages0: u32,
        /// Initial address depth (sp always starts at 0).
        #[arg(long, default_value_t = 0)]
        depth0: u32,
        /// Choice vector as "att:bit,att:bit,...".
        #[arg(long)]
        chvec: String,
    },
    /// Insert tuples read from stdin, one comma-separated tuple per line.
    Insert {
        #[arg(long)]
        path: PathBuf,
    },
    /// Run a partial-match query: comma-separated pattern, `?` = unknown.
    Select {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        pattern: String,
    },
    /// Print relation metadata and per-bucket occupancy.
    Stats {
        #[arg(long)]
        path: PathBuf,
    },
}
