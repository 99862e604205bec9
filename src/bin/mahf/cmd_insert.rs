use anyhow::{Context, Result};
use std::io::{self, BufRead};
use std::path::Path;

use mahf::{RelnConfig, Relation};

use crate::util::parse_tuple_line;

pub fn exec(path: &Path) -> Result<()> {
    let cfg = RelnConfig::from_env();
    let mut r = Relation::open(path, cfg)?;

    let stdin = io::stdin();
    let mut inserted = 0u64;
    for line in stdin.lock().lines() {
        let line = line.context("read stdin line")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let tuple = parse_tuple_line(line)?;
        r.insert(&tuple)?;
        inserted += 1;
    }

    log::info!("inserted {} tuple(s) into {}", inserted, path.display());
    r.close()?;
    Ok(())
}
