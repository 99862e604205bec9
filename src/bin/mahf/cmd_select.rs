use anyhow::Result;
use std::path::Path;

use mahf::{Pattern, RelnConfig, Relation, ScanCursor};

use crate::util::{parse_pattern_line, render_tuple};

pub fn exec(path: &Path, pattern_text: &str) -> Result<()> {
    let cfg = RelnConfig::from_env();
    let mut r = Relation::open_ro(path, cfg)?;
    let nattrs = r.info().nattrs;

    let slots = parse_pattern_line(pattern_text, nattrs)?;
    let pattern = Pattern::new(slots, nattrs)?;

    let cursor = ScanCursor::new(&mut r, pattern);
    let mut count = 0u64;
    for t in cursor {
        let t = t?;
        println!("{}", render_tuple(&t));
        count += 1;
    }
    log::info!("{} tuple(s) matched", count);
    Ok(())
}
