use anyhow::Result;
use std::path::Path;

use mahf::{RelnConfig, Relation};

use crate::util::parse_choice_vector;

pub fn exec(path: &Path, nattrs: u32, npages0: u32, depth0: u32, chvec_text: &str) -> Result<()> {
    let chvec = parse_choice_vector(chvec_text, nattrs)?;
    let cfg = RelnConfig::from_env();
    let r = Relation::create(path, nattrs, npages0, depth0, chvec, cfg)?;
    log::info!(
        "created relation at {} (nattrs={}, npages0={}, depth0={})",
        path.display(),
        nattrs,
        npages0,
        depth0
    );
    r.close()?;
    Ok(())
}
