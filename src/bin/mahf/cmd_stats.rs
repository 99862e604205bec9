use anyhow::Result;
use std::path::Path;

use mahf::{RelnConfig, Relation};

pub fn exec(path: &Path) -> Result<()> {
    let cfg = RelnConfig::from_env();
    let mut r = Relation::open_ro(path, cfg)?;
    let info = r.info().clone();

    println!("nattrs:  {}", info.nattrs);
    println!("depth:   {}", info.depth);
    println!("sp:      {}", info.sp);
    println!("npages:  {}", info.npages);
    println!("ntuples: {}", info.ntuples);
    println!();
    println!("{:>8}  {:>10}  {:>10}", "bucket", "tuples", "ovf_pages");
    for pid in 0..info.npages {
        let page = r.get_page(pid)?;
        let mut ovf_pages = 0u32;
        let mut ntuples = page.ntuples();
        let mut next = page.ovflow();
        while next != mahf::page::NO_PAGE {
            let ovf = r.get_ovf_page(next)?;
            ntuples += ovf.ntuples();
            ovf_pages += 1;
            next = ovf.ovflow();
        }
        println!("{pid:>8}  {ntuples:>10}  {ovf_pages:>10}");
    }

    let m = mahf::metrics::snapshot();
    println!();
    println!("splits performed:          {}", m.splits_performed);
    println!("overflow pages allocated:  {}", m.overflow_pages_allocated);
    println!("tuples inserted (session): {}", m.tuples_inserted);

    Ok(())
}
