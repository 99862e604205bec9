//! Relation core: three sibling files (`rel.info`, `rel.data`, `rel.ovflow`)
//! under a directory, with direct bucket addressing — bucket id `b` is
//! exactly primary page id `b` in `rel.data`. No separate directory file
//! of bucket -> page-id indirection is needed, since linear hashing here
//! never relocates a primary page once allocated.

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::RelnConfig;
use crate::hash::ChoiceVector;
use crate::meta::{read_info, write_info_new, write_info_overwrite, RelnInfo};
use crate::page::{Page, PAGE_SIZE};

const INFO_FILE: &str = "rel.info";
const DATA_FILE: &str = "rel.data";
const OVFLOW_FILE: &str = "rel.ovflow";

/// An open relation: metadata plus handles to its two page files.
pub struct Relation {
    pub(crate) info: RelnInfo,
    info_path: PathBuf,
    pub(crate) data: File,
    pub(crate) ovflow: File,
    pub(crate) cfg: RelnConfig,
    pub(crate) readonly: bool,
    dirty: bool,
}

impl Relation {
    fn paths(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
        (dir.join(INFO_FILE), dir.join(DATA_FILE), dir.join(OVFLOW_FILE))
    }

    /// Create a brand-new relation: writes `.info`, pre-populates `.data`
    /// with `npages0` empty primary pages, and an empty `.ovflow`.
    ///
    /// `npages0` must equal `2^depth0` (sp always starts at 0) to satisfy
    /// the `npages = 2^depth + sp` invariant from the moment the relation
    /// exists — see spec.md §3/§8 and its `npages0=4, depth0=2` scenario.
    pub fn create(
        dir: &Path,
        nattrs: u32,
        npages0: u32,
        depth0: u32,
        chvec: ChoiceVector,
        cfg: RelnConfig,
    ) -> Result<Self> {
        if nattrs == 0 {
            return Err(anyhow!("nattrs must be >= 1"));
        }
        if npages0 == 0 {
            return Err(anyhow!("npages0 must be >= 1"));
        }
        let expected = 1u32
            .checked_shl(depth0)
            .ok_or_else(|| anyhow!("depth0 {} is too large", depth0))?;
        if npages0 != expected {
            return Err(anyhow!(
                "npages0 ({npages0}) must equal 2^depth0 (2^{depth0} = {expected})"
            ));
        }
        fs::create_dir_all(dir).with_context(|| format!("create_dir_all {}", dir.display()))?;

        let (info_path, data_path, ovflow_path) = Self::paths(dir);
        if info_path.exists() {
            return Err(anyhow!("relation already exists at {}", dir.display()));
        }

        let info = RelnInfo::new(nattrs, npages0, depth0, chvec);
        write_info_new(&info_path, &info)?;

        let mut data = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&data_path)
            .with_context(|| format!("create {}", data_path.display()))?;
        for _ in 0..npages0 {
            data.write_all(Page::new_page().as_bytes())?;
        }
        data.sync_all()?;

        let ovflow = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&ovflow_path)
            .with_context(|| format!("create {}", ovflow_path.display()))?;
        ovflow.sync_all()?;

        info!(
            "created relation at {} (nattrs={}, npages0={}, depth0={})",
            dir.display(),
            nattrs,
            npages0,
            depth0
        );

        Ok(Self {
            info,
            info_path,
            data,
            ovflow,
            cfg,
            readonly: false,
            dirty: false,
        })
    }

    /// Open an existing relation for writing.
    pub fn open(dir: &Path, cfg: RelnConfig) -> Result<Self> {
        Self::open_impl(dir, cfg, false)
    }

    /// Open an existing relation read-only. Mutating methods on the
    /// returned handle return an error rather than touching disk.
    pub fn open_ro(dir: &Path, cfg: RelnConfig) -> Result<Self> {
        Self::open_impl(dir, cfg, true)
    }

    fn open_impl(dir: &Path, cfg: RelnConfig, readonly: bool) -> Result<Self> {
        let (info_path, data_path, ovflow_path) = Self::paths(dir);
        let info = read_info(&info_path)?;

        let data = OpenOptions::new()
            .read(true)
            .write(!readonly)
            .open(&data_path)
            .with_context(|| format!("open {}", data_path.display()))?;
        let ovflow = OpenOptions::new()
            .read(true)
            .write(!readonly)
            .open(&ovflow_path)
            .with_context(|| format!("open {}", ovflow_path.display()))?;

        debug!(
            "opened relation at {} (readonly={}, depth={}, sp={}, npages={}, ntuples={})",
            dir.display(),
            readonly,
            info.depth,
            info.sp,
            info.npages,
            info.ntuples
        );

        Ok(Self {
            info,
            info_path,
            data,
            ovflow,
            cfg,
            readonly,
            dirty: false,
        })
    }

    pub fn info(&self) -> &RelnInfo {
        &self.info
    }

    /// Persist the in-memory header back to `.info`, if it has changed
    /// since the last flush.
    pub fn flush(&mut self) -> Result<()> {
        if self.readonly || !self.dirty {
            return Ok(());
        }
        write_info_overwrite(&self.info_path, &self.info)?;
        self.dirty = false;
        Ok(())
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Close the relation, flushing metadata first.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    // ---------------- page I/O ----------------

    /// Load a primary page by bucket id (== page id) from `.data`.
    pub fn get_page(&mut self, pid: u32) -> Result<Page> {
        read_page_at(&mut self.data, pid)
    }

    /// Write a primary page back to `.data` at the given bucket id.
    pub fn put_page(&mut self, pid: u32, page: &Page) -> Result<()> {
        if self.readonly {
            return Err(anyhow!("relation is read-only"));
        }
        write_page_at(&mut self.data, pid, page, self.cfg.data_fsync)
    }

    /// Append a brand-new empty primary page at the end of `.data`,
    /// returning its page id. Used only by the split procedure.
    pub(crate) fn add_primary_page(&mut self) -> Result<u32> {
        if self.readonly {
            return Err(anyhow!("relation is read-only"));
        }
        let len = self.data.metadata()?.len();
        let pid = (len / PAGE_SIZE as u64) as u32;
        self.data.seek(SeekFrom::End(0))?;
        self.data.write_all(Page::new_page().as_bytes())?;
        if self.cfg.data_fsync {
            self.data.sync_all()?;
        }
        Ok(pid)
    }

    /// Load an overflow page by its id from `.ovflow`.
    pub fn get_ovf_page(&mut self, pid: u32) -> Result<Page> {
        read_page_at(&mut self.ovflow, pid)
    }

    /// Write an overflow page back to `.ovflow`.
    pub fn put_ovf_page(&mut self, pid: u32, page: &Page) -> Result<()> {
        if self.readonly {
            return Err(anyhow!("relation is read-only"));
        }
        write_page_at(&mut self.ovflow, pid, page, self.cfg.data_fsync)
    }

    /// Allocate a brand-new empty overflow page, returning its id.
    pub(crate) fn add_ovf_page(&mut self) -> Result<u32> {
        if self.readonly {
            return Err(anyhow!("relation is read-only"));
        }
        let len = self.ovflow.metadata()?.len();
        let pid = (len / PAGE_SIZE as u64) as u32;
        self.ovflow.seek(SeekFrom::End(0))?;
        self.ovflow.write_all(Page::new_page().as_bytes())?;
        if self.cfg.data_fsync {
            self.ovflow.sync_all()?;
        }
        crate::metrics::record_overflow_page_allocated();
        Ok(pid)
    }

    /// Bucket id that a composite hash addresses, per the current
    /// `(depth, sp)` linear-hashing state: if `depth == 0` every tuple
    /// maps to bucket 0; otherwise take the low `depth` bits, and if that
    /// falls below the split pointer, take one extra bit instead.
    pub fn bucket_addr(&self, composite_hash: u32) -> u32 {
        bucket_addr_for(composite_hash, self.info.depth, self.info.sp)
    }
}

/// Pure bucket-address function, split out so the scanner's candidate
/// enumeration (over depth bits, a safe superset of the addressing rule)
/// and the insert path share one definition.
pub fn bucket_addr_for(composite_hash: u32, depth: u32, sp: u32) -> u32 {
    if depth == 0 {
        return 0;
    }
    let p = crate::bits::low_bits(composite_hash, depth);
    if p < sp {
        crate::bits::low_bits(composite_hash, depth + 1)
    } else {
        p
    }
}

fn read_page_at(f: &mut File, pid: u32) -> Result<Page> {
    let off = pid as u64 * PAGE_SIZE as u64;
    f.seek(SeekFrom::Start(off))
        .with_context(|| format!("seek to page {pid}"))?;
    let mut buf = vec![0u8; PAGE_SIZE];
    f.read_exact(&mut buf)
        .with_context(|| format!("read page {pid}"))?;
    Page::from_bytes(buf)
}

fn write_page_at(f: &mut File, pid: u32, page: &Page, fsync: bool) -> Result<()> {
    let off = pid as u64 * PAGE_SIZE as u64;
    f.seek(SeekFrom::Start(off))
        .with_context(|| format!("seek to page {pid}"))?;
    f.write_all(page.as_bytes())
        .with_context(|| format!("write page {pid}"))?;
    if fsync {
        f.sync_all().with_context(|| format!("fsync page {pid}"))?;
    }
    Ok(())
}

impl Drop for Relation {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("failed to flush relation metadata on drop: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ChoiceBit;

    fn tmp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mahf-reln-{}-{}", name, nanos_for_test()))
    }

    fn nanos_for_test() -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    }

    fn simple_chvec(nattrs: u32) -> ChoiceVector {
        ChoiceVector::new(&[ChoiceBit { att: 0, bit: 0 }], nattrs).unwrap()
    }

    #[test]
    fn create_then_open_roundtrip() {
        let dir = tmp_dir("create-open");
        {
            let r = Relation::create(&dir, 2, 1, 0, simple_chvec(2), RelnConfig::default()).unwrap();
            r.close().unwrap();
        }
        let r = Relation::open(&dir, RelnConfig::default()).unwrap();
        assert_eq!(r.info().nattrs, 2);
        assert_eq!(r.info().npages, 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn bucket_addr_depth_zero_is_always_zero() {
        assert_eq!(bucket_addr_for(0xFFFF_FFFF, 0, 0), 0);
    }

    #[test]
    fn bucket_addr_uses_extra_bit_below_split_pointer() {
        // depth=2, sp=1: p=low2(h); if p<1 use low3(h) else p.
        let h = 0b000; // low2 = 0, 0 < sp(1) -> use low3 = 0
        assert_eq!(bucket_addr_for(h, 2, 1), 0);
        let h2 = 0b010; // low2 = 2, 2 >= 1 -> use low2 = 2
        assert_eq!(bucket_addr_for(h2, 2, 1), 2);
    }

    #[test]
    fn get_put_page_roundtrip() {
        let dir = tmp_dir("page-io");
        let mut r = Relation::create(&dir, 1, 1, 0, simple_chvec(1), RelnConfig::default()).unwrap();
        let mut p = r.get_page(0).unwrap();
        p.add_tuple(&[b"x".as_slice()]).unwrap();
        r.put_page(0, &p).unwrap();
        let p2 = r.get_page(0).unwrap();
        assert_eq!(p2.ntuples(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn add_primary_page_appends_and_extends_data_file() {
        let dir = tmp_dir("add-page");
        let mut r = Relation::create(&dir, 1, 1, 0, simple_chvec(1), RelnConfig::default()).unwrap();
        let pid = r.add_primary_page().unwrap();
        assert_eq!(pid, 1);
        let p = r.get_page(1).unwrap();
        assert_eq!(p.ntuples(), 0);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn create_with_nonzero_depth0_matches_npages0() {
        // spec.md §8 scenario 6: npages0=4, depth0=2.
        let dir = tmp_dir("depth0-4-2");
        let r = Relation::create(&dir, 1, 4, 2, simple_chvec(1), RelnConfig::default()).unwrap();
        assert_eq!(r.info().depth, 2);
        assert_eq!(r.info().sp, 0);
        assert_eq!(r.info().npages, 4);
        r.close().unwrap();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn create_rejects_npages0_depth0_mismatch() {
        let dir = tmp_dir("depth0-mismatch");
        let err = Relation::create(&dir, 1, 4, 1, simple_chvec(1), RelnConfig::default());
        assert!(err.is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
