//! `.info` file format: the five-integer relation header plus its
//! choice vector, persisted as a flat little-endian record with no
//! magic/version preamble — the on-disk contract is taken literally.
//!
//! Format (offset 0, all `u32` LE):
//!   nattrs, depth, sp, npages, ntuples
//!   then MAXCHVEC * (att: u32, bit: u32) choice-vector entries.

use anyhow::{Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::hash::{ChoiceBit, ChoiceVector, MAXCHVEC};

/// In-memory mirror of the `.info` file contents.
#[derive(Debug, Clone)]
pub struct RelnInfo {
    pub nattrs: u32,
    pub depth: u32,
    pub sp: u32,
    pub npages: u32,
    pub ntuples: u32,
    pub chvec: ChoiceVector,
}

impl RelnInfo {
    /// `npages0` must equal `2^depth0` (sp always starts at 0), per
    /// spec.md §3's `npages = 2^depth + sp` invariant holding from the
    /// moment a relation is created.
    pub fn new(nattrs: u32, npages0: u32, depth0: u32, chvec: ChoiceVector) -> Self {
        Self {
            nattrs,
            depth: depth0,
            sp: 0,
            npages: npages0,
            ntuples: 0,
            chvec,
        }
    }
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}
#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn write_info_contents(f: &mut File, info: &RelnInfo) -> Result<()> {
    f.seek(SeekFrom::Start(0))?;
    f.write_u32::<LittleEndian>(info.nattrs)?;
    f.write_u32::<LittleEndian>(info.depth)?;
    f.write_u32::<LittleEndian>(info.sp)?;
    f.write_u32::<LittleEndian>(info.npages)?;
    f.write_u32::<LittleEndian>(info.ntuples)?;
    for cb in info.chvec.entries().iter() {
        f.write_u32::<LittleEndian>(cb.att)?;
        f.write_u32::<LittleEndian>(cb.bit)?;
    }
    Ok(())
}

/// Write a brand-new `.info` file at `path` via tmp-file + rename.
/// Fails if `path` already exists.
pub fn write_info_new(path: &Path, info: &RelnInfo) -> Result<()> {
    if path.exists() {
        anyhow::bail!(".info already exists at {}", path.display());
    }
    let tmp = path.with_extension("info.tmp");
    let _ = fs::remove_file(&tmp);

    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .with_context(|| format!("open info tmp {}", tmp.display()))?;

    write_info_contents(&mut f, info)?;
    f.sync_all().with_context(|| format!("fsync {}", tmp.display()))?;

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    let _ = fsync_dir(path);
    Ok(())
}

/// Overwrite an existing `.info` file at `path` via tmp-file + rename.
pub fn write_info_overwrite(path: &Path, info: &RelnInfo) -> Result<()> {
    let tmp = path.with_extension("info.tmp");
    let _ = fs::remove_file(&tmp);

    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .with_context(|| format!("open info tmp {}", tmp.display()))?;

    write_info_contents(&mut f, info)?;
    f.sync_all().with_context(|| format!("fsync {}", tmp.display()))?;

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    let _ = fsync_dir(path);
    Ok(())
}

/// Read and validate an `.info` file at `path`.
pub fn read_info(path: &Path) -> Result<RelnInfo> {
    let mut f = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("open info {}", path.display()))?;

    let nattrs = f.read_u32::<LittleEndian>()?;
    let depth = f.read_u32::<LittleEndian>()?;
    let sp = f.read_u32::<LittleEndian>()?;
    let npages = f.read_u32::<LittleEndian>()?;
    let ntuples = f.read_u32::<LittleEndian>()?;

    let mut entries = [ChoiceBit::default(); MAXCHVEC];
    for e in entries.iter_mut() {
        e.att = f.read_u32::<LittleEndian>()?;
        e.bit = f.read_u32::<LittleEndian>()?;
    }
    for e in entries.iter() {
        if e.att >= nattrs {
            anyhow::bail!(
                "corrupt .info: choice vector references attribute {} but nattrs={}",
                e.att,
                nattrs
            );
        }
    }

    Ok(RelnInfo {
        nattrs,
        depth,
        sp,
        npages,
        ntuples,
        chvec: ChoiceVector::from_array(entries),
    })
}
