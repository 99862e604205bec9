//! Stable attribute hashing and choice-vector composite hash.
//!
//! Goals:
//! - Use a stable, explicit hash (not std::DefaultHasher) so bucket mapping
//!   is invariant across toolchains/platforms.
//! - Build the 32-bit composite tuple hash bit-by-bit from a relation's
//!   choice vector, per the addressing scheme in meta.rs/relation.rs.

use anyhow::{anyhow, Result};
use twox_hash::XxHash32;
use std::hash::Hasher;

use crate::bits::get_bit;

/// Maximum length of a choice vector. Fixed by the on-disk `.info` layout.
pub const MAXCHVEC: usize = 32;

/// One entry of a choice vector: take bit `bit` of `hash(tuple[att])`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChoiceBit {
    pub att: u32,
    pub bit: u32,
}

/// A relation-wide, immutable choice vector of exactly `MAXCHVEC` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceVector {
    entries: [ChoiceBit; MAXCHVEC],
}

impl ChoiceVector {
    /// Build a choice vector from a slice of entries, validating each
    /// attribute index against `nattrs` and each bit index against 32.
    /// Entries beyond the given slice are padded by cycling the supplied
    /// entries (mirrors the original system's `choose_hashcode` default,
    /// which keeps picking from attribute 0 upward once all have a bit
    /// assigned once).
    pub fn new(entries: &[ChoiceBit], nattrs: u32) -> Result<Self> {
        if entries.is_empty() {
            return Err(anyhow!("choice vector must have at least one entry"));
        }
        for e in entries {
            if e.att >= nattrs {
                return Err(anyhow!(
                    "choice vector attribute index {} out of range (nattrs={})",
                    e.att,
                    nattrs
                ));
            }
            if e.bit >= 32 {
                return Err(anyhow!("choice vector bit index {} out of range", e.bit));
            }
        }
        let mut full = [ChoiceBit::default(); MAXCHVEC];
        for (i, slot) in full.iter_mut().enumerate() {
            *slot = entries[i % entries.len()];
        }
        Ok(Self { entries: full })
    }

    /// Construct directly from a full `MAXCHVEC`-length array, as read
    /// back from an on-disk `.info` file. No validation beyond bounds is
    /// performed here; `nattrs` consistency is checked by the caller.
    pub fn from_array(entries: [ChoiceBit; MAXCHVEC]) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ChoiceBit; MAXCHVEC] {
        &self.entries
    }

    /// Compute the 32-bit composite tuple hash: bit `k` of the result is
    /// bit `self.entries[k].bit` of `hash(attr_hashes[self.entries[k].att])`.
    ///
    /// `attr_hashes` must have one entry per attribute, already hashed via
    /// `hash_attr`.
    pub fn composite_hash(&self, attr_hashes: &[u32]) -> u32 {
        let mut h: u32 = 0;
        for (k, cb) in self.entries.iter().enumerate() {
            let src = attr_hashes[cb.att as usize];
            if get_bit(src, cb.bit) {
                h |= 1 << k;
            }
        }
        h
    }
}

/// 32-bit stable hash of a single attribute's raw bytes (xxhash32, seed 0).
#[inline]
pub fn hash_attr(bytes: &[u8]) -> u32 {
    let mut h = XxHash32::with_seed(0);
    h.write(bytes);
    h.finish() as u32
}

/// Hash every attribute of a tuple, in order, via [`hash_attr`].
pub fn hash_tuple_attrs(tuple: &[impl AsRef<[u8]>]) -> Vec<u32> {
    tuple.iter().map(|a| hash_attr(a.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_attr_is_stable() {
        let a = hash_attr(b"hello");
        let b = hash_attr(b"hello");
        assert_eq!(a, b);
        assert_ne!(a, hash_attr(b"world"));
    }

    #[test]
    fn choice_vector_rejects_bad_att() {
        let entries = [ChoiceBit { att: 5, bit: 0 }];
        assert!(ChoiceVector::new(&entries, 2).is_err());
    }

    #[test]
    fn choice_vector_rejects_bad_bit() {
        let entries = [ChoiceBit { att: 0, bit: 32 }];
        assert!(ChoiceVector::new(&entries, 1).is_err());
    }

    #[test]
    fn composite_hash_picks_requested_bits() {
        // att0 = 0b...01, att1 = 0b...10
        let cv = ChoiceVector::new(
            &[ChoiceBit { att: 0, bit: 0 }, ChoiceBit { att: 1, bit: 1 }],
            2,
        )
        .unwrap();
        let h = cv.composite_hash(&[0b01, 0b10]);
        // bit0 <- att0.bit0 = 1 ; bit1 <- att1.bit1 = 1 ; rest cycles the same two picks
        assert_eq!(h & 0b11, 0b11);
    }
}
