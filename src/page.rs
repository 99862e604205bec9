//! On-disk page format: a fixed-size bucket page holding NUL-terminated,
//! comma-joined tuples, with a small header tracking free space, the
//! overflow chain link and the tuple count.
//!
//! Both primary bucket pages (`.data`) and overflow pages (`.ovflow`) use
//! this exact same layout — an overflow page is addressed no differently
//! from a primary one once loaded, it's only reachable via the `ovflow`
//! link of the page before it in the chain.

use anyhow::{anyhow, Context, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Fixed page size in bytes, matching the original system's default and
/// the worked `T_split` examples in the design notes.
pub const PAGE_SIZE: usize = 1024;

/// Sentinel meaning "no page" (end of overflow chain, or absent link).
pub const NO_PAGE: u32 = u32::MAX;

/// Largest serialized-tuple length (fields joined by `,`, NUL excluded)
/// that can ever be stored, even in a brand-new empty page. Per
/// spec.md §4.3: a tuple longer than this "cannot be stored; surface
/// as error" — there is no page, primary or overflow, it could ever fit
/// in, so this is checked once at encode time rather than discovered
/// only after exhausting the overflow chain.
pub const MAX_TUPLE_LEN: usize = PAGE_SIZE - HEADER_SIZE - 1;

const OFF_FREE: usize = 0;
const OFF_OVFLOW: usize = 4;
const OFF_NTUPLES: usize = 8;
pub const HEADER_SIZE: usize = 12;

/// A single in-memory page: owns exactly `PAGE_SIZE` bytes.
#[derive(Clone)]
pub struct Page {
    buf: Vec<u8>,
}

impl Page {
    /// A freshly initialized, empty page: no overflow link, no tuples.
    pub fn new_page() -> Self {
        let mut buf = vec![0u8; PAGE_SIZE];
        LittleEndian::write_u32(&mut buf[OFF_FREE..], HEADER_SIZE as u32);
        LittleEndian::write_u32(&mut buf[OFF_OVFLOW..], NO_PAGE);
        LittleEndian::write_u32(&mut buf[OFF_NTUPLES..], 0);
        Self { buf }
    }

    /// Wrap a raw `PAGE_SIZE`-byte buffer read from disk. Fails if the
    /// buffer isn't exactly one page, or the header is internally
    /// inconsistent (free offset out of bounds).
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self> {
        if buf.len() != PAGE_SIZE {
            return Err(anyhow!(
                "page buffer must be {} bytes, got {}",
                PAGE_SIZE,
                buf.len()
            ));
        }
        let p = Self { buf };
        let free = p.free() as usize;
        if free < HEADER_SIZE || free > PAGE_SIZE {
            return Err(anyhow!("corrupt page: free offset {} out of bounds", free));
        }
        Ok(p)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    pub fn free(&self) -> u32 {
        LittleEndian::read_u32(&self.buf[OFF_FREE..])
    }

    #[inline]
    fn set_free(&mut self, v: u32) {
        LittleEndian::write_u32(&mut self.buf[OFF_FREE..], v);
    }

    #[inline]
    pub fn ovflow(&self) -> u32 {
        LittleEndian::read_u32(&self.buf[OFF_OVFLOW..])
    }

    #[inline]
    pub fn set_ovflow(&mut self, pid: u32) {
        LittleEndian::write_u32(&mut self.buf[OFF_OVFLOW..], pid);
    }

    #[inline]
    pub fn ntuples(&self) -> u32 {
        LittleEndian::read_u32(&self.buf[OFF_NTUPLES..])
    }

    #[inline]
    fn set_ntuples(&mut self, v: u32) {
        LittleEndian::write_u32(&mut self.buf[OFF_NTUPLES..], v);
    }

    /// Bytes remaining in the data region.
    pub fn free_space(&self) -> usize {
        PAGE_SIZE - self.free() as usize
    }

    /// Encode a tuple as comma-joined fields + a single NUL terminator,
    /// validating that no field is empty or contains `,`/NUL.
    pub fn encode_tuple(fields: &[impl AsRef<[u8]>]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for (i, f) in fields.iter().enumerate() {
            let f = f.as_ref();
            if f.is_empty() {
                return Err(anyhow!("attribute {} is empty", i));
            }
            if f.iter().any(|&b| b == b',' || b == 0) {
                return Err(anyhow!(
                    "attribute {} contains an embedded comma or NUL byte",
                    i
                ));
            }
            if i > 0 {
                out.push(b',');
            }
            out.extend_from_slice(f);
        }
        if out.len() > MAX_TUPLE_LEN {
            return Err(anyhow!(
                "tuple of {} bytes exceeds the maximum storable length of {} bytes",
                out.len(),
                MAX_TUPLE_LEN
            ));
        }
        out.push(0);
        Ok(out)
    }

    /// Attempt to append an already-encoded tuple (see [`encode_tuple`]).
    /// Returns `true` if it fit and was written, `false` if there wasn't
    /// enough free space (the caller must then chain to / allocate an
    /// overflow page).
    pub fn add_tuple_encoded(&mut self, encoded: &[u8]) -> bool {
        let free = self.free() as usize;
        if free + encoded.len() > PAGE_SIZE {
            return false;
        }
        self.buf[free..free + encoded.len()].copy_from_slice(encoded);
        self.set_free((free + encoded.len()) as u32);
        self.set_ntuples(self.ntuples() + 1);
        true
    }

    /// Validate and append a tuple given as raw field byte-strings.
    pub fn add_tuple(&mut self, fields: &[impl AsRef<[u8]>]) -> Result<bool> {
        let encoded = Self::encode_tuple(fields)?;
        Ok(self.add_tuple_encoded(&encoded))
    }

    /// Reset this page to empty, keeping whatever overflow link the
    /// caller sets afterwards (callers that want a bare cleared primary
    /// page call `set_ovflow(NO_PAGE)` themselves).
    pub fn clear(&mut self) {
        for b in self.buf[HEADER_SIZE..].iter_mut() {
            *b = 0;
        }
        self.set_free(HEADER_SIZE as u32);
        self.set_ntuples(0);
    }

    /// Iterate over the tuples stored in this page, each as a vector of
    /// raw attribute byte-strings, in insertion order.
    pub fn iter_tuples(&self) -> Result<Vec<Vec<Vec<u8>>>> {
        let mut out = Vec::with_capacity(self.ntuples() as usize);
        let free = self.free() as usize;
        let mut pos = HEADER_SIZE;
        while pos < free {
            let nul = self.buf[pos..free]
                .iter()
                .position(|&b| b == 0)
                .with_context(|| format!("tuple at offset {pos} is missing its NUL terminator"))?;
            let raw = &self.buf[pos..pos + nul];
            let fields: Vec<Vec<u8>> = raw.split(|&b| b == b',').map(|f| f.to_vec()).collect();
            out.push(fields);
            pos += nul + 1;
        }
        if out.len() != self.ntuples() as usize {
            return Err(anyhow!(
                "page header says {} tuples but {} were decoded",
                self.ntuples(),
                out.len()
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_page_is_empty() {
        let p = Page::new_page();
        assert_eq!(p.ntuples(), 0);
        assert_eq!(p.ovflow(), NO_PAGE);
        assert_eq!(p.free_space(), PAGE_SIZE - HEADER_SIZE);
    }

    #[test]
    fn add_and_iterate_roundtrip() {
        let mut p = Page::new_page();
        assert!(p.add_tuple(&[b"alice".as_slice(), b"30".as_slice()]).unwrap());
        assert!(p.add_tuple(&[b"bob".as_slice(), b"25".as_slice()]).unwrap());
        assert_eq!(p.ntuples(), 2);
        let tuples = p.iter_tuples().unwrap();
        assert_eq!(tuples, vec![
            vec![b"alice".to_vec(), b"30".to_vec()],
            vec![b"bob".to_vec(), b"25".to_vec()],
        ]);
    }

    #[test]
    fn add_tuple_rejects_embedded_comma() {
        let mut p = Page::new_page();
        assert!(p.add_tuple(&[b"a,b".as_slice()]).is_err());
    }

    #[test]
    fn add_tuple_fails_when_full() {
        // Fills the page with max-length tuples until none fit, exercising
        // the `false` ("full", not an error) return path rather than the
        // oversize-tuple error path exercised below.
        let mut p = Page::new_page();
        loop {
            let filler = vec![b'x'; MAX_TUPLE_LEN];
            if !p.add_tuple(&[filler.as_slice()]).unwrap() {
                break;
            }
        }
        assert!(!p.add_tuple(&[b"x".as_slice()]).unwrap());
    }

    #[test]
    fn encode_tuple_rejects_oversize_tuple() {
        // One byte past the largest length any page (fresh or not) could
        // ever hold; per spec.md §4.3 this must surface as an error, not
        // silently fail or succeed.
        let too_big = vec![b'x'; MAX_TUPLE_LEN + 1];
        assert!(Page::encode_tuple(&[too_big.as_slice()]).is_err());
    }

    #[test]
    fn encode_tuple_accepts_exactly_max_len_tuple() {
        let exact = vec![b'x'; MAX_TUPLE_LEN];
        let encoded = Page::encode_tuple(&[exact.as_slice()]).unwrap();
        // + 1 for the NUL terminator, filling the page's data region exactly.
        assert_eq!(encoded.len(), PAGE_SIZE - HEADER_SIZE);
        let mut p = Page::new_page();
        assert!(p.add_tuple_encoded(&encoded));
    }

    #[test]
    fn from_bytes_rejects_wrong_size() {
        assert!(Page::from_bytes(vec![0u8; 10]).is_err());
    }

    #[test]
    fn bytes_roundtrip_through_from_bytes() {
        let mut p = Page::new_page();
        p.add_tuple(&[b"x".as_slice()]).unwrap();
        let bytes = p.into_bytes();
        let p2 = Page::from_bytes(bytes).unwrap();
        assert_eq!(p2.ntuples(), 1);
    }
}
