//! CLI-only text marshaling: tuple lines and choice-vector syntax. Kept
//! out of the library crate, per this format's "out of scope for core"
//! boundary for argument/text parsing.

use anyhow::{anyhow, Result};
use mahf::{ChoiceBit, ChoiceVector};

/// Parse one line of comma-separated attribute values into raw fields.
pub fn parse_tuple_line(line: &str) -> Result<Vec<Vec<u8>>> {
    if line.is_empty() {
        return Err(anyhow!("empty tuple line"));
    }
    Ok(line.split(',').map(|f| f.as_bytes().to_vec()).collect())
}

/// Parse a partial-match pattern line: comma-separated fields, where a
/// bare `?` means "unknown".
pub fn parse_pattern_line(line: &str, nattrs: u32) -> Result<Vec<Option<Vec<u8>>>> {
    let slots: Vec<Option<Vec<u8>>> = line
        .split(',')
        .map(|f| if f == "?" { None } else { Some(f.as_bytes().to_vec()) })
        .collect();
    if slots.len() != nattrs as usize {
        return Err(anyhow!(
            "pattern has {} fields, relation expects {}",
            slots.len(),
            nattrs
        ));
    }
    Ok(slots)
}

/// Render a tuple's raw fields back to a printable comma-separated line,
/// using a lossy UTF-8 conversion for display purposes only.
pub fn render_tuple(fields: &[Vec<u8>]) -> String {
    fields
        .iter()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse `"att:bit,att:bit,..."` into a choice vector. Must name at least
/// one attribute; entries beyond `MAXCHVEC` are rejected, fewer are
/// cycled to fill the full vector (see `ChoiceVector::new`).
pub fn parse_choice_vector(text: &str, nattrs: u32) -> Result<ChoiceVector> {
    let mut entries = Vec::new();
    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (att_s, bit_s) = part
            .split_once(':')
            .ok_or_else(|| anyhow!("choice vector entry '{part}' must be 'att:bit'"))?;
        let att: u32 = att_s
            .trim()
            .parse()
            .map_err(|_| anyhow!("bad attribute index in '{part}'"))?;
        let bit: u32 = bit_s
            .trim()
            .parse()
            .map_err(|_| anyhow!("bad bit index in '{part}'"))?;
        entries.push(ChoiceBit { att, bit });
    }
    if entries.len() > mahf::hash::MAXCHVEC {
        return Err(anyhow!(
            "choice vector has {} entries, maximum is {}",
            entries.len(),
            mahf::hash::MAXCHVEC
        ));
    }
    ChoiceVector::new(&entries, nattrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tuple_line_splits_on_comma() {
        let t = parse_tuple_line("alice,30").unwrap();
        assert_eq!(t, vec![b"alice".to_vec(), b"30".to_vec()]);
    }

    #[test]
    fn parse_pattern_line_handles_wildcard() {
        let p = parse_pattern_line("alice,?", 2).unwrap();
        assert_eq!(p[0], Some(b"alice".to_vec()));
        assert_eq!(p[1], None);
    }

    #[test]
    fn parse_choice_vector_basic() {
        let cv = parse_choice_vector("0:0,1:3", 2).unwrap();
        assert_eq!(cv.entries()[0].att, 0);
        assert_eq!(cv.entries()[1].bit, 3);
    }
}
