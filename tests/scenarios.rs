//! Full-relation scenarios: create -> insert -> select round trips,
//! exercised through the public API exactly as the CLI uses it.

use mahf::{ChoiceBit, ChoiceVector, Pattern, RelnConfig, Relation, ScanCursor};
use std::path::PathBuf;

fn tmp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("mahf-scenario-{name}-{}", nanos()))
}

fn nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

fn cyclic_chvec(nattrs: u32) -> ChoiceVector {
    let entries: Vec<ChoiceBit> = (0..32)
        .map(|i| ChoiceBit {
            att: (i as u32) % nattrs,
            bit: (i as u32) % 32,
        })
        .collect();
    ChoiceVector::new(&entries, nattrs).unwrap()
}

#[test]
fn create_insert_select_round_trip() {
    let dir = tmp_dir("basic");
    {
        let r = Relation::create(&dir, 3, 2, 1, cyclic_chvec(3), RelnConfig::default()).unwrap();
        r.close().unwrap();
    }

    {
        let mut r = Relation::open(&dir, RelnConfig::default()).unwrap();
        r.insert(&[b"alice".to_vec(), b"engineer".to_vec(), b"30".to_vec()])
            .unwrap();
        r.insert(&[b"bob".to_vec(), b"manager".to_vec(), b"40".to_vec()])
            .unwrap();
        r.insert(&[b"carol".to_vec(), b"engineer".to_vec(), b"28".to_vec()])
            .unwrap();
        r.close().unwrap();
    }

    let mut r = Relation::open_ro(&dir, RelnConfig::default()).unwrap();
    let pattern = Pattern::new(vec![None, Some(b"engineer".to_vec()), None], 3).unwrap();
    let results: Vec<_> = ScanCursor::new(&mut r, pattern)
        .collect::<anyhow::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(results.len(), 2);
    let names: Vec<Vec<u8>> = results.into_iter().map(|t| t[0].clone()).collect();
    assert!(names.contains(&b"alice".to_vec()));
    assert!(names.contains(&b"carol".to_vec()));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn select_with_all_known_fields_finds_exact_tuple() {
    let dir = tmp_dir("exact");
    let mut r = Relation::create(&dir, 2, 1, 0, cyclic_chvec(2), RelnConfig::default()).unwrap();
    r.insert(&[b"x".to_vec(), b"1".to_vec()]).unwrap();
    r.insert(&[b"x".to_vec(), b"2".to_vec()]).unwrap();
    r.insert(&[b"y".to_vec(), b"1".to_vec()]).unwrap();

    let pattern = Pattern::new(vec![Some(b"x".to_vec()), Some(b"2".to_vec())], 2).unwrap();
    let results: Vec<_> = ScanCursor::new(&mut r, pattern)
        .collect::<anyhow::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0], vec![b"x".to_vec(), b"2".to_vec()]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn heavy_insert_load_triggers_splits_and_stays_queryable() {
    let dir = tmp_dir("heavy");
    let cfg = RelnConfig::default().with_split_override(Some(4));
    let mut r = Relation::create(&dir, 2, 1, 0, cyclic_chvec(2), cfg).unwrap();

    let mut expected = 0u32;
    for i in 0..200u32 {
        let group = if i % 3 == 0 { "a" } else { "b" };
        r.insert(&[group.as_bytes().to_vec(), i.to_string().into_bytes()])
            .unwrap();
        if group == "a" {
            expected += 1;
        }
    }
    assert_eq!(r.info().ntuples, 200);
    assert!(r.info().npages > 1, "relation should have split at least once");

    let pattern = Pattern::new(vec![Some(b"a".to_vec()), None], 2).unwrap();
    let results: Vec<_> = ScanCursor::new(&mut r, pattern)
        .collect::<anyhow::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(results.len() as u32, expected);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn reopen_after_close_preserves_state() {
    let dir = tmp_dir("reopen");
    {
        let mut r = Relation::create(&dir, 1, 1, 0, cyclic_chvec(1), RelnConfig::default()).unwrap();
        for i in 0..5u32 {
            r.insert(&[format!("row{i}").into_bytes()]).unwrap();
        }
        r.close().unwrap();
    }

    let r2 = Relation::open(&dir, RelnConfig::default()).unwrap();
    assert_eq!(r2.info().ntuples, 5);
    r2.close().unwrap();

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn oversize_tuple_is_rejected_as_a_space_error_not_lost_silently() {
    let dir = tmp_dir("oversize");
    let mut r = Relation::create(&dir, 1, 1, 0, cyclic_chvec(1), RelnConfig::default()).unwrap();

    let too_big = vec![b'x'; mahf::page::MAX_TUPLE_LEN + 1];
    let err = r.insert(&[too_big]);
    assert!(err.is_err());
    // Rejected before touching storage: no tuple counted, no page grown.
    assert_eq!(r.info().ntuples, 0);
    assert_eq!(r.info().npages, 1);

    // The relation is still usable afterward for ordinarily-sized tuples.
    r.insert(&[b"fits".to_vec()]).unwrap();
    assert_eq!(r.info().ntuples, 1);

    let _ = std::fs::remove_dir_all(&dir);
}
