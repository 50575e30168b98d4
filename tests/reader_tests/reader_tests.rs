//! Tests for the Ikv reader
//!
//! These tests verify:
//! - Round trip of many keys with varied payloads
//! - Size-aware and size-unaware lookups
//! - Insertion order does not change lookup results
//! - Concurrent lookups on one shared reader
//! - Corrupted files are rejected on load

use std::path::PathBuf;
use std::thread;

use ikv::{Footer, Ikv, IkvError, IkvWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.ikv");
    (temp_dir, path)
}

/// Deterministic (key, payload) pairs with distinct keys
fn generate_entries(count: usize) -> Vec<(i32, Vec<u8>)> {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    (0..count)
        .map(|i| {
            let key = (i as i32).wrapping_mul(7919) - 40_000;
            let len = (next() % 64) as usize;
            let payload = (0..len).map(|_| next() as u8).collect();
            (key, payload)
        })
        .collect()
}

fn write_entries(write_size: bool, entries: &[(i32, Vec<u8>)]) -> Vec<u8> {
    let mut writer = IkvWriter::new(Vec::new(), write_size);
    for (key, payload) in entries {
        writer.write(*key, payload).unwrap();
    }
    writer.finish().unwrap().0
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_three_key_scenario() {
    let entries = vec![
        (1, b"a".to_vec()),
        (2, b"bb".to_vec()),
        (3, b"ccc".to_vec()),
    ];
    let ikv = Ikv::from_bytes(write_entries(true, &entries)).unwrap();

    assert_eq!(ikv.get(2).unwrap(), Some(&b"bb"[..]));
    assert_eq!(ikv.get(1).unwrap(), Some(&b"a"[..]));
    assert_eq!(ikv.get(3).unwrap(), Some(&b"ccc"[..]));
}

#[test]
fn test_round_trip_many_keys() {
    let entries = generate_entries(5_000);
    let ikv = Ikv::from_bytes(write_entries(true, &entries)).unwrap();

    assert_eq!(ikv.len(), entries.len());
    assert!(ikv.has_size());
    for (key, payload) in &entries {
        assert_eq!(ikv.get(*key).unwrap(), Some(payload.as_slice()), "key {}", key);
    }
}

#[test]
fn test_size_unaware_lookups() {
    let entries = generate_entries(500);
    let bytes = write_entries(false, &entries);

    let table_start = bytes.len() - Footer::SIZE - entries.len() * 4;
    let footer = Footer::decode(&bytes[bytes.len() - Footer::SIZE..]).unwrap();
    assert_eq!(footer.record_size(), 4);
    assert_eq!(bytes[bytes.len() - 1], 0);
    assert!(table_start > 0);

    let ikv = Ikv::from_bytes(bytes).unwrap();
    assert!(!ikv.has_size());
    assert!(matches!(ikv.get_offset_and_size(entries[0].0), Err(IkvError::SizeNotStored)));

    let mut offset = 0u32;
    for (key, payload) in &entries {
        assert_eq!(ikv.get_offset(*key), Some(offset));
        let tail = ikv.get_unbounded(*key).unwrap().unwrap();
        assert!(tail.starts_with(payload));
        assert_eq!(tail.len(), ikv.data_len() - offset as usize);
        offset += payload.len() as u32;
    }
}

#[test]
fn test_insertion_order_independence() {
    let entries = generate_entries(1_000);
    let mut shuffled = entries.clone();
    shuffled.reverse();
    shuffled.rotate_left(337);

    let forward = Ikv::from_bytes(write_entries(true, &entries)).unwrap();
    let backward = Ikv::from_bytes(write_entries(true, &shuffled)).unwrap();

    for (key, _) in &entries {
        assert_eq!(forward.get(*key).unwrap(), backward.get(*key).unwrap());
    }
}

#[test]
fn test_empty_payloads() {
    let entries = vec![(10, Vec::new()), (11, b"x".to_vec()), (12, Vec::new())];
    let ikv = Ikv::from_bytes(write_entries(true, &entries)).unwrap();

    assert_eq!(ikv.get(10).unwrap(), Some(&b""[..]));
    assert_eq!(ikv.get(11).unwrap(), Some(&b"x"[..]));
    assert_eq!(ikv.get_offset_and_size(12).unwrap(), Some((1, 0)));
}

// =============================================================================
// File Tests
// =============================================================================

#[test]
fn test_open_memory_mapped() {
    let (_temp, path) = setup_temp_file();
    let entries = generate_entries(2_000);
    std::fs::write(&path, write_entries(true, &entries)).unwrap();

    let ikv = Ikv::open(&path).unwrap();
    for (key, payload) in entries.iter().step_by(7) {
        assert_eq!(ikv.get(*key).unwrap(), Some(payload.as_slice()));
    }
}

#[test]
fn test_concurrent_readers() {
    let (_temp, path) = setup_temp_file();
    let entries = generate_entries(3_000);
    std::fs::write(&path, write_entries(true, &entries)).unwrap();

    let ikv = Ikv::open(&path).unwrap();
    thread::scope(|s| {
        for t in 0..4 {
            let ikv = &ikv;
            let entries = &entries;
            s.spawn(move || {
                for (key, payload) in entries.iter().skip(t).step_by(4) {
                    assert_eq!(ikv.get(*key).unwrap(), Some(payload.as_slice()));
                }
            });
        }
    });
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_open_nonexistent_file() {
    let (_temp, path) = setup_temp_file();
    let result = Ikv::open(&path);
    assert!(matches!(result, Err(IkvError::Io(_))));
}

#[test]
fn test_truncated_file() {
    let bytes = write_entries(true, &generate_entries(100));
    let truncated = bytes[..bytes.len() / 2].to_vec();
    assert!(Ikv::from_bytes(truncated).is_err());
}

#[test]
fn test_invalid_size_flag() {
    let mut bytes = write_entries(true, &generate_entries(10));
    let last = bytes.len() - 1;
    bytes[last] = 7;
    assert!(matches!(Ikv::from_bytes(bytes), Err(IkvError::Corrupted(_))));
}

#[test]
fn test_entry_count_mismatch() {
    let mut bytes = write_entries(false, &generate_entries(10));
    // Claim one entry fewer; the table shrinks so the key data shifts
    let count_at = bytes.len() - Footer::SIZE;
    bytes[count_at] = 9;
    assert!(matches!(Ikv::from_bytes(bytes), Err(IkvError::Corrupted(_))));
}

#[test]
fn test_index_larger_than_file() {
    let mut bytes = write_entries(true, &generate_entries(10));
    let count_at = bytes.len() - Footer::SIZE;
    bytes[count_at..count_at + 4].copy_from_slice(&1_000_000i32.to_le_bytes());
    assert!(matches!(Ikv::from_bytes(bytes), Err(IkvError::Corrupted(_))));
}
