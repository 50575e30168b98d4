//! Tests for IkvIndexBuilder
//!
//! These tests verify:
//! - Footer contents (entry count, key data size, size flag)
//! - Exact index block length for both record widths
//! - Table records placed at the perfect-hash rank of their key
//! - Degenerate empty index
//! - Failure propagation (duplicate keys, failing callback)

use bytes::{Buf, Bytes};
use ikv::mphf::{BbHash, Evaluator, PerfectHash};
use ikv::{Entry, Footer, IkvConfig, IkvError, IkvIndexBuilder, IndexInfo};

// =============================================================================
// Helper Functions
// =============================================================================

/// Run the builder and capture the block handed to the callback
fn build(builder: IkvIndexBuilder) -> (Bytes, IndexInfo) {
    let mut captured = None;
    let info = builder
        .write(|buf| {
            captured = Some(buf);
            Ok(())
        })
        .unwrap();
    (captured.expect("callback invoked"), info)
}

fn footer_of(block: &[u8]) -> Footer {
    Footer::decode(&block[block.len() - Footer::SIZE..]).unwrap()
}

fn builder_with(write_size: bool, entries: &[Entry]) -> IkvIndexBuilder {
    let mut builder = IkvIndexBuilder::new(write_size);
    for entry in entries {
        builder.add(*entry);
    }
    builder
}

fn sample_entries() -> Vec<Entry> {
    vec![
        Entry::new(1, 0, 1),
        Entry::new(2, 1, 2),
        Entry::new(3, 3, 3),
    ]
}

// =============================================================================
// Footer Tests
// =============================================================================

#[test]
fn test_footer_counts_entries() {
    let (block, info) = build(builder_with(true, &sample_entries()));
    let footer = footer_of(&block);

    assert_eq!(footer.entry_count, 3);
    assert!(footer.has_size);
    assert_eq!(footer.key_data_size as usize, info.key_data_size);
    assert_eq!(info.entry_count, 3);
    assert_eq!(*block.last().unwrap(), 1);
}

#[test]
fn test_footer_without_sizes() {
    let (block, info) = build(builder_with(false, &sample_entries()));
    let footer = footer_of(&block);

    assert!(!footer.has_size);
    assert_eq!(*block.last().unwrap(), 0);
    assert_eq!(info.record_size, 4);
    assert_eq!(
        block.len(),
        info.key_data_size + 3 * 4 + Footer::SIZE
    );
}

#[test]
fn test_block_length_is_exact() {
    let entries: Vec<Entry> = (0..1_000)
        .map(|i| Entry::new(i * 13, (i * 10) as u32, 10))
        .collect();
    let (block, info) = build(builder_with(true, &entries));

    assert_eq!(info.record_size, 8);
    assert_eq!(block.len(), info.key_data_size + 1_000 * 8 + 8 + 1);
    assert_eq!(block.len(), info.index_length);
}

// =============================================================================
// Table Layout Tests
// =============================================================================

#[test]
fn test_records_sit_at_rank() {
    let entries: Vec<Entry> = (0..200)
        .map(|i| Entry::new(1000 - i * 5, i as u32 * 4, i as u32 + 1))
        .collect();
    let (block, info) = build(builder_with(true, &entries));

    let evaluator = BbHash::default()
        .load(&block[..info.key_data_size])
        .unwrap();
    let mut table = &block[info.key_data_size..block.len() - Footer::SIZE];
    let records: Vec<u64> = (0..entries.len()).map(|_| table.get_u64_le()).collect();

    for entry in &entries {
        let rank = evaluator.evaluate(entry.key).unwrap();
        let record = records[rank];
        assert_eq!((record >> 32) as u32, entry.offset);
        assert_eq!(record as u32, entry.size);
    }
}

#[test]
fn test_offset_only_records() {
    let entries = sample_entries();
    let (block, info) = build(builder_with(false, &entries));

    let evaluator = BbHash::default()
        .load(&block[..info.key_data_size])
        .unwrap();
    let table = &block[info.key_data_size..block.len() - Footer::SIZE];
    assert_eq!(table.len(), entries.len() * 4);

    for entry in &entries {
        let rank = evaluator.evaluate(entry.key).unwrap();
        let mut record = &table[rank * 4..rank * 4 + 4];
        assert_eq!(record.get_u32_le(), entry.offset);
    }
}

#[test]
fn test_insertion_order_changes_nothing_per_key() {
    let entries: Vec<Entry> = (0..300).map(|i| Entry::new(i, i as u32, 1)).collect();
    let mut reversed = entries.clone();
    reversed.reverse();

    let (forward, info) = build(builder_with(true, &entries));
    let (backward, _) = build(builder_with(true, &reversed));

    // Same keys and seed: same hash, same rank for every key
    assert_eq!(forward, backward);
    assert_eq!(info.entry_count, 300);
}

// =============================================================================
// Boundary Tests
// =============================================================================

#[test]
fn test_empty_builder() {
    let (block, info) = build(IkvIndexBuilder::default());
    let footer = footer_of(&block);

    assert_eq!(footer.entry_count, 0);
    assert_eq!(info.entry_count, 0);
    assert_eq!(block.len(), info.key_data_size + Footer::SIZE);
}

#[test]
fn test_config_controls_layout() {
    let config = IkvConfig::builder().write_size(false).hash_seed(99).build();
    let mut builder = IkvIndexBuilder::with_config(&config);
    builder.add(Entry::new(7, 0, 4));
    assert!(!builder.write_size());

    let (block, info) = build(builder);
    assert_eq!(info.record_size, 4);
    assert!(!footer_of(&block).has_size);
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_duplicate_keys_fail_before_callback() {
    let builder = builder_with(
        true,
        &[Entry::new(4, 0, 1), Entry::new(4, 1, 1), Entry::new(5, 2, 1)],
    );
    let mut called = false;
    let result = builder.write(|_| {
        called = true;
        Ok(())
    });

    assert!(matches!(result, Err(IkvError::HashConstruction(_))));
    assert!(!called);
}

#[test]
fn test_callback_error_is_returned() {
    let builder = builder_with(true, &sample_entries());
    let result = builder.write(|_| Err(IkvError::Corrupted("sink refused".into())));
    assert!(matches!(result, Err(IkvError::Corrupted(_))));
}
