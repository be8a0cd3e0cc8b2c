//! Record area scenarios against the walker and the payload dispatcher

use proptest::prelude::*;

use omnipower_rs::payload::{decode_blocks, walk_records, RecordErrorKind};
use omnipower_rs::{QuantityKind, Unit};

#[test]
fn test_mixed_width_records_in_order() {
    let mut records: Vec<u8> = Vec::new();
    // 8-byte energy import
    records.extend_from_slice(&[0x07, 0x04]);
    records.extend_from_slice(&123_456_789u64.to_le_bytes());
    // 3-byte energy export
    records.extend_from_slice(&[0x03, 0x84, 0x3C, 0x2A, 0x00, 0x00]);
    // 1-byte power import
    records.extend_from_slice(&[0x01, 0x2B, 0x05]);

    let walk = walk_records(&records).unwrap();
    assert!(!walk.partial);

    let decoded: Vec<_> = walk.blocks.iter().map(|b| (b.kind, b.value)).collect();
    assert_eq!(
        decoded,
        vec![
            (QuantityKind::EnergyImport, 123_456_789),
            (QuantityKind::EnergyExport, 42),
            (QuantityKind::PowerImport, 5),
        ]
    );
}

#[test]
fn test_backward_flow_vife_on_power() {
    let walk = walk_records(&[0x01, 0xAB, 0x3C, 0x05]).unwrap();
    assert_eq!(walk.blocks.len(), 1);
    assert_eq!(walk.blocks[0].kind, QuantityKind::PowerExport);
    assert_eq!(walk.blocks[0].value, 5);
    assert_eq!(walk.blocks[0].unit, Unit::Watt);
}

#[test]
fn test_doubled_backward_vife_is_rejected() {
    // 0xBC keeps the extension bit going, 0x3C ends the chain
    let err = walk_records(&[0x04, 0x84, 0xBC, 0x3C, 0x00, 0x00, 0x00, 0x00]).unwrap_err();
    assert!(matches!(err.kind, RecordErrorKind::Unexpected { .. }));
}

#[test]
fn test_scale_sweep_over_both_rows() {
    for (vif_base, unit) in [(0x00u8, Unit::WattHour), (0x28, Unit::Watt)] {
        for step in 0u8..8 {
            let records = [0x04, vif_base + step, 0x01, 0x00, 0x00, 0x00];
            let walk = walk_records(&records).unwrap();
            let block = &walk.blocks[0];
            assert_eq!(block.unit, unit);
            assert_eq!(block.scale, step as i8 - 3);
            assert_eq!(block.physical(), 10f64.powi(i32::from(step) - 3));
        }
    }
}

#[test]
fn test_filler_only_area_walks_clean() {
    let walk = walk_records(&[0x2F; 16]).unwrap();
    assert!(walk.blocks.is_empty());
    assert!(!walk.partial);
}

#[test]
fn test_dispatcher_rejects_filler_only_full_frame() {
    // structurally walkable, but nothing usable came out
    let err = decode_blocks(&[0x00, 0x00, 0x78, 0x2F, 0x2F, 0x2F, 0x2F]).unwrap_err();
    assert!(matches!(err.kind, RecordErrorKind::Unexpected { .. }));
}

#[test]
fn test_dispatcher_rejects_marker_only_payload() {
    // a phase marker announces blocks that never arrive
    let err = decode_blocks(&[0x00, 0x00, 0x78, 0x00, 0xFF, 0x01]).unwrap_err();
    assert!(matches!(err.kind, RecordErrorKind::Unexpected { .. }));
}

#[test]
fn test_dispatcher_rejects_foreign_marker() {
    // 0x72: long TPL header of wired M-Bus, never sent by this meter
    let err = decode_blocks(&[0x00, 0x00, 0x72, 0x04, 0x04, 0x01, 0x00, 0x00, 0x00]).unwrap_err();
    match err.kind {
        RecordErrorKind::Unexpected { reason } => {
            assert!(reason.contains("0x72"), "reason was: {reason}")
        }
        other => panic!("unexpected kind: {other:?}"),
    }
}

#[test]
fn test_more_records_terminator_keeps_walk_complete() {
    let mut records: Vec<u8> = vec![0x04, 0x04];
    records.extend_from_slice(&206u32.to_le_bytes());
    records.push(0x1F);
    // bytes after the terminator must not be touched
    records.extend_from_slice(&[0x84, 0xFF, 0xFF, 0xFF]);

    let walk = walk_records(&records).unwrap();
    assert!(!walk.partial);
    assert_eq!(walk.blocks.len(), 1);
}

#[test]
fn test_reserved_special_function_dif() {
    let err = walk_records(&[0x3F, 0x04, 0x01, 0x00, 0x00, 0x00]).unwrap_err();
    match err.kind {
        RecordErrorKind::Unexpected { reason } => {
            assert!(reason.contains("DIF"), "reason was: {reason}")
        }
        other => panic!("unexpected kind: {other:?}"),
    }
}

proptest! {
    /// The walker is total: arbitrary bytes either decode or produce a
    /// typed error, never a panic, and never more blocks than bytes.
    #[test]
    fn prop_walker_is_total(records in proptest::collection::vec(any::<u8>(), 0..64)) {
        match walk_records(&records) {
            Ok(walk) => prop_assert!(walk.blocks.len() <= records.len()),
            Err(err) => prop_assert!(err.blocks.len() <= records.len()),
        }
    }

    /// Idle filler between records never changes what is decoded.
    #[test]
    fn prop_filler_is_transparent(watts in any::<u16>(), fillers in 1usize..8) {
        let mut padded: Vec<u8> = vec![0x2F; fillers];
        padded.extend_from_slice(&[0x02, 0x2B]);
        padded.extend_from_slice(&watts.to_le_bytes());
        padded.extend(std::iter::repeat(0x2F).take(fillers));

        let plain = {
            let mut r: Vec<u8> = vec![0x02, 0x2B];
            r.extend_from_slice(&watts.to_le_bytes());
            walk_records(&r).unwrap()
        };
        let walked = walk_records(&padded).unwrap();
        prop_assert_eq!(walked.blocks, plain.blocks);
    }
}
