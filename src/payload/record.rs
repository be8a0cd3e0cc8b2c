//! Data record walker for decrypted payloads
//!
//! Full frames (TPL CI 0x78) carry self-describing records: a DIF
//! giving the storage width, a VIF chain giving the meaning, then the
//! value bytes. The walker is a single forward pass over the record
//! area with a cursor; there is no lookahead and no recursion.
//!
//! Compact frames (TPL CI 0x79) drop the DIF/VIF bytes entirely and
//! send a fixed bank of four registers behind a format signature, so
//! they get their own fixed-layout decoder.
//!
//! Records the meter is not known to emit are skipped where their
//! width is still self-evident, and the result is flagged partial.
//! Structures whose width cannot be trusted abort the walk instead.

use log::debug;
use serde::Serialize;

use crate::constants::{
    MBUS_DATA_RECORD_DIF_MASK_DATA, MBUS_DIB_DIF_EXTENSION_BIT, MBUS_DIB_DIF_IDLE_FILLER,
    MBUS_DIB_DIF_MANUFACTURER_SPECIFIC, MBUS_DIB_DIF_MORE_RECORDS_FOLLOW,
    MBUS_DIB_VIF_EXTENSION_BIT, MBUS_DIB_VIF_WITHOUT_EXTENSION, MBUS_MAX_EXTENSION_BYTES,
    MBUS_VIFE_BACKWARD_FLOW, MBUS_VIF_MANUFACTURER_SPECIFIC,
};
use crate::payload::vif::{lookup_vif, QuantityKind, Unit};
use crate::util::hex::format_hex_compact;

/// One decoded measurement value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueBlock {
    pub kind: QuantityKind,
    /// Phase 1 to 3 when a phase marker preceded this block
    pub phase: Option<u8>,
    /// Raw register value before scaling
    pub value: u64,
    pub unit: Unit,
    /// Decimal exponent: `value * 10^scale` is in `unit`
    pub scale: i8,
}

impl ValueBlock {
    /// Register value with the decimal scale applied, in `unit`.
    pub fn physical(&self) -> f64 {
        self.value as f64 * 10f64.powi(i32::from(self.scale))
    }
}

/// Outcome of walking a record area to its end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWalk {
    /// Decoded blocks in payload order
    pub blocks: Vec<ValueBlock>,
    /// True when at least one record had to be skipped
    pub partial: bool,
}

/// Failure inside the record area
///
/// Carries the blocks decoded before the fault so callers can salvage
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    pub kind: RecordErrorKind,
    pub blocks: Vec<ValueBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordErrorKind {
    /// A field declared more bytes than the payload still holds
    Truncated { needed: usize, remaining: usize },
    /// Structure the meter is not known to emit
    Unexpected { reason: String },
}

impl RecordError {
    fn truncated(needed: usize, remaining: usize, blocks: Vec<ValueBlock>) -> Self {
        Self {
            kind: RecordErrorKind::Truncated { needed, remaining },
            blocks,
        }
    }

    fn unexpected(reason: impl Into<String>, blocks: Vec<ValueBlock>) -> Self {
        Self {
            kind: RecordErrorKind::Unexpected {
                reason: reason.into(),
            },
            blocks,
        }
    }
}

/// Storage width class selected by the DIF low nibble
enum FieldWidth {
    /// Little endian unsigned integer
    Integer(usize),
    /// Known width, value coding the meter never uses (BCD, real)
    Opaque(usize),
    /// Explicit length byte precedes the data
    Variable,
    /// No data bytes at all
    Empty,
}

fn field_width(dif: u8) -> FieldWidth {
    match dif & MBUS_DATA_RECORD_DIF_MASK_DATA {
        0x00 | 0x08 => FieldWidth::Empty,
        0x01 => FieldWidth::Integer(1),
        0x02 => FieldWidth::Integer(2),
        0x03 => FieldWidth::Integer(3),
        0x04 => FieldWidth::Integer(4),
        0x05 => FieldWidth::Opaque(4), // 32-bit real
        0x06 => FieldWidth::Integer(6),
        0x07 => FieldWidth::Integer(8),
        0x09 => FieldWidth::Opaque(1), // 2-digit BCD
        0x0A => FieldWidth::Opaque(2),
        0x0B => FieldWidth::Opaque(3),
        0x0C => FieldWidth::Opaque(4),
        0x0D => FieldWidth::Variable,
        _ => FieldWidth::Opaque(6), // 0x0E, 12-digit BCD
    }
}

/// Little endian unsigned integer of up to 8 bytes.
fn decode_le_uint(data: &[u8]) -> u64 {
    data.iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Walks the self-describing record area of a full frame.
pub fn walk_records(records: &[u8]) -> Result<RecordWalk, RecordError> {
    let mut blocks: Vec<ValueBlock> = Vec::new();
    let mut partial = false;
    let mut phase: Option<u8> = None;
    let mut idx = 0usize;

    while idx < records.len() {
        let dif = records[idx];

        if dif == MBUS_DIB_DIF_IDLE_FILLER {
            idx += 1;
            continue;
        }
        if dif == MBUS_DIB_DIF_MANUFACTURER_SPECIFIC || dif == MBUS_DIB_DIF_MORE_RECORDS_FOLLOW {
            debug!("record area terminated by DIF 0x{dif:02x} at offset {idx}");
            break;
        }
        idx += 1;

        // Storage, tariff or subunit addressing never appears in these
        // telegrams, and without it a DIFE chain has no agreed width.
        if dif & MBUS_DIB_DIF_EXTENSION_BIT != 0 {
            return Err(RecordError::unexpected(
                format!("DIFE chain after DIF 0x{dif:02x}"),
                blocks,
            ));
        }
        // Remaining special function DIFs (0x3F..0x7F)
        if dif & MBUS_DATA_RECORD_DIF_MASK_DATA == 0x0F {
            return Err(RecordError::unexpected(
                format!("special function DIF 0x{dif:02x}"),
                blocks,
            ));
        }

        let Some(&vif) = records.get(idx) else {
            return Err(RecordError::truncated(1, 0, blocks));
        };
        idx += 1;

        let mut vifes: Vec<u8> = Vec::new();
        let mut more = vif & MBUS_DIB_VIF_EXTENSION_BIT != 0;
        while more {
            if vifes.len() == MBUS_MAX_EXTENSION_BYTES {
                return Err(RecordError::unexpected(
                    format!("VIFE chain longer than {MBUS_MAX_EXTENSION_BYTES} bytes"),
                    blocks,
                ));
            }
            let Some(&vife) = records.get(idx) else {
                return Err(RecordError::truncated(1, 0, blocks));
            };
            idx += 1;
            more = vife & MBUS_DIB_VIF_EXTENSION_BIT != 0;
            vifes.push(vife & MBUS_DIB_VIF_WITHOUT_EXTENSION);
        }

        // Phase markers carry no data: DIF 0x00, manufacturer VIF and
        // a single VIFE naming the phase of the following blocks.
        if dif == 0x00
            && vif & MBUS_DIB_VIF_WITHOUT_EXTENSION == MBUS_VIF_MANUFACTURER_SPECIFIC
            && vif & MBUS_DIB_VIF_EXTENSION_BIT != 0
            && matches!(vifes.as_slice(), [1..=3])
        {
            phase = Some(vifes[0]);
            debug!("phase context set to L{}", vifes[0]);
            continue;
        }

        // Only the backward flow VIFE is meaningful for this meter.
        // Any other combinable code could change the unit or scale in
        // ways the walker does not model.
        let backward = match vifes.as_slice() {
            [] => false,
            [MBUS_VIFE_BACKWARD_FLOW] => true,
            _ => {
                return Err(RecordError::unexpected(
                    format!("unsupported VIFE chain on VIF 0x{vif:02x}"),
                    blocks,
                ));
            }
        };

        match field_width(dif) {
            FieldWidth::Empty => {
                partial = true;
            }
            FieldWidth::Variable => {
                let Some(&lvar) = records.get(idx) else {
                    return Err(RecordError::truncated(1, 0, blocks));
                };
                idx += 1;
                let len = lvar as usize;
                let remaining = records.len() - idx;
                if len > remaining {
                    return Err(RecordError::truncated(len, remaining, blocks));
                }
                debug!("skipping {len} byte variable length field");
                idx += len;
                partial = true;
            }
            FieldWidth::Opaque(width) => {
                let remaining = records.len() - idx;
                if width > remaining {
                    return Err(RecordError::truncated(width, remaining, blocks));
                }
                idx += width;
                partial = true;
            }
            FieldWidth::Integer(width) => {
                let remaining = records.len() - idx;
                if width > remaining {
                    return Err(RecordError::truncated(width, remaining, blocks));
                }
                let data = &records[idx..idx + width];
                idx += width;

                match lookup_vif(vif) {
                    Some(info) => {
                        let kind = if backward {
                            info.kind.reversed()
                        } else {
                            info.kind
                        };
                        blocks.push(ValueBlock {
                            kind,
                            phase,
                            value: decode_le_uint(data),
                            unit: info.unit,
                            scale: info.scale,
                        });
                    }
                    None => {
                        debug!(
                            "skipping VIF 0x{:02x} with data {}",
                            vif & MBUS_DIB_VIF_WITHOUT_EXTENSION,
                            format_hex_compact(data)
                        );
                        partial = true;
                    }
                }
            }
        }
    }

    Ok(RecordWalk { blocks, partial })
}

/// Register bank of a compact frame, in payload order
const COMPACT_REGISTERS: [(QuantityKind, Unit, i8); 4] = [
    (QuantityKind::EnergyImport, Unit::WattHour, 1),
    (QuantityKind::EnergyExport, Unit::WattHour, 1),
    (QuantityKind::PowerImport, Unit::Watt, 0),
    (QuantityKind::PowerExport, Unit::Watt, 0),
];

/// Decodes the fixed register bank of a compact frame.
///
/// Layout after the marker: format signature (2 bytes LE), CRC of the
/// corresponding full frame (2 bytes LE), then four u32 registers.
pub fn decode_compact(records: &[u8]) -> Result<RecordWalk, RecordError> {
    if records.len() < 4 {
        return Err(RecordError::unexpected(
            "compact frame shorter than its signature and CRC prefix",
            Vec::new(),
        ));
    }

    let signature = u16::from_le_bytes([records[0], records[1]]);
    let full_crc = u16::from_le_bytes([records[2], records[3]]);
    debug!("compact frame: format signature 0x{signature:04x}, full frame CRC 0x{full_crc:04x}");

    let mut blocks = Vec::with_capacity(COMPACT_REGISTERS.len());
    let mut idx = 4usize;
    for (kind, unit, scale) in COMPACT_REGISTERS {
        let remaining = records.len() - idx;
        if remaining < 4 {
            return Err(RecordError::truncated(4, remaining, blocks));
        }
        let value = decode_le_uint(&records[idx..idx + 4]);
        idx += 4;
        blocks.push(ValueBlock {
            kind,
            phase: None,
            value,
            unit,
            scale,
        });
    }

    if records.len() > idx {
        debug!(
            "{} trailing bytes after the compact registers",
            records.len() - idx
        );
    }

    Ok(RecordWalk {
        blocks,
        partial: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hex::decode_hex;

    #[test]
    fn test_walk_full_frame_records() {
        // A+, A-, P+, P- as sent by a long telegram
        let records =
            decode_hex("780404CE00000004843C00000000042B0300000004AB3C00000000").unwrap();
        let walk = walk_records(&records[1..]).unwrap(); // skip the 0x78 marker

        assert!(!walk.partial);
        assert_eq!(walk.blocks.len(), 4);

        assert_eq!(walk.blocks[0].kind, QuantityKind::EnergyImport);
        assert_eq!(walk.blocks[0].value, 206);
        assert_eq!(walk.blocks[0].unit, Unit::WattHour);
        assert_eq!(walk.blocks[0].scale, 1);
        assert_eq!(walk.blocks[0].physical(), 2060.0);

        assert_eq!(walk.blocks[1].kind, QuantityKind::EnergyExport);
        assert_eq!(walk.blocks[1].value, 0);

        assert_eq!(walk.blocks[2].kind, QuantityKind::PowerImport);
        assert_eq!(walk.blocks[2].value, 3);
        assert_eq!(walk.blocks[2].unit, Unit::Watt);
        assert_eq!(walk.blocks[2].physical(), 3.0);

        assert_eq!(walk.blocks[3].kind, QuantityKind::PowerExport);
        assert_eq!(walk.blocks[3].value, 0);
    }

    #[test]
    fn test_walk_phase_marked_power() {
        // Phase marker for L1, then a 2-byte power value of 10 W
        let records = [0x00, 0xFF, 0x01, 0x02, 0x2B, 0x0A, 0x00];
        let walk = walk_records(&records).unwrap();

        assert!(!walk.partial);
        assert_eq!(walk.blocks.len(), 1);
        let block = &walk.blocks[0];
        assert_eq!(block.kind, QuantityKind::PowerImport);
        assert_eq!(block.phase, Some(1));
        assert_eq!(block.value, 10);
        assert_eq!(block.unit, Unit::Watt);
        assert_eq!(block.physical(), 10.0);
    }

    #[test]
    fn test_walk_phase_context_persists_and_switches() {
        let records = [
            0x00, 0xFF, 0x02, // phase L2
            0x02, 0x2B, 0x01, 0x00, // 1 W
            0x02, 0x2B, 0x02, 0x00, // 2 W, still L2
            0x00, 0xFF, 0x03, // phase L3
            0x02, 0x2B, 0x03, 0x00, // 3 W
        ];
        let walk = walk_records(&records).unwrap();
        let phases: Vec<_> = walk.blocks.iter().map(|b| b.phase).collect();
        assert_eq!(phases, vec![Some(2), Some(2), Some(3)]);
    }

    #[test]
    fn test_walk_skips_idle_filler() {
        let records = [0x2F, 0x2F, 0x02, 0x2B, 0x0A, 0x00, 0x2F];
        let walk = walk_records(&records).unwrap();
        assert_eq!(walk.blocks.len(), 1);
        assert!(!walk.partial);
    }

    #[test]
    fn test_walk_stops_at_terminators() {
        // 0x1F: rest of the data comes in another telegram
        let records = [0x02, 0x2B, 0x0A, 0x00, 0x1F, 0xDE, 0xAD];
        let walk = walk_records(&records).unwrap();
        assert_eq!(walk.blocks.len(), 1);
        assert!(!walk.partial);

        // 0x0F: manufacturer specific remainder
        let records = [0x02, 0x2B, 0x0A, 0x00, 0x0F, 0xDE, 0xAD];
        let walk = walk_records(&records).unwrap();
        assert_eq!(walk.blocks.len(), 1);
        assert!(!walk.partial);
    }

    #[test]
    fn test_walk_skips_unknown_vif() {
        // Volume in the middle, energy after it
        let records = [
            0x04, 0x13, 0x01, 0x00, 0x00, 0x00, // volume, not modeled
            0x04, 0x04, 0xCE, 0x00, 0x00, 0x00, // energy import
        ];
        let walk = walk_records(&records).unwrap();
        assert!(walk.partial);
        assert_eq!(walk.blocks.len(), 1);
        assert_eq!(walk.blocks[0].kind, QuantityKind::EnergyImport);
    }

    #[test]
    fn test_walk_skips_opaque_codings() {
        // 4-byte BCD, then 32-bit real, then a good power block
        let records = [
            0x0C, 0x04, 0x99, 0x99, 0x99, 0x99, //
            0x05, 0x2B, 0x00, 0x00, 0x80, 0x3F, //
            0x02, 0x2B, 0x0A, 0x00,
        ];
        let walk = walk_records(&records).unwrap();
        assert!(walk.partial);
        assert_eq!(walk.blocks.len(), 1);
        assert_eq!(walk.blocks[0].value, 10);
    }

    #[test]
    fn test_walk_skips_variable_length_field() {
        let records = [
            0x0D, 0xFD, 0x10, 0x03, b'a', b'b', b'c', // LVAR of 3 bytes
            0x02, 0x2B, 0x0A, 0x00,
        ];
        // VIF 0xFD opens a second extension table, which the walker
        // does not model past the skip
        let err = walk_records(&records).unwrap_err();
        assert!(matches!(err.kind, RecordErrorKind::Unexpected { .. }));

        // plain LVAR under an unknown primary VIF is skippable
        let records = [
            0x0D, 0x78, 0x03, b'a', b'b', b'c', // fabrication number string
            0x02, 0x2B, 0x0A, 0x00,
        ];
        let walk = walk_records(&records).unwrap();
        assert!(walk.partial);
        assert_eq!(walk.blocks.len(), 1);
    }

    #[test]
    fn test_walk_wide_integers() {
        let mut records = vec![0x07, 0x04];
        records.extend_from_slice(&0x0102_0304_0506_0708u64.to_le_bytes());
        records.extend_from_slice(&[0x03, 0x2B, 0x01, 0x02, 0x03]);

        let walk = walk_records(&records).unwrap();
        assert_eq!(walk.blocks[0].value, 0x0102_0304_0506_0708);
        assert_eq!(walk.blocks[1].value, 0x0003_0201);
    }

    #[test]
    fn test_walk_rejects_dife() {
        let records = [0x01, 0x2B, 0x0A, 0x84, 0x10, 0x04, 0xCE, 0x00, 0x00, 0x00];
        let err = walk_records(&records).unwrap_err();
        assert!(matches!(err.kind, RecordErrorKind::Unexpected { .. }));
        // the block before the fault is preserved
        assert_eq!(err.blocks.len(), 1);
        assert_eq!(err.blocks[0].value, 0x0A);
    }

    #[test]
    fn test_walk_rejects_unknown_vife_chain() {
        // energy with a "per hour" VIFE the walker does not model
        let records = [0x04, 0x84, 0x22, 0xCE, 0x00, 0x00, 0x00];
        let err = walk_records(&records).unwrap_err();
        match err.kind {
            RecordErrorKind::Unexpected { reason } => {
                assert!(reason.contains("VIFE"), "reason was: {reason}")
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_walk_rejects_runaway_extension_chain() {
        let mut records = vec![0x04, 0x84];
        records.extend_from_slice(&[0x80; 10]);
        let err = walk_records(&records).unwrap_err();
        assert!(matches!(err.kind, RecordErrorKind::Unexpected { .. }));
    }

    #[test]
    fn test_walk_truncation() {
        // value cut short
        let err = walk_records(&[0x04, 0x04, 0xCE, 0x00]).unwrap_err();
        assert_eq!(
            err.kind,
            RecordErrorKind::Truncated {
                needed: 4,
                remaining: 2
            }
        );

        // VIF missing entirely
        let err = walk_records(&[0x04]).unwrap_err();
        assert_eq!(
            err.kind,
            RecordErrorKind::Truncated {
                needed: 1,
                remaining: 0
            }
        );
    }

    #[test]
    fn test_walk_empty_area() {
        let walk = walk_records(&[]).unwrap();
        assert!(walk.blocks.is_empty());
        assert!(!walk.partial);
    }

    #[test]
    fn test_compact_golden_registers() {
        let records = decode_hex("138C4491CE000000000000000300000000000000").unwrap();
        let walk = decode_compact(&records).unwrap();

        assert!(!walk.partial);
        assert_eq!(walk.blocks.len(), 4);
        assert_eq!(walk.blocks[0].kind, QuantityKind::EnergyImport);
        assert_eq!(walk.blocks[0].physical(), 2060.0);
        assert_eq!(walk.blocks[1].value, 0);
        assert_eq!(walk.blocks[2].physical(), 3.0);
        assert_eq!(walk.blocks[3].value, 0);
        assert!(walk.blocks.iter().all(|b| b.phase.is_none()));
    }

    #[test]
    fn test_compact_short_prefix() {
        let err = decode_compact(&[0x13, 0x8C, 0x44]).unwrap_err();
        assert!(matches!(err.kind, RecordErrorKind::Unexpected { .. }));
        assert!(err.blocks.is_empty());
    }

    #[test]
    fn test_compact_truncated_registers() {
        let records = decode_hex("138C4491CE000000000000").unwrap();
        let err = decode_compact(&records).unwrap_err();
        assert_eq!(
            err.kind,
            RecordErrorKind::Truncated {
                needed: 4,
                remaining: 3
            }
        );
        // the first register made it out
        assert_eq!(err.blocks.len(), 1);
        assert_eq!(err.blocks[0].value, 206);
    }
}
