//! Decoding of decrypted payloads into value blocks
//!
//! The payload starts with its own CRC and a frame-type marker; the
//! marker selects between the fixed compact layout and the
//! self-describing full layout. [`decode_blocks`] dispatches on it.

use log::debug;

use crate::constants::{TPL_CI_COMPACT_FRAME, TPL_CI_FULL_FRAME};

pub mod record;
pub mod vif;

pub use record::{
    decode_compact, walk_records, RecordError, RecordErrorKind, RecordWalk, ValueBlock,
};
pub use vif::{lookup_vif, QuantityKind, Unit, VifInfo};

/// Decodes a whole plaintext payload (CRC, marker, records) into value
/// blocks.
///
/// The payload CRC is assumed to be verified already; this function
/// only dispatches on the marker and walks the records.
pub fn decode_blocks(plaintext: &[u8]) -> Result<RecordWalk, RecordError> {
    if plaintext.len() < 3 {
        return Err(RecordError {
            kind: RecordErrorKind::Unexpected {
                reason: "payload shorter than its CRC and frame-type marker".to_string(),
            },
            blocks: Vec::new(),
        });
    }

    let marker = plaintext[2];
    let records = &plaintext[3..];
    match marker {
        TPL_CI_COMPACT_FRAME => decode_compact(records),
        TPL_CI_FULL_FRAME => {
            let walk = walk_records(records)?;
            if walk.blocks.is_empty() {
                debug!("full frame walk produced no value blocks");
                return Err(RecordError {
                    kind: RecordErrorKind::Unexpected {
                        reason: "no recognizable value blocks in the record area".to_string(),
                    },
                    blocks: Vec::new(),
                });
            }
            Ok(walk)
        }
        other => Err(RecordError {
            kind: RecordErrorKind::Unexpected {
                reason: format!("unknown frame-type marker 0x{other:02x}"),
            },
            blocks: Vec::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hex::decode_hex;

    #[test]
    fn test_dispatch_on_marker() {
        // CRC bytes are not re-checked here, zeros are fine
        let compact =
            decode_hex("000079138C4491CE000000000000000300000000000000").unwrap();
        let walk = decode_blocks(&compact).unwrap();
        assert_eq!(walk.blocks.len(), 4);

        let full = decode_hex("000078042B03000000").unwrap();
        let walk = decode_blocks(&full).unwrap();
        assert_eq!(walk.blocks.len(), 1);
        assert_eq!(walk.blocks[0].kind, QuantityKind::PowerImport);
    }

    #[test]
    fn test_rejects_unknown_marker() {
        let err = decode_blocks(&[0x00, 0x00, 0x72, 0x01, 0x02]).unwrap_err();
        assert!(matches!(err.kind, RecordErrorKind::Unexpected { .. }));
    }

    #[test]
    fn test_rejects_short_payload() {
        let err = decode_blocks(&[0x00, 0x00]).unwrap_err();
        assert!(matches!(err.kind, RecordErrorKind::Unexpected { .. }));
    }

    #[test]
    fn test_rejects_full_frame_without_blocks() {
        // only skippable content behind the marker
        let err = decode_blocks(&[0x00, 0x00, 0x78, 0x2F, 0x2F, 0x2F]).unwrap_err();
        match err.kind {
            RecordErrorKind::Unexpected { reason } => {
                assert!(reason.contains("no recognizable"), "reason was: {reason}")
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
