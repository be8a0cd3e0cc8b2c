#![no_main]

use libfuzzer_sys::fuzz_target;
use omnipower_rs::payload::{decode_blocks, walk_records};

fuzz_target!(|data: &[u8]| {
    // The walker must stay total over arbitrary record areas
    let _ = walk_records(data);

    // Same bytes behind each frame-type marker
    for marker in [0x78u8, 0x79, 0x00] {
        let mut plaintext = vec![0x00, 0x00, marker];
        plaintext.extend_from_slice(data);
        let _ = decode_blocks(&plaintext);
    }
});
