#![no_main]

use libfuzzer_sys::fuzz_target;
use omnipower_rs::{DeviceFilter, WMBusFrame};

fuzz_target!(|data: &[u8]| {
    // The parser and the identity peek must never panic on radio noise
    let _ = WMBusFrame::parse(data);
    let _ = DeviceFilter::omnipower().matches_bytes(data);

    // Force the L field to be consistent so the deeper field
    // extraction gets exercised too
    if data.len() >= 19 && data.len() <= 255 {
        let mut sized = data.to_vec();
        sized[0] = (sized.len() - 3) as u8;
        if let Ok(frame) = WMBusFrame::parse(&sized) {
            let header = frame.header();
            let _ = header.manufacturer_code();
            let _ = header.sn_encryption_mode();
            let _ = WMBusFrame::build(header, frame.ciphertext());
        }
    }
});
