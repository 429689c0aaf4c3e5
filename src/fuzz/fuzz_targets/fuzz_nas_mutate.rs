//! NAS Mutation Fuzzer
//!
//! Feeds arbitrary messages and arbitrary testcase overrides through the
//! Security Mode Command mutation engine. The engine must either return a
//! message of the input's length or a typed error; it must never panic.
//!
//! Input layout: `[flags, ciphering, integrity, n_offsets, (offset, len)*, mac(4), message...]`
//!
//! Run with: cargo +nightly fuzz run fuzz_nas_mutate

#![no_main]

use libfuzzer_sys::fuzz_target;
use smc_nas::{mutate_message, to_hex, MutationLayout};
use smc_testcase::Testcase;

const HEX: &[u8; 22] = b"0123456789abcdefABCDxz";

fn hex_char(b: u8) -> char {
    HEX[b as usize % HEX.len()] as char
}

fn hex_text(bytes: &[u8]) -> String {
    bytes.iter().map(|b| hex_char(*b)).collect()
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let flags = data[0];
    let mut tc = Testcase::new(1, 93, flags & 0x01 != 0);
    if flags & 0x02 != 0 {
        tc.ciphering = Some(hex_char(data[1]).to_string());
    }
    if flags & 0x04 != 0 {
        tc.integrity = Some(hex_char(data[2]).to_string());
    }

    let n_offsets = (data[3] % 8) as usize;
    let mut rest = &data[4..];
    for _ in 0..n_offsets {
        if rest.len() < 2 {
            break;
        }
        let offset = rest[0] as usize;
        let len = (rest[1] % 9) as usize;
        rest = &rest[2..];
        let take = len.min(rest.len());
        tc.offsets.push(smc_testcase::OffsetPatch::new(offset, hex_text(&rest[..take])));
        rest = &rest[take..];
    }

    if flags & 0x08 != 0 && rest.len() >= 4 {
        tc.mac = Some(to_hex(&rest[..4]));
        rest = &rest[4..];
    }

    let message = &rest[..rest.len().min(1024)];
    if let Ok(out) = mutate_message(message, &tc, &MutationLayout::default()) {
        assert_eq!(out.len(), message.len());
    }
});
