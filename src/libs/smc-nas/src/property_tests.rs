//! Property-Based Tests for the Security Mode Command mutation engine

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use smc_testcase::{OffsetPatch, Testcase};

    use crate::layout::MutationLayout;
    use crate::mutate::{mutate_message, to_hex};

    // ========================================================================
    // Strategies
    // ========================================================================

    /// Captured messages long enough to carry the algorithm nibbles
    fn arb_message() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 11..128)
    }

    fn arb_hex_digit() -> impl Strategy<Value = char> {
        prop::sample::select("0123456789abcdef".chars().collect::<Vec<_>>())
    }

    fn arb_hex_string(max: usize) -> impl Strategy<Value = String> {
        prop::collection::vec(arb_hex_digit(), 1..max).prop_map(|v| v.into_iter().collect())
    }

    /// Testcases whose patches all fit inside a message of `min_len` bytes
    fn arb_testcase(min_len: usize) -> impl Strategy<Value = Testcase> {
        let nibbles = min_len * 2;
        (
            any::<u32>(),
            prop::option::of(arb_hex_digit()),
            prop::option::of(arb_hex_digit()),
            prop::option::of(prop::collection::vec(arb_hex_digit(), 8)),
            prop::collection::vec((0..nibbles - 4, arb_hex_string(4)), 0..6),
        )
            .prop_map(|(id, ciphering, integrity, mac, offsets)| Testcase {
                id,
                ciphering: ciphering.map(String::from),
                integrity: integrity.map(String::from),
                mac: mac.map(|m| m.into_iter().collect()),
                offsets: offsets
                    .into_iter()
                    .map(|(offset, value)| OffsetPatch::new(offset, value))
                    .collect(),
                ..Testcase::new(id, 93, false)
            })
    }

    proptest! {
        #[test]
        fn prop_no_overrides_is_identity(msg in arb_message(), id in any::<u32>()) {
            let tc = Testcase::new(id, 93, true);
            let out = mutate_message(&msg, &tc, &MutationLayout::default()).unwrap();
            prop_assert_eq!(out, msg);
        }

        #[test]
        fn prop_mutation_is_deterministic(msg in arb_message(), tc in arb_testcase(11)) {
            let layout = MutationLayout::default();
            let first = mutate_message(&msg, &tc, &layout).unwrap();
            let second = mutate_message(&msg, &tc, &layout).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_mutation_preserves_length(msg in arb_message(), tc in arb_testcase(11)) {
            let out = mutate_message(&msg, &tc, &MutationLayout::default()).unwrap();
            prop_assert_eq!(out.len(), msg.len());
        }

        #[test]
        fn prop_mac_override_lands_at_nibble_four(
            msg in arb_message(),
            mac in prop::collection::vec(arb_hex_digit(), 8),
        ) {
            let mac: String = mac.into_iter().collect();
            let tc = Testcase::new(1, 93, false).with_mac(mac.clone());
            let out = mutate_message(&msg, &tc, &MutationLayout::default()).unwrap();
            let hex_out = to_hex(&out);
            let hex_in = to_hex(&msg);
            prop_assert_eq!(&hex_out[4..12], mac.as_str());
            prop_assert_eq!(&hex_out[..4], &hex_in[..4]);
            prop_assert_eq!(&hex_out[12..], &hex_in[12..]);
        }

        #[test]
        fn prop_later_offset_wins(
            msg in arb_message(),
            start in 0usize..20,
            first in arb_hex_string(3),
            second in arb_hex_string(3),
        ) {
            let tc = Testcase::new(1, 93, false)
                .with_offset(start, first)
                .with_offset(start, second.clone());
            let out = mutate_message(&msg, &tc, &MutationLayout::default()).unwrap();
            let hex_out = to_hex(&out);
            prop_assert_eq!(&hex_out[start..start + second.len()], second.as_str());
        }

        #[test]
        fn prop_out_of_range_offset_rejected(msg in arb_message(), extra in 1usize..16) {
            let start = msg.len() * 2 - 1 + extra;
            let tc = Testcase::new(1, 93, false).with_offset(start, "0");
            let err = mutate_message(&msg, &tc, &MutationLayout::default()).unwrap_err();
            prop_assert!(err.is_malformed_testcase());
        }

        #[test]
        fn prop_hex_round_trip(msg in arb_message()) {
            let decoded = hex::decode(to_hex(&msg)).unwrap();
            prop_assert_eq!(decoded, msg);
        }
    }
}
