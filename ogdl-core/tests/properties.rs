//! Property-based tests for structural invariants.
//!
//! These must hold for ANY input, not just crafted examples; proptest
//! generates and shrinks the counterexamples.

use ogdl_core::binary::encode_varint;
use ogdl_core::{EventHandler, Graph};
use proptest::prelude::*;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 200,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    }
}

// =============================================================================
// Varints
// =============================================================================

proptest! {
    #![proptest_config(config())]

    /// decode(encode(n)) == n, and the width is ceil(log128(n+1)) bytes
    /// (one byte for zero).
    #[test]
    fn varint_round_trip_and_width(n in any::<u64>()) {
        let mut buf = Vec::new();
        encode_varint(n, &mut buf);

        let expected = if n == 0 {
            1
        } else {
            (64 - n.leading_zeros() as usize).div_ceil(7)
        };
        prop_assert_eq!(buf.len(), expected);

        let mut decoded: u64 = 0;
        let mut shift = 0;
        for &b in &buf {
            decoded |= u64::from(b & 0x7f) << shift;
            shift += 7;
        }
        prop_assert_eq!(decoded, n);
    }
}

// =============================================================================
// Parser robustness
// =============================================================================

proptest! {
    #![proptest_config(config())]

    /// The parser must never panic, whatever the input. Errors are fine.
    #[test]
    fn parser_never_panics(input in prop::collection::vec(any::<u8>(), 0..600)) {
        let text = String::from_utf8_lossy(&input);
        let _ = Graph::parse(&text);
    }

    /// Same, over inputs biased toward the grammar's special characters.
    #[test]
    fn parser_never_panics_on_grammar_chars(
        input in "[a-z0-9(),.#'\"\\\\ \t\n$\\[\\]{}<>=+*/%&|!-]{0,300}"
    ) {
        let _ = Graph::parse(&input);
        let _ = Graph::parse_path(&input);
        let _ = Graph::parse_expression(&input);
        let _ = ogdl_core::parse_template(&input);
    }

    /// The event sink tolerates any op sequence without panicking and
    /// always hands back a tree.
    #[test]
    fn event_sink_accepts_any_op_sequence(ops in prop::collection::vec(0u8..5, 0..80)) {
        let mut ev = EventHandler::new();
        for (i, op) in ops.iter().enumerate() {
            match op {
                0 => ev.add(format!("n{i}").as_str()),
                1 => ev.inc(),
                2 => ev.dec(),
                3 => ev.set_level(i % 7),
                _ => ev.delete(),
            }
        }
        let _ = ev.finish();
    }
}

// =============================================================================
// Round-trips over generated trees
// =============================================================================

fn arb_tree(depth: u32) -> impl Strategy<Value = Graph> {
    let leaf = "[a-z][a-z0-9_]{0,7}".prop_map(|s| Graph::new(s.as_str()));
    leaf.prop_recursive(depth, 24, 4, |inner| {
        ("[a-z][a-z0-9_]{0,7}", prop::collection::vec(inner, 0..4)).prop_map(
            |(payload, children)| {
                let mut g = Graph::new(payload.as_str());
                g.children = children;
                g
            },
        )
    })
}

fn arb_doc() -> impl Strategy<Value = Graph> {
    prop::collection::vec(arb_tree(3), 0..4).prop_map(|children| {
        let mut root = Graph::nil();
        root.children = children;
        root
    })
}

proptest! {
    #![proptest_config(config())]

    /// parse(canonical_text(T)) == T.
    #[test]
    fn canonical_text_round_trip(doc in arb_doc()) {
        let text = doc.text();
        let parsed = Graph::parse(&text).unwrap();
        prop_assert_eq!(parsed, doc);
    }

    /// decode(encode(T)) == T.
    #[test]
    fn binary_round_trip(doc in arb_doc()) {
        let bytes = doc.to_binary().unwrap();
        let decoded = Graph::from_binary(&bytes).unwrap();
        prop_assert_eq!(decoded, doc);
    }

    /// Rendering a `$`-free template returns the input bytes verbatim.
    #[test]
    fn template_identity_on_literal_text(text in "[a-zA-Z0-9 .,;:()\\n\t-]{0,200}") {
        let t = ogdl_core::parse_template(&text).unwrap();
        let mut ctx = Graph::nil();
        let out = ogdl_core::process(&t, &mut ctx);
        prop_assert_eq!(out, text.into_bytes());
    }
}
