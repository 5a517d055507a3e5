//! Wire-contract properties for agreements and proofs.
//!
//! These tests treat:
//! - the **canonical encoding** as the identifier preimage, so equal field
//!   values must always hash to the same identifier, and
//! - **parse** as the inverse of serialize for every valid value.

use proptest::prelude::*;
use vidproof_core::{Agreement, Error, ProofKind, SlaId, ZkMerkleProof, PROOF_LEN};

fn proof_kind() -> impl Strategy<Value = ProofKind> {
    prop_oneof![
        Just(ProofKind::PhashMerkleZksnark),
        Just(ProofKind::SsimMerkleZksnark)
    ]
}

fn agreement() -> impl Strategy<Value = Agreement> {
    (any::<String>(), proof_kind(), any::<String>())
        .prop_map(|(url, kind, inputs)| Agreement::new(url, kind, inputs))
}

proptest! {
    #[test]
    fn agreement_roundtrips(a in agreement()) {
        let bytes = a.to_canonical_bytes().unwrap();
        prop_assert_eq!(Agreement::parse(&bytes).unwrap(), a);
    }

    #[test]
    fn identifier_is_a_function_of_field_values(a in agreement()) {
        let copy = Agreement::new(a.source_locator.clone(), a.proof_kind, a.public_inputs.clone());
        prop_assert_eq!(a.identifier().unwrap(), copy.identifier().unwrap());
        // Re-parsing and re-encoding never changes the identifier.
        let reparsed = Agreement::parse(&a.to_canonical_bytes().unwrap()).unwrap();
        prop_assert_eq!(reparsed.identifier().unwrap(), a.identifier().unwrap());
    }

    #[test]
    fn changing_a_field_changes_the_identifier(a in agreement(), extra in "[a-z]{1,8}") {
        let mut b = a.clone();
        b.public_inputs.push_str(&extra);
        prop_assert_ne!(a.identifier().unwrap(), b.identifier().unwrap());
    }

    #[test]
    fn proof_roundtrips(blob in proptest::collection::vec(any::<u8>(), 0..512)) {
        let p = ZkMerkleProof::new(blob);
        let json = p.to_json().unwrap();
        prop_assert_eq!(ZkMerkleProof::parse(json.as_bytes()).unwrap(), p);
    }
}

/// The identifier of a fixed agreement is pinned, across runs and processes.
#[test]
fn identifier_is_pinned() {
    let a = Agreement::new("/a.mp4", ProofKind::PhashMerkleZksnark, "X");
    assert_eq!(
        a.identifier().unwrap().as_str(),
        "TPsE0_wUvQHGYKJiZtDrSlmLl0qRrtWgaklHsqj3qSE="
    );

    let scenario_a = Agreement::new("out.ts", ProofKind::PhashMerkleZksnark, "C1");
    let id = scenario_a.identifier().unwrap();
    assert_eq!(id.as_str(), "fTzQzun5B3ZMZFaTepU0IRtqXDoYc8rWdS4199JZsZU=");
    assert_eq!(SlaId::derive(&scenario_a.to_canonical_bytes().unwrap()), id);
}

#[test]
fn schema_violations_are_typed() {
    assert!(matches!(
        Agreement::parse(br#"{"Url":"x"}"#),
        Err(Error::MalformedAgreement(_))
    ));
    assert!(matches!(
        Agreement::parse(b"not json"),
        Err(Error::MalformedAgreement(_))
    ));
    assert!(matches!(
        ZkMerkleProof::parse(br#"{"proof": 123}"#),
        Err(Error::MalformedProof(_))
    ));
}

#[test]
fn full_size_proof_json() {
    let p = ZkMerkleProof::new(vec![0xAA; PROOF_LEN]);
    let expected = format!(r#"{{"proof":"{}"}}"#, "q".repeat(256));
    assert_eq!(p.to_json().unwrap(), expected);
}
