#![no_main]
use libfuzzer_sys::fuzz_target;
use vidproof_core::{Agreement, SlaId, ZkMerkleProof, ZkPublicInput};

fuzz_target!(|data: &[u8]| {
    // Anything that parses must re-encode to a stable identifier.
    if let Ok(a) = Agreement::parse(data) {
        let bytes = a.to_canonical_bytes().unwrap();
        let again = Agreement::parse(&bytes).unwrap();
        assert_eq!(again.identifier().unwrap(), SlaId::derive(&bytes));
    }
    if let Ok(p) = ZkMerkleProof::parse(data) {
        assert_eq!(ZkMerkleProof::parse(p.to_json().unwrap().as_bytes()).unwrap(), p);
    }
    let _ = ZkPublicInput::parse(data);
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = s.parse::<SlaId>();
    }
});
