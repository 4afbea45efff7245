use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::{keccak256, B256};
use mpt_trie::{
    verify_proof, ErrorKind, ExpectedValue, Hasher, MemoryDB, PatriciaTrie, ProofVerifier,
    RlpCodec, TrieConfig, EMPTY_ROOT,
};
use proptest::prelude::*;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

fn build(entries: &[(Vec<u8>, Vec<u8>)]) -> PatriciaTrie {
    let mut trie = PatriciaTrie::new_memory();
    for (key, value) in entries {
        trie.insert(key, value.clone()).unwrap();
    }
    trie
}

fn entries() -> impl Strategy<Value = BTreeMap<Vec<u8>, Vec<u8>>> {
    prop::collection::btree_map(
        prop::collection::vec(any::<u8>(), 1..8),
        prop::collection::vec(any::<u8>(), 1..40),
        1..40,
    )
}

proptest! {
    #[test]
    fn root_ignores_insertion_order(map in entries()) {
        let forward: Vec<_> = map.clone().into_iter().collect();
        let backward: Vec<_> = forward.iter().rev().cloned().collect();

        prop_assert_eq!(build(&forward).root_hash(), build(&backward).root_hash());
    }

    #[test]
    fn every_value_reads_back(map in entries()) {
        let pairs: Vec<_> = map.clone().into_iter().collect();
        let trie = build(&pairs);

        for (key, value) in &map {
            prop_assert_eq!(trie.get(key).unwrap(), Some(value.clone()));
        }
    }

    #[test]
    fn inclusion_proofs_verify(map in entries()) {
        let pairs: Vec<_> = map.clone().into_iter().collect();
        let trie = build(&pairs);
        let root = trie.root_hash();

        for (key, value) in &map {
            let proof = trie.get_proof(key).unwrap();
            let proven = verify_proof(root, key, &proof, ExpectedValue::Value(value)).unwrap();
            prop_assert_eq!(proven.as_ref(), Some(value));

            let mut other = value.clone();
            other.push(0);
            let err = verify_proof(root, key, &proof, ExpectedValue::Value(&other)).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::UnexpectedValue);

            let err = verify_proof(root, key, &proof, ExpectedValue::Absent).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::UnexpectedExistence);
        }
    }

    #[test]
    fn exclusion_proofs_verify(map in entries(), absent in prop::collection::vec(any::<u8>(), 1..8)) {
        prop_assume!(!map.contains_key(&absent));

        let pairs: Vec<_> = map.into_iter().collect();
        let trie = build(&pairs);
        let root = trie.root_hash();

        let proof = trie.get_proof(&absent).unwrap();
        prop_assert_eq!(verify_proof(root, &absent, &proof, ExpectedValue::Absent).unwrap(), None);
        prop_assert_eq!(verify_proof(root, &absent, &proof, ExpectedValue::Any).unwrap(), None);
        prop_assert!(verify_proof(root, &absent, &proof, ExpectedValue::Value(b"x")).is_err());
    }

    #[test]
    fn tampered_proofs_are_rejected(map in entries(), pick in any::<prop::sample::Index>(), at in any::<prop::sample::Index>(), flip in 1u8..=255) {
        let pairs: Vec<_> = map.into_iter().collect();
        let trie = build(&pairs);
        let (key, value) = pick.get(&pairs);

        let mut proof = trie.get_proof(key).unwrap();
        let index = at.index(proof.len());
        let pos = at.index(proof[index].len());
        proof[index][pos] ^= flip;

        let err = verify_proof(trie.root_hash(), key, &proof, ExpectedValue::Value(value)).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::ProofHashMismatch);
        let expected_index = index.to_string();
        prop_assert_eq!(err.context_value("node_index"), Some(expected_index.as_str()));
    }
}

#[test]
fn empty_trie_root() {
    let trie = PatriciaTrie::new_memory();
    assert_eq!(trie.root_hash(), EMPTY_ROOT);
    assert_eq!(EMPTY_ROOT, keccak256([0x80]));
}

#[test]
fn shuffled_insertion_same_root() {
    let pairs: Vec<(Vec<u8>, Vec<u8>)> = (0u32..200)
        .map(|i| (format!("account-{}", i * 7919).into_bytes(), i.to_be_bytes().to_vec()))
        .collect();

    let expected = build(&pairs).root_hash();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..5 {
        let mut shuffled = pairs.clone();
        shuffled.shuffle(&mut rng);
        assert_eq!(build(&shuffled).root_hash(), expected);
    }
}

#[test]
fn ethereum_vectors() {
    let cases: [(&[(&str, &str)], &str); 2] = [
        (
            &[("doe", "reindeer"), ("dog", "puppy"), ("dogglesworth", "cat")],
            "8aad789dff2f538bca5d8ea56e8abe10f4c7ba3a5dea95fea4cd6e7c3a1168d3",
        ),
        (
            &[("do", "verb"), ("horse", "stallion"), ("doge", "coin"), ("dog", "puppy")],
            "5991bb8c6514148a29db676a14ac506cd2cd5775ace63c30a4fe457715e9ac84",
        ),
    ];

    for (vector, root) in cases {
        let pairs: Vec<_> = vector
            .iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
            .collect();
        let trie = build(&pairs);
        assert_eq!(trie.root_hash(), root.parse::<B256>().unwrap());

        for (key, value) in &pairs {
            let proof = trie.get_proof(key).unwrap();
            verify_proof(trie.root_hash(), key, &proof, ExpectedValue::Value(value)).unwrap();
        }
    }
}

#[test]
fn historical_roots_share_storage() {
    let db = Arc::new(MemoryDB::new());
    let mut trie = PatriciaTrie::new(Arc::clone(&db));

    let mut roots = Vec::new();
    for i in 0u8..10 {
        roots.push(trie.insert(b"counter", vec![i]).unwrap());
    }

    for (i, root) in roots.iter().enumerate() {
        let snapshot = PatriciaTrie::with_config(Some(*root), TrieConfig::with_db(Arc::clone(&db)));
        assert_eq!(snapshot.get(b"counter").unwrap(), Some(vec![i as u8]));
    }
}

#[test]
fn concurrent_readers() {
    let mut trie = PatriciaTrie::new_memory();
    for i in 0u32..64 {
        trie.insert(&i.to_be_bytes(), vec![i as u8; 33]).unwrap();
    }

    std::thread::scope(|scope| {
        for chunk in 0u32..4 {
            let trie = &trie;
            scope.spawn(move || {
                for i in (chunk * 16)..(chunk * 16 + 16) {
                    assert_eq!(trie.get(&i.to_be_bytes()).unwrap(), Some(vec![i as u8; 33]));
                }
            });
        }
    });
}

/// keccak256 applied twice, standing in for a non-default hash function
#[derive(Debug, Clone, Copy, Default)]
struct DoubleKeccak;

impl Hasher for DoubleKeccak {
    fn hash(&self, data: &[u8]) -> B256 {
        keccak256(keccak256(data))
    }
}

#[test]
fn custom_hasher() {
    let config = TrieConfig {
        db: Arc::new(MemoryDB::new()),
        codec: RlpCodec,
        hasher: DoubleKeccak,
    };
    let mut trie = PatriciaTrie::with_config(None, config);
    assert_eq!(trie.empty_root(), keccak256(EMPTY_ROOT));
    assert!(trie.is_empty());

    for i in 0u8..30 {
        trie.insert(&[i, 0xff], vec![i; 50]).unwrap();
    }

    let root = trie.root_hash();
    let proof = trie.get_proof(&[5, 0xff]).unwrap();
    let verifier = ProofVerifier::new(RlpCodec, DoubleKeccak);
    assert_eq!(
        verifier.verify(root, &[5, 0xff], &proof, ExpectedValue::Any).unwrap(),
        Some(vec![5; 50])
    );

    let err = verify_proof(root, &[5, 0xff], &proof, ExpectedValue::Any).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProofHashMismatch);

    let historical = trie.for_root(root);
    assert_eq!(historical.get(&[29, 0xff]).unwrap(), Some(vec![29; 50]));
}
