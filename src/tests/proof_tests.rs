// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::KernelError;
use crate::proof::{canonical_signers, leaf_hash, verify_inclusion, MerkleProof, MerkleTree};

fn personas(n: usize) -> Vec<(String, Vec<u8>)> {
    (0..n)
        .map(|i| {
            let signers = vec![vec![i as u8; 32], vec![0xff; 32]];
            (format!("persona-{}", i), canonical_signers(&signers).unwrap())
        })
        .collect()
}

#[test]
fn test_every_leaf_proves_against_root() {
    for n in [1usize, 2, 3, 5, 8, 13] {
        let entries = personas(n);
        let tree = MerkleTree::new(&entries);
        let root = tree.root().unwrap();
        for (i, (k, v)) in entries.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            verify_inclusion(&root, k.as_bytes(), v, &proof)
                .unwrap_or_else(|_| panic!("leaf {} of {} failed", i, n));
        }
    }
}

#[test]
fn test_wrong_value_rejected() {
    let entries = personas(5);
    let tree = MerkleTree::new(&entries);
    let root = tree.root().unwrap();
    let proof = tree.proof(2).unwrap();

    let forged = canonical_signers(&[vec![0x42; 32]]).unwrap();
    assert_eq!(
        verify_inclusion(&root, b"persona-2", &forged, &proof),
        Err(KernelError::ProofRejected)
    );
    // Right value, wrong key.
    assert!(verify_inclusion(&root, b"persona-3", &entries[2].1, &proof).is_err());
}

#[test]
fn test_single_leaf_tree() {
    let entries = personas(1);
    let tree = MerkleTree::new(&entries);
    assert_eq!(tree.root(), Some(leaf_hash(entries[0].0.as_bytes(), &entries[0].1)));
    assert_eq!(tree.proof(0).unwrap(), MerkleProof::default());
    assert!(tree.proof(1).is_none());
}

#[test]
fn test_empty_tree_has_no_root() {
    let tree = MerkleTree::new::<&[u8], &[u8]>(&[]);
    assert!(tree.is_empty());
    assert!(tree.root().is_none());
}

#[test]
fn test_leaf_encoding_is_length_delimited() {
    // "ab" + "c" must not collide with "a" + "bc".
    assert_ne!(leaf_hash(b"ab", b"c"), leaf_hash(b"a", b"bc"));
}
