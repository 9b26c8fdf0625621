//! # SHA-256 and Keccak-256 hashing
//!
//! SHA-256 is the protocol hash: operation ids, custody links, bundle
//! integrity, Merkle roots. Keccak-256 appears only for external-chain
//! Patricia tries, where trie node keys are the hashes themselves.

use sha2::{Digest, Sha256};
use sha3::Keccak256;
use shared_types::Hash32;

/// SHA-256 of a byte slice.
pub fn sha256(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Hash32::from_bytes(hasher.finalize().into())
}

/// SHA-256 over the concatenation of several byte slices.
pub fn sha256_concat(parts: &[&[u8]]) -> Hash32 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash32::from_bytes(hasher.finalize().into())
}

/// Keccak-256 of a byte slice (trie node keys).
pub fn keccak256(data: &[u8]) -> Hash32 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    Hash32::from_bytes(hasher.finalize().into())
}

/// Merkle root over ordered leaf hashes.
///
/// Pairs are combined as `SHA256(left ‖ right)`; an odd node at the end of a
/// level is carried up unchanged. The root of an empty leaf set is the zero
/// hash, and a single leaf is its own root.
pub fn merkle_root(leaves: &[Hash32]) -> Hash32 {
    if leaves.is_empty() {
        return Hash32::ZERO;
    }
    let mut level: Vec<Hash32> = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match pair {
                [left, right] => {
                    next.push(sha256_concat(&[left.as_bytes(), right.as_bytes()]))
                }
                [odd] => next.push(*odd),
                _ => unreachable!(),
            }
        }
        level = next;
    }
    level[0]
}

/// Fold one Merkle path step: `Right` selects the sibling's placement.
pub fn fold_step(current: Hash32, sibling: Hash32, sibling_is_right: bool) -> Hash32 {
    if sibling_is_right {
        sha256_concat(&[current.as_bytes(), sibling.as_bytes()])
    } else {
        sha256_concat(&[sibling.as_bytes(), current.as_bytes()])
    }
}

/// Sibling path for a leaf, as `(sibling_hash, sibling_is_right)` steps.
///
/// Folding the leaf along the path with [`fold_step`] reproduces
/// [`merkle_root`] over the same leaves. An odd node carried up a level
/// contributes no step.
pub fn merkle_path(leaves: &[Hash32], index: usize) -> Option<Vec<(Hash32, bool)>> {
    if index >= leaves.len() {
        return None;
    }
    let mut path = Vec::new();
    let mut level: Vec<Hash32> = leaves.to_vec();
    let mut idx = index;
    while level.len() > 1 {
        if idx % 2 == 0 {
            if idx + 1 < level.len() {
                path.push((level[idx + 1], true));
            }
        } else {
            path.push((level[idx - 1], false));
        }
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match pair {
                [left, right] => {
                    next.push(sha256_concat(&[left.as_bytes(), right.as_bytes()]))
                }
                [odd] => next.push(*odd),
                _ => unreachable!(),
            }
        }
        level = next;
        idx /= 2;
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256("abc")
        let h = sha256(b"abc");
        assert_eq!(
            h.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn keccak_known_vector() {
        // Keccak-256 of the empty string
        let h = keccak256(b"");
        assert_eq!(
            h.to_hex(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn merkle_root_empty_and_single() {
        assert_eq!(merkle_root(&[]), Hash32::ZERO);
        let leaf = sha256(b"leaf");
        assert_eq!(merkle_root(&[leaf]), leaf);
    }

    #[test]
    fn merkle_root_depends_on_order() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }

    #[test]
    fn merkle_root_matches_manual_fold() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        let c = sha256(b"c");
        let ab = sha256_concat(&[a.as_bytes(), b.as_bytes()]);
        let expected = sha256_concat(&[ab.as_bytes(), c.as_bytes()]);
        assert_eq!(merkle_root(&[a, b, c]), expected);
    }

    #[test]
    fn merkle_path_folds_to_root() {
        for leaf_count in 1..=9usize {
            let leaves: Vec<Hash32> = (0..leaf_count)
                .map(|i| sha256(format!("leaf-{i}").as_bytes()))
                .collect();
            let root = merkle_root(&leaves);
            for (index, leaf) in leaves.iter().enumerate() {
                let path = merkle_path(&leaves, index).unwrap();
                let folded = path
                    .iter()
                    .fold(*leaf, |acc, (sibling, right)| fold_step(acc, *sibling, *right));
                assert_eq!(folded, root, "leaf {index} of {leaf_count}");
            }
        }
    }

    #[test]
    fn merkle_path_out_of_range_is_none() {
        let leaves = vec![sha256(b"only")];
        assert!(merkle_path(&leaves, 1).is_none());
    }

    #[test]
    fn fold_step_respects_placement() {
        let cur = sha256(b"cur");
        let sib = sha256(b"sib");
        assert_eq!(
            fold_step(cur, sib, true),
            sha256_concat(&[cur.as_bytes(), sib.as_bytes()])
        );
        assert_eq!(
            fold_step(cur, sib, false),
            sha256_concat(&[sib.as_bytes(), cur.as_bytes()])
        );
    }
}
