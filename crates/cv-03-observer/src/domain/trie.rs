//! Hexary Merkle Patricia trie, as used by EVM transaction and receipt
//! tries.
//!
//! Node keys are Keccak-256 hashes of the RLP node encoding; nodes shorter
//! than 32 bytes are embedded in their parent instead of hashed. Node values
//! are never rehashed: the trie node key *is* the hash.

use ethereum_types::H256;
use rlp::{Rlp, RlpStream};
use shared_crypto::hashing::keccak256;

/// Keccak-256 of `rlp("")`, the root of an empty trie.
pub const EMPTY_TRIE_ROOT: &str =
    "56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421";

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Empty,
    Leaf {
        path: Vec<u8>,
        value: Vec<u8>,
    },
    Extension {
        path: Vec<u8>,
        child: Box<Node>,
    },
    Branch {
        children: Box<[Node; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl Node {
    fn empty_branch() -> Node {
        Node::Branch {
            children: Box::new(std::array::from_fn(|_| Node::Empty)),
            value: None,
        }
    }
}

/// An in-memory Patricia trie built from ordered (key, value) pairs.
#[derive(Debug, Clone)]
pub struct PatriciaTrie {
    root: Node,
}

impl Default for PatriciaTrie {
    fn default() -> Self {
        Self::new()
    }
}

/// Nibble expansion of a key; branch decisions follow these directions.
pub fn key_nibbles(key: &[u8]) -> Vec<u8> {
    to_nibbles(key)
}

fn to_nibbles(key: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(key.len() * 2);
    for byte in key {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    nibbles
}

/// Hex-prefix encoding of a nibble path.
fn hex_prefix(path: &[u8], is_leaf: bool) -> Vec<u8> {
    let mut flag: u8 = if is_leaf { 2 } else { 0 };
    let mut out = Vec::with_capacity(path.len() / 2 + 1);
    if path.len() % 2 == 1 {
        flag += 1;
        out.push((flag << 4) | path[0]);
        for pair in path[1..].chunks(2) {
            out.push((pair[0] << 4) | pair[1]);
        }
    } else {
        out.push(flag << 4);
        for pair in path.chunks(2) {
            out.push((pair[0] << 4) | pair[1]);
        }
    }
    out
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

impl PatriciaTrie {
    /// An empty trie.
    pub fn new() -> Self {
        Self { root: Node::Empty }
    }

    /// Build a trie keyed by `rlp(index)` over ordered values, the layout of
    /// EVM transaction and receipt tries.
    pub fn from_ordered_values(values: &[Vec<u8>]) -> Self {
        let mut trie = Self::new();
        for (index, value) in values.iter().enumerate() {
            let key = rlp::encode(&index).to_vec();
            trie.insert(&key, value.clone());
        }
        trie
    }

    /// Insert a key/value pair.
    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) {
        let nibbles = to_nibbles(key);
        let root = std::mem::replace(&mut self.root, Node::Empty);
        self.root = Self::insert_at(root, &nibbles, value);
    }

    fn insert_at(node: Node, path: &[u8], value: Vec<u8>) -> Node {
        match node {
            Node::Empty => Node::Leaf {
                path: path.to_vec(),
                value,
            },
            Node::Leaf {
                path: leaf_path,
                value: leaf_value,
            } => {
                if leaf_path == path {
                    return Node::Leaf {
                        path: leaf_path,
                        value,
                    };
                }
                let shared = common_prefix_len(&leaf_path, path);
                let branch = Self::branch_with(
                    &leaf_path[shared..],
                    leaf_value,
                    &path[shared..],
                    value,
                );
                if shared == 0 {
                    branch
                } else {
                    Node::Extension {
                        path: path[..shared].to_vec(),
                        child: Box::new(branch),
                    }
                }
            }
            Node::Extension {
                path: ext_path,
                child,
            } => {
                let shared = common_prefix_len(&ext_path, path);
                if shared == ext_path.len() {
                    let new_child = Self::insert_at(*child, &path[shared..], value);
                    return Node::Extension {
                        path: ext_path,
                        child: Box::new(new_child),
                    };
                }
                // Split the extension.
                let mut branch_children: [Node; 16] = std::array::from_fn(|_| Node::Empty);
                let ext_nibble = ext_path[shared];
                let remaining_ext = &ext_path[shared + 1..];
                branch_children[ext_nibble as usize] = if remaining_ext.is_empty() {
                    *child
                } else {
                    Node::Extension {
                        path: remaining_ext.to_vec(),
                        child,
                    }
                };
                let mut branch = Node::Branch {
                    children: Box::new(branch_children),
                    value: None,
                };
                branch = Self::insert_at(branch, &path[shared..], value);
                if shared == 0 {
                    branch
                } else {
                    Node::Extension {
                        path: path[..shared].to_vec(),
                        child: Box::new(branch),
                    }
                }
            }
            Node::Branch {
                mut children,
                value: branch_value,
            } => {
                if path.is_empty() {
                    return Node::Branch {
                        children,
                        value: Some(value),
                    };
                }
                let index = path[0] as usize;
                let child = std::mem::replace(&mut children[index], Node::Empty);
                children[index] = Self::insert_at(child, &path[1..], value);
                Node::Branch {
                    children,
                    value: branch_value,
                }
            }
        }
    }

    fn branch_with(a_path: &[u8], a_value: Vec<u8>, b_path: &[u8], b_value: Vec<u8>) -> Node {
        let mut branch = Node::empty_branch();
        branch = Self::insert_at(branch, a_path, a_value);
        Self::insert_at(branch, b_path, b_value)
    }

    fn encode(node: &Node) -> Vec<u8> {
        match node {
            Node::Empty => {
                let mut stream = RlpStream::new();
                stream.append_empty_data();
                stream.out().to_vec()
            }
            Node::Leaf { path, value } => {
                let mut stream = RlpStream::new_list(2);
                stream.append(&hex_prefix(path, true));
                stream.append(value);
                stream.out().to_vec()
            }
            Node::Extension { path, child } => {
                let mut stream = RlpStream::new_list(2);
                stream.append(&hex_prefix(path, false));
                Self::append_child(&mut stream, child);
                stream.out().to_vec()
            }
            Node::Branch { children, value } => {
                let mut stream = RlpStream::new_list(17);
                for child in children.iter() {
                    match child {
                        Node::Empty => {
                            stream.append_empty_data();
                        }
                        other => Self::append_child(&mut stream, other),
                    }
                }
                match value {
                    Some(v) => stream.append(v),
                    None => stream.append_empty_data(),
                };
                stream.out().to_vec()
            }
        }
    }

    fn append_child(stream: &mut RlpStream, child: &Node) {
        let encoded = Self::encode(child);
        if encoded.len() < 32 {
            // Short nodes are embedded verbatim.
            stream.append_raw(&encoded, 1);
        } else {
            stream.append(&keccak256(&encoded).as_bytes().to_vec());
        }
    }

    /// Trie root: the Keccak-256 key of the encoded root node.
    pub fn root(&self) -> H256 {
        let encoded = Self::encode(&self.root);
        H256::from_slice(keccak256(&encoded).as_bytes())
    }

    /// Collect the proof for `key`: the RLP encodings of every hash-referenced
    /// node on the path from the root to the value.
    pub fn prove(&self, key: &[u8]) -> Option<Vec<Vec<u8>>> {
        let nibbles = to_nibbles(key);
        let mut proof = Vec::new();
        let mut node = &self.root;
        let mut remaining: &[u8] = &nibbles;
        // The root node is always part of the proof.
        let mut pending_encoding = Some(Self::encode(node));

        loop {
            if let Some(encoded) = pending_encoding.take() {
                proof.push(encoded);
            }
            match node {
                Node::Empty => return None,
                Node::Leaf { path, .. } => {
                    return if path.as_slice() == remaining {
                        Some(proof)
                    } else {
                        None
                    };
                }
                Node::Extension { path, child } => {
                    if remaining.len() < path.len() || &remaining[..path.len()] != path.as_slice() {
                        return None;
                    }
                    remaining = &remaining[path.len()..];
                    let encoded = Self::encode(child);
                    if encoded.len() >= 32 {
                        pending_encoding = Some(encoded);
                    }
                    node = child;
                }
                Node::Branch { children, value } => {
                    if remaining.is_empty() {
                        return value.as_ref().map(|_| proof);
                    }
                    let index = remaining[0] as usize;
                    remaining = &remaining[1..];
                    let child = &children[index];
                    if matches!(child, Node::Empty) {
                        return None;
                    }
                    let encoded = Self::encode(child);
                    if encoded.len() >= 32 {
                        pending_encoding = Some(encoded);
                    }
                    node = child;
                }
            }
        }
    }
}

/// Walk a proof from `root` along `key`, returning the proven value.
///
/// Each proof node's Keccak-256 must equal the reference that led to it; the
/// nibbles of `key` drive every branch decision.
pub fn verify_proof(root: H256, key: &[u8], proof: &[Vec<u8>]) -> Option<Vec<u8>> {
    let nibbles = to_nibbles(key);
    let mut remaining: &[u8] = &nibbles;
    let mut proof_iter = proof.iter();
    let first = proof_iter.next()?;
    if keccak256(first).as_bytes() != root.as_bytes() {
        return None;
    }
    let mut current: Vec<u8> = first.clone();

    loop {
        let rlp = Rlp::new(&current);
        let item_count = rlp.item_count().ok()?;
        let next: Vec<u8> = match item_count {
            2 => {
                let encoded_path: Vec<u8> = rlp.val_at(0).ok()?;
                let flag = encoded_path[0] >> 4;
                let is_leaf = flag >= 2;
                let mut path: Vec<u8> = Vec::new();
                if flag % 2 == 1 {
                    path.push(encoded_path[0] & 0x0f);
                }
                for byte in &encoded_path[1..] {
                    path.push(byte >> 4);
                    path.push(byte & 0x0f);
                }
                if is_leaf {
                    return if path.as_slice() == remaining {
                        rlp.val_at(1).ok()
                    } else {
                        None
                    };
                }
                if remaining.len() < path.len() || remaining[..path.len()] != path[..] {
                    return None;
                }
                remaining = &remaining[path.len()..];
                resolve_child(&rlp, 1, &mut proof_iter)?
            }
            17 => {
                if remaining.is_empty() {
                    return rlp.val_at(16).ok();
                }
                let index = remaining[0] as usize;
                remaining = &remaining[1..];
                resolve_child(&rlp, index, &mut proof_iter)?
            }
            _ => return None,
        };
        current = next;
    }
}

/// Resolve a child reference: inline nodes are used verbatim, 32-byte hash
/// references must match the next proof node's Keccak-256.
fn resolve_child<'a, I>(rlp: &Rlp<'_>, index: usize, proof_iter: &mut I) -> Option<Vec<u8>>
where
    I: Iterator<Item = &'a Vec<u8>>,
{
    let child = rlp.at(index).ok()?;
    if child.is_data() {
        let data: Vec<u8> = child.data().ok()?.to_vec();
        if data.len() == 32 {
            let next = proof_iter.next()?;
            if keccak256(next).as_bytes() != data.as_slice() {
                return None;
            }
            Some(next.clone())
        } else if data.is_empty() {
            None
        } else {
            // Malformed reference.
            None
        }
    } else {
        // Embedded node: its raw encoding continues the walk.
        Some(child.as_raw().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_trie_root_matches_known_constant() {
        let trie = PatriciaTrie::new();
        assert_eq!(hex::encode(trie.root().as_bytes()), EMPTY_TRIE_ROOT);
    }

    #[test]
    fn single_value_root_is_leaf_hash() {
        let values = vec![b"first value long enough to hash".to_vec()];
        let trie = PatriciaTrie::from_ordered_values(&values);
        // Root must be the keccak of the leaf's RLP encoding.
        let key = rlp::encode(&0usize).to_vec();
        let proof = trie.prove(&key).unwrap();
        assert_eq!(proof.len(), 1);
        assert_eq!(
            keccak256(&proof[0]).as_bytes(),
            trie.root().as_bytes()
        );
    }

    #[test]
    fn prove_and_verify_small_trie() {
        let values: Vec<Vec<u8>> = (0..3u8)
            .map(|i| format!("transaction payload number {i} with some padding").into_bytes())
            .collect();
        let trie = PatriciaTrie::from_ordered_values(&values);
        let root = trie.root();
        for (index, value) in values.iter().enumerate() {
            let key = rlp::encode(&index).to_vec();
            let proof = trie.prove(&key).expect("proof exists");
            let proven = verify_proof(root, &key, &proof).expect("verifies");
            assert_eq!(&proven, value);
        }
    }

    #[test]
    fn prove_and_verify_large_trie() {
        let values: Vec<Vec<u8>> = (0..200u32)
            .map(|i| {
                format!("receipt body {i} {}", "x".repeat((i % 40) as usize)).into_bytes()
            })
            .collect();
        let trie = PatriciaTrie::from_ordered_values(&values);
        let root = trie.root();
        for index in [0usize, 1, 7, 63, 127, 128, 199] {
            let key = rlp::encode(&index).to_vec();
            let proof = trie.prove(&key).expect("proof exists");
            let proven = verify_proof(root, &key, &proof).expect("verifies");
            assert_eq!(proven, values[index]);
        }
    }

    #[test]
    fn missing_key_has_no_proof() {
        let values = vec![b"only entry".to_vec()];
        let trie = PatriciaTrie::from_ordered_values(&values);
        let key = rlp::encode(&5usize).to_vec();
        assert!(trie.prove(&key).is_none());
    }

    #[test]
    fn tampered_proof_rejected() {
        let values: Vec<Vec<u8>> = (0..20u32)
            .map(|i| format!("value {i} padded to a useful length..........").into_bytes())
            .collect();
        let trie = PatriciaTrie::from_ordered_values(&values);
        let root = trie.root();
        let key = rlp::encode(&3usize).to_vec();
        let mut proof = trie.prove(&key).unwrap();
        let last = proof.len() - 1;
        proof[last][0] ^= 0x01;
        assert!(verify_proof(root, &key, &proof).is_none());
    }

    #[test]
    fn wrong_root_rejected() {
        let values = vec![b"some value that is long enough".to_vec(); 4];
        let trie = PatriciaTrie::from_ordered_values(&values);
        let key = rlp::encode(&0usize).to_vec();
        let proof = trie.prove(&key).unwrap();
        let bad_root = H256::repeat_byte(0xee);
        assert!(verify_proof(bad_root, &key, &proof).is_none());
    }

    #[test]
    fn root_changes_with_order() {
        let a = vec![b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_vec(), b"bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_vec()];
        let b = vec![a[1].clone(), a[0].clone()];
        assert_ne!(
            PatriciaTrie::from_ordered_values(&a).root(),
            PatriciaTrie::from_ordered_values(&b).root()
        );
    }
}
