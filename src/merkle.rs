//! Merkle tree over the view commitments of all repetitions.
use thiserror::Error;

use crate::{
    hash::{HashContext, PREFIX_MERKLE},
    params::Salt,
    tree::TreeShape,
};

/// Errors when opening or reconstructing a Merkle tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// A leaf index does not exist.
    #[error("leaf {leaf} is out of range for a tree with {leaf_count} leaves")]
    LeafOutOfRange {
        /// The offending index.
        leaf: usize,
        /// The number of leaves of the tree.
        leaf_count: usize,
    },
    /// The opening does not have the length implied by the missing leaves.
    #[error("the Merkle opening has {actual} bytes, expected {expected}")]
    InvalidOpeningLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// A leaf that is not listed as missing was not provided.
    #[error("leaf {0} is neither provided nor listed as missing")]
    MissingLeaf(usize),
    /// The provided nodes are not sufficient to recompute the root.
    #[error("the Merkle opening does not determine the root")]
    IncompleteOpening,
}

/// A Merkle tree. A node with two children is `H(3 || left || right || salt || node)`,
/// a node with only a left child carries the child's digest.
#[derive(Debug, Clone)]
pub(crate) struct MerkleTree {
    shape: TreeShape,
    nodes: Vec<u8>,
    known: Vec<bool>,
    digest_size: usize,
}

impl MerkleTree {
    pub(crate) fn build(leaves: &[Vec<u8>], salt: &Salt, digest_size: usize) -> Self {
        let shape = TreeShape::new(leaves.len());
        let mut tree = Self::empty(shape, digest_size);
        for (i, leaf) in leaves.iter().enumerate() {
            tree.set(tree.shape.leaf_node(i), leaf);
        }
        tree.compute_parents(salt);
        tree
    }

    fn empty(shape: TreeShape, digest_size: usize) -> Self {
        Self {
            nodes: vec![0; shape.node_count() * digest_size],
            known: vec![false; shape.node_count()],
            shape,
            digest_size,
        }
    }

    pub(crate) fn root(&self) -> &[u8] {
        &self.nodes[..self.digest_size]
    }

    /// The nodes needed to recompute the root when the leaves in `missing` are unknown.
    pub(crate) fn open(&self, missing: &[u16]) -> Result<Vec<u8>, MerkleError> {
        let revealed = revealed_nodes(&self.shape, missing)?;
        let mut opening = Vec::with_capacity(revealed.len() * self.digest_size);
        for node in revealed {
            opening.extend_from_slice(self.node(node).ok_or(MerkleError::IncompleteOpening)?);
        }
        Ok(opening)
    }

    pub(crate) fn opening_size(
        leaf_count: usize,
        missing: &[u16],
        digest_size: usize,
    ) -> Result<usize, MerkleError> {
        let shape = TreeShape::new(leaf_count);
        Ok(revealed_nodes(&shape, missing)?.len() * digest_size)
    }

    /// Recomputes the root from the known leaves and an opening for `missing`.
    ///
    /// `leaves` holds one entry per leaf; entries of missing leaves are ignored.
    pub(crate) fn reconstruct_root(
        leaves: &[Option<&[u8]>],
        missing: &[u16],
        opening: &[u8],
        salt: &Salt,
        digest_size: usize,
    ) -> Result<Vec<u8>, MerkleError> {
        let shape = TreeShape::new(leaves.len());
        let revealed = revealed_nodes(&shape, missing)?;
        let expected = revealed.len() * digest_size;
        if opening.len() != expected {
            return Err(MerkleError::InvalidOpeningLength {
                expected,
                actual: opening.len(),
            });
        }
        let mut tree = Self::empty(shape, digest_size);
        for (i, leaf) in leaves.iter().enumerate() {
            if missing.contains(&(i as u16)) {
                continue;
            }
            let leaf = leaf.ok_or(MerkleError::MissingLeaf(i))?;
            tree.set(tree.shape.leaf_node(i), leaf);
        }
        for (node, digest) in revealed.into_iter().zip(opening.chunks_exact(digest_size)) {
            tree.set(node, digest);
        }
        tree.compute_parents(salt);
        tree.node(0)
            .map(<[u8]>::to_vec)
            .ok_or(MerkleError::IncompleteOpening)
    }

    fn node(&self, node: usize) -> Option<&[u8]> {
        let range = node * self.digest_size..(node + 1) * self.digest_size;
        self.known[node].then(|| &self.nodes[range])
    }

    fn set(&mut self, node: usize, digest: &[u8]) {
        self.nodes[node * self.digest_size..(node + 1) * self.digest_size].copy_from_slice(digest);
        self.known[node] = true;
    }

    fn compute_parents(&mut self, salt: &Salt) {
        for node in (0..self.shape.first_leaf()).rev() {
            if !self.shape.exists(node) || self.known[node] {
                continue;
            }
            let (left, right) = TreeShape::children(node);
            let Some(left_digest) = self.node(left) else {
                continue;
            };
            let digest = if self.shape.exists(right) {
                let Some(right_digest) = self.node(right) else {
                    continue;
                };
                let mut ctx = HashContext::with_prefix(PREFIX_MERKLE);
                ctx.update(left_digest)
                    .update(right_digest)
                    .update(salt)
                    .update_u16(node as u16);
                ctx.finalize(self.digest_size)
            } else {
                left_digest.to_vec()
            };
            self.set(node, &digest);
        }
    }
}

/// For every missing leaf, the highest ancestor whose leaves are all missing,
/// each node listed once and in order of the missing leaves.
fn revealed_nodes(shape: &TreeShape, missing: &[u16]) -> Result<Vec<usize>, MerkleError> {
    let all_missing = shape.mark_all(missing).ok_or_else(|| {
        let leaf = missing
            .iter()
            .map(|&l| usize::from(l))
            .find(|&l| l >= shape.leaf_count())
            .unwrap_or_default();
        MerkleError::LeafOutOfRange {
            leaf,
            leaf_count: shape.leaf_count(),
        }
    })?;
    let mut revealed = vec![];
    for &leaf in missing {
        let mut node = shape.leaf_node(usize::from(leaf));
        while node != 0 && all_missing[TreeShape::parent(node)] {
            node = TreeShape::parent(node);
        }
        if !revealed.contains(&node) {
            revealed.push(node);
        }
    }
    Ok(revealed)
}
