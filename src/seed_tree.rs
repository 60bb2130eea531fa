//! Seed trees: a single root seed expanded into many leaf seeds, of which all
//! but a chosen subset can later be revealed with few intermediate seeds.
use thiserror::Error;

use crate::{
    hash::{HashContext, PREFIX_SEED_TREE},
    params::Salt,
    tree::TreeShape,
};

/// Errors when revealing or reconstructing a seed tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeedTreeError {
    /// A leaf index that should be hidden does not exist.
    #[error("hidden leaf {leaf} is out of range for a tree with {leaf_count} leaves")]
    HiddenLeafOutOfRange {
        /// The offending index.
        leaf: usize,
        /// The number of leaves of the tree.
        leaf_count: usize,
    },
    /// The opening does not have the length implied by the hidden leaves.
    #[error("the seed tree opening has {actual} bytes, expected {expected}")]
    InvalidOpeningLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// A node that should be revealed is not known, e.g. because the tree was
    /// itself reconstructed with more hidden leaves.
    #[error("node {0} of the seed tree is not known")]
    MissingNode(usize),
}

/// A tree of seeds over `leaf_count` leaves.
///
/// Every known inner node expands into its children with
/// `H(1 || seed || salt || repetition || node)`, the first half of the output
/// becoming the left and the second half the right child.
#[derive(Debug, Clone)]
pub(crate) struct SeedTree {
    shape: TreeShape,
    seeds: Vec<u8>,
    known: Vec<bool>,
    seed_size: usize,
}

impl SeedTree {
    /// Expands `root_seed` into a full tree.
    pub(crate) fn generate(
        leaf_count: usize,
        root_seed: &[u8],
        salt: &Salt,
        repetition: usize,
    ) -> Self {
        let shape = TreeShape::new(leaf_count);
        let seed_size = root_seed.len();
        let mut tree = Self {
            seeds: vec![0; shape.node_count() * seed_size],
            known: vec![false; shape.node_count()],
            shape,
            seed_size,
        };
        tree.set(0, root_seed);
        tree.expand(salt, repetition);
        tree
    }

    /// Rebuilds all leaves except `hidden` from an opening produced by [`SeedTree::reveal`].
    pub(crate) fn reconstruct(
        leaf_count: usize,
        seed_size: usize,
        hidden: &[u16],
        opening: &[u8],
        salt: &Salt,
        repetition: usize,
    ) -> Result<Self, SeedTreeError> {
        let shape = TreeShape::new(leaf_count);
        let revealed = revealed_nodes(&shape, hidden)?;
        let expected = revealed.len() * seed_size;
        if opening.len() != expected {
            return Err(SeedTreeError::InvalidOpeningLength {
                expected,
                actual: opening.len(),
            });
        }
        let mut tree = Self {
            seeds: vec![0; shape.node_count() * seed_size],
            known: vec![false; shape.node_count()],
            shape,
            seed_size,
        };
        for (node, seed) in revealed.into_iter().zip(opening.chunks_exact(seed_size)) {
            tree.set(node, seed);
        }
        tree.expand(salt, repetition);
        Ok(tree)
    }

    /// The minimal set of seeds that allows recomputing every leaf except `hidden`.
    pub(crate) fn reveal(&self, hidden: &[u16]) -> Result<Vec<u8>, SeedTreeError> {
        let revealed = revealed_nodes(&self.shape, hidden)?;
        let mut opening = Vec::with_capacity(revealed.len() * self.seed_size);
        for node in revealed {
            let seed = self.node(node).ok_or(SeedTreeError::MissingNode(node))?;
            opening.extend_from_slice(seed);
        }
        Ok(opening)
    }

    /// Size in bytes of the opening that hides `hidden`.
    pub(crate) fn revealed_size(
        leaf_count: usize,
        seed_size: usize,
        hidden: &[u16],
    ) -> Result<usize, SeedTreeError> {
        let shape = TreeShape::new(leaf_count);
        Ok(revealed_nodes(&shape, hidden)?.len() * seed_size)
    }

    /// The seed of leaf `leaf`, or `None` if it is hidden.
    pub(crate) fn leaf(&self, leaf: usize) -> Option<&[u8]> {
        if leaf >= self.shape.leaf_count() {
            return None;
        }
        self.node(self.shape.leaf_node(leaf))
    }

    pub(crate) fn leaves(&self) -> Vec<Option<&[u8]>> {
        (0..self.shape.leaf_count()).map(|i| self.leaf(i)).collect()
    }

    fn node(&self, node: usize) -> Option<&[u8]> {
        self.known[node].then(|| &self.seeds[node * self.seed_size..(node + 1) * self.seed_size])
    }

    fn set(&mut self, node: usize, seed: &[u8]) {
        self.seeds[node * self.seed_size..(node + 1) * self.seed_size].copy_from_slice(seed);
        self.known[node] = true;
    }

    fn expand(&mut self, salt: &Salt, repetition: usize) {
        let mut children = vec![0; 2 * self.seed_size];
        for node in 0..self.shape.first_leaf() {
            if !self.shape.exists(node) {
                continue;
            }
            let Some(seed) = self.node(node) else {
                continue;
            };
            let mut ctx = HashContext::with_prefix(PREFIX_SEED_TREE);
            ctx.update(seed)
                .update(salt)
                .update_u16(repetition as u16)
                .update_u16(node as u16);
            ctx.squeeze(&mut children);

            let (left, right) = TreeShape::children(node);
            let (left_seed, right_seed) = children.split_at(self.seed_size);
            if !self.known[left] {
                self.set(left, left_seed);
            }
            if self.shape.exists(right) && !self.known[right] {
                self.set(right, right_seed);
            }
        }
    }
}

/// Pre-order walk emitting every maximal subtree without a hidden leaf.
fn revealed_nodes(shape: &TreeShape, hidden: &[u16]) -> Result<Vec<usize>, SeedTreeError> {
    let hidden_below = shape.mark_any(hidden).ok_or_else(|| {
        let leaf = hidden
            .iter()
            .map(|&l| usize::from(l))
            .find(|&l| l >= shape.leaf_count())
            .unwrap_or_default();
        SeedTreeError::HiddenLeafOutOfRange {
            leaf,
            leaf_count: shape.leaf_count(),
        }
    })?;
    let mut revealed = vec![];
    let mut stack = vec![0];
    while let Some(node) = stack.pop() {
        if !shape.exists(node) {
            continue;
        }
        if !hidden_below[node] {
            revealed.push(node);
        } else if !shape.is_leaf(node) {
            let (left, right) = TreeShape::children(node);
            stack.push(right);
            stack.push(left);
        }
    }
    Ok(revealed)
}
