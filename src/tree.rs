//! Node layout shared by the seed trees and the Merkle tree.
//!
//! Both trees are complete binary trees stored in an array: node `i` has the
//! children `2i + 1` and `2i + 2`, leaf `j` is stored at `first_leaf + j`. If
//! the number of leaves is not a power of two, the rightmost leaves are
//! missing and so is every node that has no existing leaf below it.

/// Node indices are absorbed as `u16`, which bounds the number of leaves.
pub(crate) const MAX_LEAVES: usize = 1 << 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TreeShape {
    leaf_count: usize,
    first_leaf: usize,
    exists: Vec<bool>,
}

impl TreeShape {
    pub(crate) fn new(leaf_count: usize) -> Self {
        let leaf_count = leaf_count.max(1);
        let first_leaf = leaf_count.next_power_of_two() - 1;
        let mut exists = vec![false; 2 * first_leaf + 1];
        exists[first_leaf..first_leaf + leaf_count].fill(true);
        // leaves are filled from the left, so a node exists iff its left child does
        for node in (0..first_leaf).rev() {
            exists[node] = exists[2 * node + 1];
        }
        Self {
            leaf_count,
            first_leaf,
            exists,
        }
    }

    pub(crate) fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub(crate) fn node_count(&self) -> usize {
        self.exists.len()
    }

    pub(crate) fn first_leaf(&self) -> usize {
        self.first_leaf
    }

    pub(crate) fn leaf_node(&self, leaf: usize) -> usize {
        self.first_leaf + leaf
    }

    pub(crate) fn is_leaf(&self, node: usize) -> bool {
        node >= self.first_leaf
    }

    pub(crate) fn exists(&self, node: usize) -> bool {
        self.exists.get(node).copied().unwrap_or(false)
    }

    pub(crate) fn parent(node: usize) -> usize {
        (node - 1) / 2
    }

    pub(crate) fn children(node: usize) -> (usize, usize) {
        (2 * node + 1, 2 * node + 2)
    }

    /// Marks every node that has at least one of `leaves` below it (or is one of them).
    ///
    /// Returns `None` if a leaf index is out of range.
    pub(crate) fn mark_any(&self, leaves: &[u16]) -> Option<Vec<bool>> {
        let mut marked = vec![false; self.node_count()];
        for &leaf in leaves {
            let leaf = usize::from(leaf);
            if leaf >= self.leaf_count {
                return None;
            }
            let mut node = self.leaf_node(leaf);
            marked[node] = true;
            while node != 0 {
                node = Self::parent(node);
                marked[node] = true;
            }
        }
        Some(marked)
    }

    /// Marks every existing node whose existing leaves are all contained in `leaves`.
    ///
    /// Returns `None` if a leaf index is out of range.
    pub(crate) fn mark_all(&self, leaves: &[u16]) -> Option<Vec<bool>> {
        let mut marked = vec![false; self.node_count()];
        for &leaf in leaves {
            let leaf = usize::from(leaf);
            if leaf >= self.leaf_count {
                return None;
            }
            marked[self.leaf_node(leaf)] = true;
        }
        for node in (0..self.first_leaf).rev() {
            if !self.exists(node) {
                continue;
            }
            let (left, right) = Self::children(node);
            marked[node] = marked[left] && (!self.exists(right) || marked[right]);
        }
        Some(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_of_incomplete_tree() {
        let shape = TreeShape::new(5);
        assert_eq!(15, shape.node_count());
        assert_eq!(7, shape.first_leaf());
        let existing: Vec<usize> = (0..15).filter(|&n| shape.exists(n)).collect();
        assert_eq!(vec![0, 1, 2, 3, 4, 5, 7, 8, 9, 10, 11], existing);
        assert!(!shape.exists(15));
    }

    #[test]
    fn single_leaf_is_root() {
        let shape = TreeShape::new(1);
        assert_eq!(1, shape.node_count());
        assert!(shape.is_leaf(0));
        assert!(shape.exists(0));
    }

    #[test]
    fn marks() {
        let shape = TreeShape::new(4);
        let any = shape.mark_any(&[1]).unwrap();
        assert_eq!(vec![true, true, false, false, true, false, false], any);
        let all = shape.mark_all(&[0, 1, 3]).unwrap();
        assert_eq!(vec![false, true, false, true, true, false, true], all);
        assert!(shape.mark_any(&[4]).is_none());
        assert!(shape.mark_all(&[4]).is_none());
    }

    #[test]
    fn mark_all_with_missing_right_subtree() {
        let shape = TreeShape::new(3);
        // node 2 has only the left child 5 (leaf 2), node 6 does not exist
        let all = shape.mark_all(&[2]).unwrap();
        assert!(all[5]);
        assert!(all[2]);
        assert!(!all[0]);
    }
}
