//! inclusion proofs
//!
//! a proof carries the sibling path from the leaf up to its mountain peak
//! and the complete peak list of the root it was made against.

use crate::{bag_peaks, hash_leaf, hash_node, mountains, Digest, LeafIndex, Root};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MmrProof {
    pub leaf_index: LeafIndex,
    /// leaf count of the root this proof targets
    pub width: u64,
    /// sibling hashes from leaf to peak
    pub siblings: Vec<Digest>,
    /// peaks of the target root, tallest first
    pub peaks: Vec<Digest>,
}

impl MmrProof {
    /// verify that `leaf` sits at `leaf_index` under `root`
    pub fn verify(&self, root: &Root, leaf: &Digest) -> bool {
        let index = self.leaf_index.0;
        if index >= self.width {
            return false;
        }

        let Some(ranges) = mountains(self.width) else {
            return false;
        };
        if ranges.len() != self.peaks.len() {
            return false;
        }

        let Some((slot, mountain)) = ranges.iter().enumerate().find(|(_, m)| m.contains(index))
        else {
            return false;
        };
        if self.siblings.len() != mountain.height as usize {
            return false;
        }

        let local = index - mountain.first_leaf;
        let mut node = hash_leaf(self.leaf_index.position(), leaf);
        for (level, sibling) in self.siblings.iter().enumerate() {
            node = if (local >> level) & 1 == 0 {
                hash_node(&node, sibling)
            } else {
                hash_node(sibling, &node)
            };
        }

        node == self.peaks[slot] && bag_peaks(self.width, &self.peaks) == *root
    }
}
