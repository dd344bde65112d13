//! peaks-only accumulator view
//!
//! enough to keep appending and produce roots, not enough to prove. used to
//! work out the root a batch of appends would produce without touching the
//! stored range.

use crate::{bag_peaks, hash_leaf, hash_node, mountains, Digest, LeafIndex, Root};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frontier {
    width: u64,
    /// tallest first
    peaks: Vec<Digest>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// rebuild from a width and its peak list; `None` if the peak count
    /// does not match the width
    pub fn from_peaks(width: u64, peaks: Vec<Digest>) -> Option<Self> {
        if mountains(width).map(|m| m.len()) != Some(peaks.len()) {
            return None;
        }
        Some(Self { width, peaks })
    }

    pub(crate) fn from_parts(width: u64, peaks: Vec<Digest>) -> Self {
        Self { width, peaks }
    }

    pub fn width(&self) -> u64 {
        self.width
    }

    pub fn peaks(&self) -> &[Digest] {
        &self.peaks
    }

    pub fn append(&mut self, leaf: &Digest) -> LeafIndex {
        let index = LeafIndex(self.width);
        let mut node = hash_leaf(index.position(), leaf);

        for _ in 0..self.width.trailing_ones() {
            // trailing ones always have a matching peak on the right
            match self.peaks.pop() {
                Some(left) => node = hash_node(&left, &node),
                None => break,
            }
        }

        self.peaks.push(node);
        self.width += 1;
        index
    }

    pub fn root(&self) -> Root {
        bag_peaks(self.width, &self.peaks)
    }
}
