//! merkle mountain range accumulator
//!
//! append-only sequence of leaves summarised by a single root. every leaf
//! gets a dense 0-based index at insertion and stays in the structure
//! forever; membership is shown with a log-sized path to its mountain peak
//! plus the full peak list.
//!
//! ```text
//!  width = 6 (0b110)          peaks: [p0 (height 2), p1 (height 1)]
//!
//!            p0
//!          /    \
//!        n2      n5        p1
//!       /  \    /  \      /  \
//!      l0  l1  l2  l3    l4  l5
//!
//!  root = H(root-domain || width || p0 || p1)
//! ```
//!
//! nodes are stored in post-order, so the nodes of the first `w` leaves are
//! always a prefix of the node vector. that makes every historical root
//! (and proofs against it) recomputable from the current structure.

pub mod frontier;
pub mod proof;

pub use frontier::Frontier;
pub use proof::MmrProof;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 32-byte node / leaf digest
pub type Digest = [u8; 32];

/// domain separator for leaf nodes
pub const LEAF_DOMAIN: &[u8] = b"mimble.mmr.leaf.v1";
/// domain separator for interior nodes
pub const NODE_DOMAIN: &[u8] = b"mimble.mmr.node.v1";
/// domain separator for peak bagging
pub const ROOT_DOMAIN: &[u8] = b"mimble.mmr.root.v1";

/// largest width whose node count fits in a u64
pub const MAX_WIDTH: u64 = u64::MAX >> 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MmrError {
    #[error("leaf {index} out of range for width {width}")]
    LeafOutOfRange { index: u64, width: u64 },

    #[error("width {width} exceeds current width {current}")]
    WidthOutOfRange { width: u64, current: u64 },
}

pub type Result<T> = std::result::Result<T, MmrError>;

/// index of a leaf, assigned at append time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeafIndex(pub u64);

impl LeafIndex {
    /// 1-based position, as bound into the leaf hash and circuit inputs.
    /// saturates for indices no accumulator can reach
    pub fn position(&self) -> u64 {
        self.0.saturating_add(1)
    }

    /// whether a range of `width` leaves holds this index
    pub fn is_within(&self, width: u64) -> bool {
        self.0 < width
    }

    /// inverse of [`LeafIndex::position`]; position 0 does not exist
    pub fn from_position(position: u64) -> Option<Self> {
        position.checked_sub(1).map(LeafIndex)
    }
}

impl std::fmt::Display for LeafIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// accumulator root, hex encoded when serialized
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Root(pub Digest);

impl Root {
    pub fn to_bytes(&self) -> Digest {
        self.0
    }

    pub fn from_bytes(bytes: Digest) -> Self {
        Self(bytes)
    }

    /// root of the accumulator holding no leaves
    pub fn empty() -> Self {
        bag_peaks(0, &[])
    }
}

impl std::fmt::Display for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Root({})", hex::encode(&self.0[..8]))
    }
}

#[cfg(feature = "serde")]
impl Serialize for Root {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Root {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        use serde::de::Error;

        let s = String::deserialize(deserializer)?;
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)?;
        let digest: Digest = raw
            .try_into()
            .map_err(|v: Vec<u8>| D::Error::custom(format!("expected 32 bytes, got {}", v.len())))?;
        Ok(Root(digest))
    }
}

pub fn hash_leaf(position: u64, leaf: &Digest) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(LEAF_DOMAIN);
    hasher.update(&position.to_le_bytes());
    hasher.update(leaf);
    *hasher.finalize().as_bytes()
}

pub fn hash_node(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(NODE_DOMAIN);
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

/// fold peaks (left to right) and the width into a root
pub fn bag_peaks(width: u64, peaks: &[Digest]) -> Root {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ROOT_DOMAIN);
    hasher.update(&width.to_le_bytes());
    for peak in peaks {
        hasher.update(peak);
    }
    Root(*hasher.finalize().as_bytes())
}

/// number of nodes in a perfect subtree of the given height
pub(crate) fn subtree_size(height: u32) -> u64 {
    u64::MAX >> (63 - height)
}

/// number of stored nodes for `width` leaves
pub fn node_count(width: u64) -> u64 {
    2 * width - u64::from(width.count_ones())
}

/// one perfect subtree of the range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Mountain {
    pub height: u32,
    pub first_leaf: u64,
    pub first_node: u64,
}

impl Mountain {
    pub fn leaves(&self) -> u64 {
        1u64 << self.height
    }

    pub fn peak_node(&self) -> u64 {
        self.first_node + subtree_size(self.height) - 1
    }

    pub fn contains(&self, leaf: u64) -> bool {
        leaf >= self.first_leaf && leaf - self.first_leaf < self.leaves()
    }
}

/// mountains of a range with `width` leaves, tallest (leftmost) first.
/// `None` past [`MAX_WIDTH`], where node offsets no longer fit
pub(crate) fn mountains(width: u64) -> Option<Vec<Mountain>> {
    if width > MAX_WIDTH {
        return None;
    }

    let mut out = Vec::with_capacity(width.count_ones() as usize);
    let mut first_leaf = 0u64;
    let mut first_node = 0u64;

    for height in (0..64u32).rev() {
        if width & (1u64 << height) != 0 {
            let mountain = Mountain { height, first_leaf, first_node };
            first_leaf = first_leaf.checked_add(mountain.leaves())?;
            first_node = first_node.checked_add(subtree_size(height))?;
            out.push(mountain);
        }
    }

    Some(out)
}

/// merkle mountain range with full node storage
#[derive(Clone, Debug, Default)]
pub struct Mmr {
    /// appended leaves in order
    leaves: Vec<Digest>,
    /// all nodes, post-order
    nodes: Vec<Digest>,
}

impl Mmr {
    pub fn new() -> Self {
        Self::default()
    }

    /// number of leaves
    pub fn width(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaf(&self, index: LeafIndex) -> Option<&Digest> {
        self.leaves.get(index.0 as usize)
    }

    /// append a leaf, returns its index
    pub fn append(&mut self, leaf: Digest) -> LeafIndex {
        let index = LeafIndex(self.width());
        let mut node = hash_leaf(index.position(), &leaf);
        self.nodes.push(node);

        // every trailing one bit of the old width is a mountain of equal
        // height waiting to merge with the new one
        for height in 0..index.0.trailing_ones() {
            let right = self.nodes.len() as u64 - 1;
            let left = right - subtree_size(height);
            node = hash_node(&self.nodes[left as usize], &node);
            self.nodes.push(node);
        }

        self.leaves.push(leaf);
        index
    }

    pub fn root(&self) -> Root {
        bag_peaks(self.width(), &self.peaks_at(self.width()))
    }

    /// root as it was when the range held `width` leaves
    pub fn root_at(&self, width: u64) -> Result<Root> {
        self.check_width(width)?;
        Ok(bag_peaks(width, &self.peaks_at(width)))
    }

    /// current peaks, tallest first
    pub fn peaks(&self) -> Vec<Digest> {
        self.peaks_at(self.width())
    }

    /// peaks-only view for computing roots of speculative appends
    pub fn frontier(&self) -> Frontier {
        Frontier::from_parts(self.width(), self.peaks())
    }

    /// inclusion proof against the current root
    pub fn prove(&self, index: LeafIndex) -> Result<MmrProof> {
        self.prove_at(index, self.width())
    }

    /// inclusion proof against the root of the first `width` leaves
    pub fn prove_at(&self, index: LeafIndex, width: u64) -> Result<MmrProof> {
        self.check_width(width)?;
        if index.0 >= width {
            return Err(MmrError::LeafOutOfRange { index: index.0, width });
        }

        let ranges = mountains(width).unwrap_or_default();
        let mountain = ranges
            .iter()
            .find(|m| m.contains(index.0))
            .copied()
            .ok_or(MmrError::LeafOutOfRange { index: index.0, width })?;

        let local = index.0 - mountain.first_leaf;
        let mut siblings = Vec::with_capacity(mountain.height as usize);
        let mut start = mountain.first_node;

        // walk down from the peak, collecting the opposite child each level
        for height in (1..=mountain.height).rev() {
            let half = subtree_size(height - 1);
            let left_root = start + half - 1;
            let right_start = start + half;
            let right_root = right_start + half - 1;

            if local & (1u64 << (height - 1)) == 0 {
                siblings.push(self.nodes[right_root as usize]);
            } else {
                siblings.push(self.nodes[left_root as usize]);
                start = right_start;
            }
        }
        siblings.reverse();

        Ok(MmrProof {
            leaf_index: index,
            width,
            siblings,
            peaks: self.peaks_at(width),
        })
    }

    fn peaks_at(&self, width: u64) -> Vec<Digest> {
        mountains(width)
            .unwrap_or_default()
            .iter()
            .map(|m| self.nodes[m.peak_node() as usize])
            .collect()
    }

    fn check_width(&self, width: u64) -> Result<()> {
        if width > self.width() {
            return Err(MmrError::WidthOutOfRange { width, current: self.width() });
        }
        Ok(())
    }
}
