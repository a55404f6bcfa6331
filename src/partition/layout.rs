//! Slot layouts: the structure of a composite tree with empty slots told
//! apart from meshes.
//!
//! A rank holds [`Block::Empty`] wherever another rank owns the data. When
//! the owner's slot is a group (a zone with its patch group, a multi-piece
//! zone) the placeholder must be a group of the same shape, or the trees
//! diverge. [`align_layouts`] merges every rank's layout and rebuilds the
//! placeholders from it.

use crate::algs::collective::{TAG_LAYOUT, allgather_bytes, is_serial};
use crate::algs::communicator::Communicator;
use crate::mesh::{Block, MultiBlock};
use crate::mesh_error::CgnsError;
use log::trace;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// Empty here; the shape is decided by whoever holds data.
    Open,
    Leaf,
    Group(Vec<(String, Layout)>),
}

impl Layout {
    pub fn of(block: &Block) -> Self {
        match block {
            Block::Empty => Layout::Open,
            Block::Mesh(_) => Layout::Leaf,
            Block::Group(g) => Self::of_group(g),
        }
    }

    pub fn of_group(group: &MultiBlock) -> Self {
        Layout::Group(
            group
                .iter()
                .map(|(n, b)| (n.to_string(), Self::of(b)))
                .collect(),
        )
    }

    /// Combine two views of the same slot; `path` names it in errors.
    pub fn merge(self, other: Layout, path: &str) -> Result<Layout, CgnsError> {
        match (self, other) {
            (Layout::Open, l) | (l, Layout::Open) => Ok(l),
            (Layout::Leaf, Layout::Leaf) => Ok(Layout::Leaf),
            (Layout::Group(a), Layout::Group(b)) => {
                let same_names =
                    a.len() == b.len() && a.iter().zip(&b).all(|((x, _), (y, _))| x == y);
                if !same_names {
                    return Err(CgnsError::Reconciliation(format!(
                        "group `{path}` has different children across ranks"
                    )));
                }
                a.into_iter()
                    .zip(b)
                    .map(|((name, x), (_, y))| {
                        let sub = if path.is_empty() {
                            name.clone()
                        } else {
                            format!("{path}/{name}")
                        };
                        x.merge(y, &sub).map(|l| (name, l))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Layout::Group)
            }
            _ => Err(CgnsError::Reconciliation(format!(
                "slot `{path}` is a mesh on one rank and a group on another"
            ))),
        }
    }

    /// An all-empty block with this layout.
    pub fn placeholder(&self) -> Block {
        match self {
            Layout::Open | Layout::Leaf => Block::Empty,
            Layout::Group(children) => {
                let mut g = MultiBlock::new();
                for (name, l) in children {
                    g.push(name.clone(), l.placeholder());
                }
                Block::Group(g)
            }
        }
    }

    /// Replace empty slots of `block` that this layout knows to be groups.
    /// `block` must have been merged into this layout.
    pub fn conform(&self, block: Block) -> Block {
        match (self, block) {
            (Layout::Group(_), Block::Empty) => self.placeholder(),
            (Layout::Group(children), Block::Group(g)) => {
                let mut out = MultiBlock::new();
                for ((name, b), (_, l)) in g.into_children().into_iter().zip(children) {
                    out.push(name, l.conform(b));
                }
                Block::Group(out)
            }
            (_, b) => b,
        }
    }
}

/// Agree on one layout across ranks and shape every local placeholder
/// after it. Fails on every rank when two ranks hold incompatible data.
pub fn align_layouts<C: Communicator>(
    comm: &C,
    tree: MultiBlock,
) -> Result<MultiBlock, CgnsError> {
    if is_serial(comm) {
        return Ok(tree);
    }
    // an unencodable layout arrives empty and fails to decode everywhere
    let local = bincode::serialize(&Layout::of_group(&tree)).unwrap_or_default();
    let all = allgather_bytes(comm, TAG_LAYOUT, &local)?;
    let mut merged = Layout::Open;
    for buf in &all {
        let theirs: Layout = bincode::deserialize(buf)?;
        merged = merged.merge(theirs, "")?;
    }
    trace!("rank {} aligned layouts of {} ranks", comm.rank(), all.len());
    match merged.conform(Block::Group(tree)) {
        Block::Group(g) => Ok(g),
        _ => Err(CgnsError::Reconciliation("tree root is not a group".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::LocalComm;
    use crate::mesh::{CellArray, Mesh, Points, UnstructuredGrid};

    fn leaf() -> Block {
        Block::mesh(Mesh::Unstructured(UnstructuredGrid::new(
            Points::from_f64(&[[0.0; 3]]),
            CellArray::new(),
        )))
    }

    fn group(children: Vec<(&str, Block)>) -> Block {
        let mut g = MultiBlock::new();
        for (n, b) in children {
            g.push(n, b);
        }
        Block::Group(g)
    }

    fn with_patches() -> Block {
        group(vec![
            ("Internal", leaf()),
            ("Patches", group(vec![("wall", leaf())])),
        ])
    }

    #[test]
    fn empty_slot_takes_the_owners_shape() {
        let owner = group(vec![("a", with_patches())]);
        let peer = group(vec![("a", Block::Empty)]);
        let merged = Layout::of(&owner).merge(Layout::of(&peer), "").unwrap();
        let filled = merged.conform(peer);
        assert_eq!(filled.shape(), owner.shape());
        let inner = filled.as_group().and_then(|g| g.get("a")).and_then(Block::as_group).unwrap();
        assert!(inner.get("Internal").is_some_and(Block::is_empty));
    }

    #[test]
    fn mesh_against_group_is_rejected() {
        let a = Layout::of(&group(vec![("z", leaf())]));
        let b = Layout::of(&group(vec![("z", with_patches())]));
        assert!(matches!(a.merge(b, ""), Err(CgnsError::Reconciliation(_))));
    }

    #[test]
    fn ranks_end_with_equal_shapes() {
        let comms = LocalComm::universe(2);
        let trees: Vec<MultiBlock> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|c| {
                    s.spawn(move || {
                        let owned = |name: &str| {
                            if (name == "a") == (c.rank() == 0) {
                                with_patches()
                            } else {
                                Block::Empty
                            }
                        };
                        let mut t = MultiBlock::new();
                        t.push("Base", group(vec![("a", owned("a")), ("b", owned("b"))]));
                        align_layouts(&c, t).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(trees[0].shape(), trees[1].shape());
        assert_eq!(trees[0].leaves().len(), 2);
        assert_eq!(trees[1].leaves().len(), 2);
    }
}
