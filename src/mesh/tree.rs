//! Composite output trees: named groups of mesh blocks.
//!
//! Readers return a [`MultiBlock`] with one group per base; each group holds
//! one slot per zone. A slot is a mesh, a nested group (multi-piece zones,
//! boundary patches) or an [`Block::Empty`] placeholder that keeps trees
//! structurally identical across ranks.

use crate::mesh::grid::Mesh;
use serde::{Deserialize, Serialize};

/// One slot of a composite tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Block {
    /// Placeholder for data owned by another rank or absent here.
    Empty,
    Mesh(Box<Mesh>),
    Group(MultiBlock),
}

impl Block {
    pub fn mesh(mesh: Mesh) -> Self {
        Block::Mesh(Box::new(mesh))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Block::Empty)
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match self {
            Block::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&MultiBlock> {
        match self {
            Block::Group(g) => Some(g),
            _ => None,
        }
    }

    /// Structure of this slot, ignoring mesh contents.
    pub fn shape(&self) -> BlockShape {
        match self {
            Block::Empty | Block::Mesh(_) => BlockShape::Leaf,
            Block::Group(g) => g.shape(),
        }
    }
}

/// Ordered, named children.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiBlock {
    children: Vec<(String, Block)>,
}

impl MultiBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, block: Block) {
        self.children.push((name.into(), block));
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Block> {
        self.children
            .iter()
            .find_map(|(n, b)| (n == name).then_some(b))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Block> {
        self.children
            .iter_mut()
            .find_map(|(n, b)| (n == name).then_some(b))
    }

    pub fn child(&self, index: usize) -> Option<(&str, &Block)> {
        self.children.get(index).map(|(n, b)| (n.as_str(), b))
    }

    pub fn names(&self) -> Vec<&str> {
        self.children.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Block)> {
        self.children.iter().map(|(n, b)| (n.as_str(), b))
    }

    pub fn into_children(self) -> Vec<(String, Block)> {
        self.children
    }

    /// All meshes in depth-first order, with their slash-joined paths.
    pub fn leaves(&self) -> Vec<(String, &Mesh)> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Mesh)>) {
        for (name, block) in &self.children {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            match block {
                Block::Mesh(m) => out.push((path, m)),
                Block::Group(g) => g.collect_leaves(&path, out),
                Block::Empty => {}
            }
        }
    }

    /// Structure of this group, ignoring mesh contents.
    pub fn shape(&self) -> BlockShape {
        BlockShape::Group(
            self.children
                .iter()
                .map(|(n, b)| (n.clone(), b.shape()))
                .collect(),
        )
    }
}

/// Content-free structure of a composite tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockShape {
    Leaf,
    Group(Vec<(String, BlockShape)>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::grid::{CellArray, Points, UnstructuredGrid};

    fn leaf() -> Block {
        Block::mesh(Mesh::Unstructured(UnstructuredGrid::new(
            Points::from_f64(&[[0.0; 3]]),
            CellArray::new(),
        )))
    }

    #[test]
    fn empty_and_mesh_slots_share_a_shape() {
        let mut a = MultiBlock::new();
        a.push("z", leaf());
        let mut b = MultiBlock::new();
        b.push("z", Block::Empty);
        assert_eq!(a.shape(), b.shape());
        b.push("y", Block::Empty);
        assert_ne!(a.shape(), b.shape());
    }

    #[test]
    fn leaves_report_paths() {
        let mut inner = MultiBlock::new();
        inner.push("p0", leaf());
        inner.push("p1", Block::Empty);
        let mut root = MultiBlock::new();
        root.push("Base", Block::Group(inner));
        let leaves = root.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].0, "Base/p0");
    }
}
