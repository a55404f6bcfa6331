//! In-memory node arena.
//!
//! A [`NodeTree`] is the decoded image of one file: a flat arena of
//! records linked by parent/child indices. Readers only see it through
//! [`CgnsFile`](super::CgnsFile) handles; writers build one directly and
//! hand it to the codec.

use crate::mesh_error::CgnsError;
use crate::node::data_type::{DataType, NodeValue};
use crate::node::label::Label;
use bytes::Bytes;

/// Maximum node name length, in bytes.
pub const MAX_NAME_LEN: usize = 32;

/// Arena index of a node.
pub type NodeId = usize;

/// Typed payload of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeData {
    pub data_type: DataType,
    /// Array shape, first index fastest.
    pub dims: Vec<usize>,
    pub bytes: Bytes,
}

impl NodeData {
    /// Node without a payload.
    pub fn empty() -> Self {
        Self {
            data_type: DataType::Empty,
            dims: Vec::new(),
            bytes: Bytes::new(),
        }
    }

    /// Payload with an explicit shape. `values.len()` must equal the
    /// product of `dims`.
    pub fn array<T: NodeValue>(values: &[T], dims: Vec<usize>) -> Result<Self, CgnsError> {
        let expected: usize = dims.iter().product();
        if expected != values.len() {
            return Err(CgnsError::Parse(format!(
                "payload has {} values but shape {:?} needs {expected}",
                values.len(),
                dims
            )));
        }
        let mut buf = Vec::with_capacity(values.len() * T::DATA_TYPE.size());
        T::encode_le(values, &mut buf);
        Ok(Self {
            data_type: T::DATA_TYPE,
            dims,
            bytes: Bytes::from(buf),
        })
    }

    /// One-dimensional payload.
    pub fn vector<T: NodeValue>(values: &[T]) -> Self {
        let mut buf = Vec::with_capacity(values.len() * T::DATA_TYPE.size());
        T::encode_le(values, &mut buf);
        Self {
            data_type: T::DATA_TYPE,
            dims: vec![values.len()],
            bytes: Bytes::from(buf),
        }
    }

    /// Character payload.
    pub fn text(s: &str) -> Self {
        Self {
            data_type: DataType::Char,
            dims: vec![s.len()],
            bytes: Bytes::copy_from_slice(s.as_bytes()),
        }
    }

    /// Number of elements implied by `dims`.
    pub fn len(&self) -> usize {
        if self.data_type == DataType::Empty {
            0
        } else {
            self.dims.iter().product()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One node record in the arena.
#[derive(Clone, Debug)]
pub struct NodeRecord {
    pub name: String,
    pub label: Label,
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Arena holding every node of one file.
#[derive(Clone, Debug)]
pub struct NodeTree {
    nodes: Vec<NodeRecord>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Tree holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeRecord {
                name: "CGNSTree".to_string(),
                label: Label::Root,
                data: NodeData::empty(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Root node id (always 0).
    pub fn root(&self) -> NodeId {
        0
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Record for `id`.
    pub fn get(&self, id: NodeId) -> Result<&NodeRecord, CgnsError> {
        self.nodes
            .get(id)
            .ok_or_else(|| CgnsError::Parse(format!("dangling node id {id}")))
    }

    /// Append a child under `parent`.
    ///
    /// Sibling names must be unique and at most [`MAX_NAME_LEN`] bytes.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: &str,
        label: Label,
        data: NodeData,
    ) -> Result<NodeId, CgnsError> {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(CgnsError::Parse(format!(
                "node name `{name}` must be 1..={MAX_NAME_LEN} bytes"
            )));
        }
        if self.find_child(parent, name)?.is_some() {
            return Err(CgnsError::Parse(format!(
                "duplicate child `{name}` under `{}`",
                self.get(parent)?.name
            )));
        }
        let id = self.nodes.len();
        self.nodes.push(NodeRecord {
            name: name.to_string(),
            label,
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// Child of `parent` named `name`, if any.
    pub fn find_child(&self, parent: NodeId, name: &str) -> Result<Option<NodeId>, CgnsError> {
        let rec = self.get(parent)?;
        Ok(rec
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].name == name))
    }

    /// Node ids in pre-order (parent before children).
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        out
    }

    pub(crate) fn push_decoded(&mut self, record: NodeRecord) -> NodeId {
        let id = self.nodes.len();
        if let Some(parent) = record.parent {
            self.nodes[parent].children.push(id);
        }
        self.nodes.push(record);
        id
    }

    pub(crate) fn clear_for_decode(&mut self, root: NodeRecord) {
        self.nodes.clear();
        self.nodes.push(root);
    }
}
