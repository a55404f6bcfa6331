//! Node-tree accessor: typed reads over the hierarchical node store.
//!
//! [`CgnsFile`] owns one decoded file and its handle table. Every node is
//! reached through a scoped [`NodeRef`]; reads check the declared element
//! type against the requested Rust type and fail with
//! [`CgnsError::DataTypeMismatch`] rather than casting.
//!
//! Scans that filter by label ([`CgnsFile::children_with_label`]) release
//! non-matching handles as soon as the label is inspected, so a wide node
//! never holds more handles than it has matches.

pub mod codec;
pub mod data_type;
pub mod handle;
pub mod label;
pub mod tree;

pub use data_type::{DataType, NodeValue};
pub use handle::{DEFAULT_HANDLE_CAPACITY, HandleTable, NodeRef};
pub use label::Label;
pub use tree::{NodeData, NodeId, NodeTree};

use crate::mesh_error::CgnsError;
use log::trace;
use std::path::{Path, PathBuf};

/// An open node store.
#[derive(Debug)]
pub struct CgnsFile {
    path: PathBuf,
    tree: NodeTree,
    handles: HandleTable,
}

impl CgnsFile {
    /// Open and decode the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CgnsError> {
        Self::open_with_capacity(path, DEFAULT_HANDLE_CAPACITY)
    }

    /// Open with an explicit handle-table capacity.
    pub fn open_with_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<Self, CgnsError> {
        let path = path.as_ref();
        let tree = codec::load(path).map_err(|e| match e {
            CgnsError::Io(msg) => CgnsError::Io(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        trace!("opened {} ({} nodes)", path.display(), tree.len());
        Ok(Self {
            path: path.to_path_buf(),
            tree,
            handles: HandleTable::new(capacity),
        })
    }

    /// Wrap an in-memory tree.
    pub fn from_tree(tree: NodeTree, capacity: usize) -> Self {
        Self {
            path: PathBuf::new(),
            tree,
            handles: HandleTable::new(capacity),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of handles currently open on this file.
    pub fn open_handles(&self) -> usize {
        self.handles.open()
    }

    /// Handle on the root node.
    pub fn root(&self) -> Result<NodeRef<'_>, CgnsError> {
        let rec = self.tree.get(self.tree.root())?;
        self.handles.handle(self.tree.root(), &rec.name, &rec.label)
    }

    /// Handles on every child of `node`, in stored order.
    pub fn children(&self, node: &NodeRef<'_>) -> Result<Vec<NodeRef<'_>>, CgnsError> {
        let rec = self.tree.get(node.id())?;
        rec.children
            .iter()
            .map(|&c| {
                let child = self.tree.get(c)?;
                self.handles.handle(c, &child.name, &child.label)
            })
            .collect()
    }

    /// Handles on the children of `node` that carry `label`.
    pub fn children_with_label(
        &self,
        node: &NodeRef<'_>,
        label: &Label,
    ) -> Result<Vec<NodeRef<'_>>, CgnsError> {
        let rec = self.tree.get(node.id())?;
        let mut out = Vec::new();
        for &c in &rec.children {
            let child = self.tree.get(c)?;
            let handle = self.handles.handle(c, &child.name, &child.label)?;
            if handle.is(label) {
                out.push(handle);
            }
            // non-matching handles drop here
        }
        Ok(out)
    }

    /// First child of `node` with `label` (and `name`, when given).
    pub fn find_first_child(
        &self,
        node: &NodeRef<'_>,
        label: &Label,
        name: Option<&str>,
    ) -> Result<NodeRef<'_>, CgnsError> {
        self.try_find_first_child(node, label, name)?
            .ok_or_else(|| CgnsError::NotFound {
                label: label.to_string(),
                name: name.map(str::to_string),
            })
    }

    /// Like [`find_first_child`](Self::find_first_child) but `Ok(None)`
    /// when absent.
    pub fn try_find_first_child(
        &self,
        node: &NodeRef<'_>,
        label: &Label,
        name: Option<&str>,
    ) -> Result<Option<NodeRef<'_>>, CgnsError> {
        let rec = self.tree.get(node.id())?;
        for &c in &rec.children {
            let child = self.tree.get(c)?;
            let handle = self.handles.handle(c, &child.name, &child.label)?;
            if handle.is(label) && name.is_none_or(|n| handle.name() == n) {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    /// Declared element type of `node`.
    pub fn data_type(&self, node: &NodeRef<'_>) -> Result<DataType, CgnsError> {
        Ok(self.tree.get(node.id())?.data.data_type)
    }

    /// Declared shape of `node`.
    pub fn dims(&self, node: &NodeRef<'_>) -> Result<&[usize], CgnsError> {
        Ok(&self.tree.get(node.id())?.data.dims)
    }

    /// Payload of `node` as `T`. Fails if the declared type is not `T`.
    pub fn read_array<T: NodeValue>(&self, node: &NodeRef<'_>) -> Result<Vec<T>, CgnsError> {
        let data = &self.tree.get(node.id())?.data;
        if data.data_type != T::DATA_TYPE {
            return Err(CgnsError::DataTypeMismatch {
                node: node.name().to_string(),
                declared: data.data_type.code(),
                requested: T::DATA_TYPE.code(),
            });
        }
        Ok(T::decode_le(&data.bytes))
    }

    /// First element of the payload of `node`.
    pub fn read_scalar<T: NodeValue>(&self, node: &NodeRef<'_>) -> Result<T, CgnsError> {
        self.read_array::<T>(node)?
            .first()
            .copied()
            .ok_or_else(|| CgnsError::Parse(format!("node `{}` has no payload", node.name())))
    }

    /// Character payload of `node`, trailing blanks and NULs trimmed.
    pub fn read_string(&self, node: &NodeRef<'_>) -> Result<String, CgnsError> {
        let raw = self.read_array::<u8>(node)?;
        let s = String::from_utf8_lossy(&raw);
        Ok(s.trim_end_matches(['\0', ' ']).to_string())
    }

    /// Integer payload widened to `i64`. Accepts `I4` and `I8` only.
    pub fn read_index_array(&self, node: &NodeRef<'_>) -> Result<Vec<i64>, CgnsError> {
        match self.data_type(node)? {
            DataType::Int32 => Ok(self
                .read_array::<i32>(node)?
                .into_iter()
                .map(i64::from)
                .collect()),
            DataType::Int64 => self.read_array::<i64>(node),
            other => Err(CgnsError::DataTypeMismatch {
                node: node.name().to_string(),
                declared: other.code(),
                requested: "I4|I8",
            }),
        }
    }

    /// Real payload widened to `f64`. Accepts `R4` and `R8` only.
    pub fn read_real_scalar(&self, node: &NodeRef<'_>) -> Result<f64, CgnsError> {
        match self.data_type(node)? {
            DataType::Float32 => Ok(f64::from(self.read_scalar::<f32>(node)?)),
            DataType::Float64 => self.read_scalar::<f64>(node),
            other => Err(CgnsError::DataTypeMismatch {
                node: node.name().to_string(),
                declared: other.code(),
                requested: "R4|R8",
            }),
        }
    }

    /// Split a character matrix of shape `[width, count]` into `count`
    /// trimmed strings.
    pub fn read_string_list(&self, node: &NodeRef<'_>) -> Result<Vec<String>, CgnsError> {
        let dims = self.dims(node)?.to_vec();
        let raw = self.read_array::<u8>(node)?;
        let width = match dims.as_slice() {
            [w, _] if *w > 0 => *w,
            [w] if *w > 0 => *w,
            _ => return Ok(Vec::new()),
        };
        Ok(raw
            .chunks(width)
            .map(|c| {
                String::from_utf8_lossy(c)
                    .trim_end_matches(['\0', ' '])
                    .to_string()
            })
            .collect())
    }
}
