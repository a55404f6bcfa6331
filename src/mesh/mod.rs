//! In-memory mesh model produced by the reader and consumed by the writers.
//!
//! A file maps onto a [`MultiBlock`] tree whose leaves are [`Mesh`] blocks,
//! either structured (implicit i-fastest connectivity) or unstructured
//! (explicit cells, including polygons and polyhedra).

pub mod append;
pub mod array;
pub mod cell_type;
pub mod grid;
pub mod tree;

pub use append::{append_meshes, structured_to_unstructured};
pub use array::{ArrayData, Attributes, FieldArray, Precision};
pub use cell_type::CellType;
pub use grid::{CellArray, Mesh, Points, StructuredGrid, UnstructuredGrid};
pub use tree::{Block, BlockShape, MultiBlock};
