#![cfg_attr(docsrs, feature(doc_cfg))]
//! # cgns-sieve
//!
//! cgns-sieve reads and writes CGNS-style hierarchical mesh files from one
//! process or from many cooperating ranks. Every rank of a parallel read
//! receives a composite tree of identical shape, holding its own share of
//! the zones and empty placeholders elsewhere.
//!
//! ## Layers
//! - [`node`]: typed reads over the node store, scoped handles from a
//!   finite table.
//! - [`meta`]: per-base summaries (dimensions, times, families, field
//!   catalogs) without bulk reads, broadcastable to all ranks.
//! - [`zone`]: structured and unstructured zone materialization, vector
//!   reassembly, NGON/NFACE polyhedra and boundary patches.
//! - [`series`]: temporal versus partitioned classification of file lists.
//! - [`partition`]: reassembly of `_proc-N` zone fragments with cross-rank
//!   reconciliation of the tree shape.
//! - [`io`]: the reader request cycle, the serial writer and the rank-0
//!   gather writer.
//! - [`algs`]: the [`Communicator`](algs::communicator::Communicator)
//!   backends (serial, threads, MPI) and collectives.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! cgns-sieve = "0.3"
//! # features = ["mpi-support"]
//! ```
//!
//! ```no_run
//! use cgns_sieve::prelude::*;
//!
//! # fn main() -> Result<(), CgnsError> {
//! let mut reader = CgnsReader::new("flow.cgns");
//! let info = reader.request_information()?;
//! reader.request_update_extent(info.times[0], 0, 1);
//! let out = reader.request_data()?;
//! for (path, mesh) in out.tree.leaves() {
//!     println!("{path}: {} points", mesh.num_points());
//! }
//! # Ok(())
//! # }
//! ```

pub mod algs;
pub mod debug_invariants;
pub mod io;
pub mod mesh;
pub mod mesh_error;
pub mod meta;
pub mod node;
pub mod partition;
pub mod series;
pub mod zone;

pub use debug_invariants::DebugInvariants;

/// Most-used types in one import.
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::io::{
        CgnsReader, CgnsWriter, ReadOutput, ReaderInformation, ReaderOptions, WriterOptions,
        write_parallel,
    };
    pub use crate::mesh::{
        ArrayData, Block, CellArray, CellType, FieldArray, Mesh, MultiBlock, Points, Precision,
        StructuredGrid, UnstructuredGrid,
    };
    pub use crate::mesh_error::CgnsError;
    pub use crate::meta::{BaseInfo, CgnsMetadata};
    pub use crate::series::{FileSeries, SeriesKind};
    pub use crate::zone::{FieldSelection, ReadWarning};
}
