//! Reader and writers over the CGNS node store.
//!
//! [`CgnsReader`] implements the information / update-extent / data request
//! cycle over one file or a file series. [`CgnsWriter`] writes a composite
//! tree from one process; [`write_parallel`] gathers every rank's tree to
//! rank 0 and writes it there.

pub mod parallel_write;
pub mod reader;
pub mod writer;

pub use parallel_write::{merge_blocks, write_parallel};
pub use reader::{CgnsReader, ReadOutput, ReaderInformation, ReaderOptions, UpdateExtent};
pub use writer::{CgnsWriter, WriterOptions};
