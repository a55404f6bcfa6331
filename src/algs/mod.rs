//! Message passing and the collectives built on it.

pub mod collective;
pub mod communicator;
pub mod wire;

pub use collective::{
    allgather_bytes, allreduce_max_u64, barrier, broadcast_bytes, gather_bytes, is_serial,
    share_outcome,
};
pub use communicator::{CommTag, Communicator, LocalComm, NoComm, Wait};
#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
