//! Collective write: every rank contributes a tree of the same shape, rank
//! 0 merges and writes one file.
//!
//! Slots are merged position by position. A slot that holds a mesh on more
//! than one rank becomes one unstructured mesh with coincident points
//! merged; a slot held by one rank is written as is. The outcome on rank 0
//! is shared so every rank returns the same result.

use crate::algs::collective::{
    TAG_WRITE_GATHER, TAG_WRITE_STATUS, broadcast_bytes, gather_bytes, is_serial,
};
use crate::algs::communicator::Communicator;
use crate::io::writer::CgnsWriter;
use crate::mesh::{Block, Mesh, MultiBlock, append_meshes};
use crate::mesh_error::CgnsError;
use log::{debug, info};
use std::path::Path;

/// Merge the per-rank contributions of one slot.
pub fn merge_blocks(pieces: &[Block]) -> Result<Block, CgnsError> {
    let Some(first) = pieces.first() else {
        return Ok(Block::Empty);
    };
    if let Some(other) = pieces.iter().find(|b| b.shape() != first.shape()) {
        return Err(CgnsError::Reconciliation(format!(
            "ranks disagree on tree shape: {:?} vs {:?}",
            first.shape(),
            other.shape()
        )));
    }
    let groups: Vec<&MultiBlock> = pieces.iter().filter_map(Block::as_group).collect();
    if !groups.is_empty() {
        // shapes are equal, so every piece is a group with the same names
        let mut out = MultiBlock::new();
        for (i, (name, _)) in groups[0].iter().enumerate() {
            let column: Vec<Block> = groups
                .iter()
                .filter_map(|g| g.child(i).map(|(_, b)| b.clone()))
                .collect();
            out.push(name, merge_blocks(&column)?);
        }
        return Ok(Block::Group(out));
    }
    let meshes: Vec<&Mesh> = pieces.iter().filter_map(Block::as_mesh).collect();
    match meshes.len() {
        0 => Ok(Block::Empty),
        1 => Ok(Block::mesh(meshes[0].clone())),
        n => {
            debug!("merging {n} pieces of one slot");
            Ok(Block::mesh(append_meshes(&meshes, true)?))
        }
    }
}

/// Write `local` collectively to `path`. Only rank 0 touches the file.
pub fn write_parallel<C: Communicator>(
    comm: &C,
    writer: &CgnsWriter,
    path: impl AsRef<Path>,
    local: &Block,
) -> Result<(), CgnsError> {
    let path = path.as_ref();
    if is_serial(comm) {
        return writer.write(path, local);
    }
    let payload = bincode::serialize(local)?;
    let gathered = gather_bytes(comm, 0, TAG_WRITE_GATHER, &payload);

    let status = if comm.rank() == 0 {
        let outcome = gathered.and_then(|parts| {
            let pieces = parts
                .unwrap_or_default()
                .iter()
                .map(|buf| bincode::deserialize::<Block>(buf).map_err(CgnsError::from))
                .collect::<Result<Vec<_>, _>>()?;
            let merged = merge_blocks(&pieces)?;
            info!("rank 0 writing {} from {} ranks", path.display(), pieces.len());
            writer.write(path, &merged)
        });
        match outcome {
            Ok(()) => Vec::new(),
            Err(e) => e.to_string().into_bytes(),
        }
    } else {
        gathered?;
        Vec::new()
    };
    let status = broadcast_bytes(comm, 0, TAG_WRITE_STATUS, status)?;
    if status.is_empty() {
        Ok(())
    } else {
        Err(CgnsError::Io(String::from_utf8_lossy(&status).into_owned()))
    }
}
