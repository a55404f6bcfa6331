//! Root-centred collectives built on tagged point-to-point messages.
//!
//! Every variable-size exchange is two-phase: a [`WireLen`] announcing the
//! payload size on `tag`, then the payload on `tag + 1`. All ranks must
//! enter the same collective with the same tag in the same order; there is
//! no timeout. Every send handle is drained before returning, even on error.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WIRE_VERSION, WireLen, cast_slice, cast_slice_mut, records_from_bytes};
use crate::mesh_error::CgnsError;
use log::trace;

/// Tag for the metadata broadcast.
pub const TAG_METADATA: CommTag = CommTag::new(0x4300);
/// Tag for the file-series descriptor broadcast.
pub const TAG_SERIES: CommTag = CommTag::new(0x4310);
/// Tag for the name-set and fragment-count reconciliation.
pub const TAG_RECONCILE: CommTag = CommTag::new(0x4320);
/// Tag for the mesh gather of the parallel writer.
pub const TAG_WRITE_GATHER: CommTag = CommTag::new(0x4330);
/// Tag for the writer's status fan-out.
pub const TAG_WRITE_STATUS: CommTag = CommTag::new(0x4340);
/// Tag for the slot-layout exchange that shapes placeholders.
pub const TAG_LAYOUT: CommTag = CommTag::new(0x4350);
/// Tag for sharing the outcome of rank-local read steps.
pub const TAG_READ_STATUS: CommTag = CommTag::new(0x4360);
/// Tag for barriers.
pub const TAG_BARRIER: CommTag = CommTag::new(0x43F0);

/// Serial run: collectives reduce to the local value.
pub fn is_serial<C: Communicator>(comm: &C) -> bool {
    comm.is_no_comm() || comm.size() <= 1
}

fn send_framed<C: Communicator>(comm: &C, peer: usize, tag: CommTag, payload: &[u8]) {
    let len = WireLen::new(payload.len());
    comm.isend(peer, tag.as_u16(), cast_slice(std::slice::from_ref(&len)))
        .wait();
    comm.isend(peer, tag.offset(1).as_u16(), payload).wait();
}

fn recv_framed<C: Communicator>(comm: &C, peer: usize, tag: CommTag) -> Result<Vec<u8>, CgnsError> {
    let mut len = WireLen::new(0);
    let got = comm
        .irecv(
            peer,
            tag.as_u16(),
            cast_slice_mut(std::slice::from_mut(&mut len)),
        )
        .wait()
        .ok_or_else(|| CgnsError::CommError {
            neighbor: peer,
            reason: "no length header received".into(),
        })?;
    if got.len() != std::mem::size_of::<WireLen>() {
        return Err(CgnsError::CommError {
            neighbor: peer,
            reason: format!(
                "expected {} bytes for length header, got {}",
                std::mem::size_of::<WireLen>(),
                got.len()
            ),
        });
    }
    cast_slice_mut(std::slice::from_mut(&mut len)).copy_from_slice(&got);
    if len.hdr.version() != WIRE_VERSION || len.hdr.kind() != WireLen::KIND {
        return Err(CgnsError::CommError {
            neighbor: peer,
            reason: format!(
                "unexpected header version {} kind {}",
                len.hdr.version(),
                len.hdr.kind()
            ),
        });
    }
    let n = len.get();
    let mut buf = vec![0u8; n];
    let payload = comm
        .irecv(peer, tag.offset(1).as_u16(), &mut buf)
        .wait()
        .ok_or_else(|| CgnsError::CommError {
            neighbor: peer,
            reason: "no payload received".into(),
        })?;
    if payload.len() != n {
        return Err(CgnsError::CommError {
            neighbor: peer,
            reason: format!("payload length mismatch: expected {n}, got {}", payload.len()),
        });
    }
    Ok(payload)
}

/// Broadcast `data` from `root`. Non-root ranks' input is ignored; every
/// rank returns root's bytes.
pub fn broadcast_bytes<C: Communicator>(
    comm: &C,
    root: usize,
    tag: CommTag,
    data: Vec<u8>,
) -> Result<Vec<u8>, CgnsError> {
    if is_serial(comm) {
        return Ok(data);
    }
    trace!("rank {} broadcast tag {:#x}", comm.rank(), tag.base());
    if comm.rank() == root {
        for peer in (0..comm.size()).filter(|&p| p != root) {
            send_framed(comm, peer, tag, &data);
        }
        Ok(data)
    } else {
        recv_framed(comm, root, tag)
    }
}

/// Gather one byte buffer per rank on `root`, ordered by rank.
/// Returns `None` on non-root ranks.
pub fn gather_bytes<C: Communicator>(
    comm: &C,
    root: usize,
    tag: CommTag,
    local: &[u8],
) -> Result<Option<Vec<Vec<u8>>>, CgnsError> {
    if is_serial(comm) {
        return Ok(Some(vec![local.to_vec()]));
    }
    trace!("rank {} gather tag {:#x}", comm.rank(), tag.base());
    if comm.rank() == root {
        let mut out = Vec::with_capacity(comm.size());
        let mut first_err = None;
        for peer in 0..comm.size() {
            if peer == root {
                out.push(local.to_vec());
                continue;
            }
            // keep draining peers after a failure so nobody is left blocked
            match recv_framed(comm, peer, tag) {
                Ok(buf) => out.push(buf),
                Err(e) => {
                    out.push(Vec::new());
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(Some(out)),
        }
    } else {
        send_framed(comm, root, tag, local);
        Ok(None)
    }
}

/// Every rank receives every rank's buffer, ordered by rank. A failed
/// gather on root is broadcast too, so every rank returns the error.
pub fn allgather_bytes<C: Communicator>(
    comm: &C,
    tag: CommTag,
    local: &[u8],
) -> Result<Vec<Vec<u8>>, CgnsError> {
    if is_serial(comm) {
        return Ok(vec![local.to_vec()]);
    }
    let gathered = gather_bytes(comm, 0, tag, local);
    let packed = if comm.rank() == 0 {
        let outcome: Result<Vec<Vec<u8>>, String> = gathered
            .map(Option::unwrap_or_default)
            .map_err(|e| e.to_string());
        // an unencodable outcome arrives empty and fails to decode everywhere
        bincode::serialize(&outcome).unwrap_or_default()
    } else {
        Vec::new()
    };
    let packed = broadcast_bytes(comm, 0, tag.offset(2), packed)?;
    let outcome: Result<Vec<Vec<u8>>, String> = bincode::deserialize(&packed)?;
    outcome.map_err(|reason| CgnsError::CommError {
        neighbor: 0,
        reason,
    })
}

/// Share the outcome of a rank-local step. If any rank failed, every rank
/// returns an error (its own, or the first failing peer's) instead of
/// continuing into a collective the failed rank will never join.
pub fn share_outcome<C: Communicator, T>(
    comm: &C,
    tag: CommTag,
    local: Result<T, CgnsError>,
) -> Result<T, CgnsError> {
    if is_serial(comm) {
        return local;
    }
    let status = match &local {
        Ok(_) => Vec::new(),
        Err(e) => e.to_string().into_bytes(),
    };
    let all = allgather_bytes(comm, tag, &status)?;
    let Some((peer, reason)) = all.iter().enumerate().find(|(_, s)| !s.is_empty()) else {
        return local;
    };
    local?;
    Err(CgnsError::CommError {
        neighbor: peer,
        reason: format!("peer failed: {}", String::from_utf8_lossy(reason)),
    })
}

/// Element-wise maximum of `values` across ranks, written back in place.
/// All ranks must pass the same number of values.
pub fn allreduce_max_u64<C: Communicator>(
    comm: &C,
    tag: CommTag,
    values: &mut [u64],
) -> Result<(), CgnsError> {
    if is_serial(comm) {
        return Ok(());
    }
    let local: Vec<u64> = values.iter().map(|v| v.to_le()).collect();
    let all = allgather_bytes(comm, tag, cast_slice(&local))?;
    for (peer, buf) in all.iter().enumerate() {
        let theirs: Vec<u64> = records_from_bytes(buf)
            .map_err(|reason| CgnsError::CommError { neighbor: peer, reason })?;
        if theirs.len() != values.len() {
            return Err(CgnsError::Reconciliation(format!(
                "rank {peer} reduced {} values, expected {}",
                theirs.len(),
                values.len()
            )));
        }
        for (v, t) in values.iter_mut().zip(theirs) {
            *v = (*v).max(u64::from_le(t));
        }
    }
    Ok(())
}

/// Block until every rank has arrived.
pub fn barrier<C: Communicator>(comm: &C) -> Result<(), CgnsError> {
    let mut token = [0u64];
    allreduce_max_u64(comm, TAG_BARRIER, &mut token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{LocalComm, NoComm};

    fn run<T: Send>(size: usize, f: impl Fn(LocalComm) -> T + Sync) -> Vec<T> {
        let comms = LocalComm::universe(size);
        std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|c| {
                    let f = &f;
                    s.spawn(move || f(c))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn broadcast_delivers_root_payload() {
        let got = run(3, |c| {
            let mine = if c.rank() == 0 { b"meta".to_vec() } else { Vec::new() };
            broadcast_bytes(&c, 0, TAG_METADATA, mine).unwrap()
        });
        assert!(got.iter().all(|g| g == b"meta"));
    }

    #[test]
    fn gather_orders_by_rank() {
        let got = run(3, |c| {
            gather_bytes(&c, 0, TAG_WRITE_GATHER, &[c.rank() as u8; 2]).unwrap()
        });
        assert_eq!(got[0], Some(vec![vec![0, 0], vec![1, 1], vec![2, 2]]));
        assert!(got[1].is_none() && got[2].is_none());
    }

    #[test]
    fn allreduce_takes_elementwise_max() {
        let got = run(4, |c| {
            let r = c.rank() as u64;
            let mut v = [r, 10 - r, 5];
            allreduce_max_u64(&c, TAG_RECONCILE, &mut v).unwrap();
            v
        });
        assert!(got.iter().all(|v| *v == [3, 10, 5]));
    }

    #[test]
    fn a_local_failure_fails_every_rank() {
        let got = run(3, |c| {
            let local = if c.rank() == 1 {
                Err(CgnsError::Io("disk gone".into()))
            } else {
                Ok(c.rank())
            };
            share_outcome(&c, TAG_READ_STATUS, local)
        });
        assert_eq!(got[1], Err(CgnsError::Io("disk gone".into())));
        for rank in [0, 2] {
            match &got[rank] {
                Err(CgnsError::CommError { neighbor, reason }) => {
                    assert_eq!(*neighbor, 1);
                    assert!(reason.contains("disk gone"));
                }
                other => panic!("rank {rank}: {other:?}"),
            }
        }
        let fine = run(2, |c| share_outcome(&c, TAG_READ_STATUS, Ok(c.rank())));
        assert_eq!(fine, vec![Ok(0), Ok(1)]);
    }

    #[test]
    fn single_rank_collectives_are_identity() {
        let c = NoComm;
        assert_eq!(broadcast_bytes(&c, 0, TAG_METADATA, vec![1]).unwrap(), vec![1]);
        assert_eq!(allgather_bytes(&c, TAG_RECONCILE, &[2]).unwrap(), vec![vec![2]]);
        barrier(&c).unwrap();
    }
}
