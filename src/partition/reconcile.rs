//! Cross-rank agreement on base/zone names and fragment counts.
//!
//! Each exchange is two-phase: ranks first agree on the longest record
//! list (all-reduce max), pad their own list to that length with all-zero
//! records, then all-gather the fixed-width buffers. Every rank computes
//! the same ordered union from the gathered buffers (rank order, then
//! record order), so the resulting skeletons are identical.

use crate::algs::collective::{TAG_RECONCILE, allgather_bytes, allreduce_max_u64, is_serial};
use crate::algs::communicator::Communicator;
use crate::algs::wire::{WireName, WireZoneCount, cast_slice, records_from_bytes};
use crate::mesh_error::CgnsError;
use log::trace;

/// Shape of a reassembled tree: bases in order, each with its zones and
/// the number of fragment slots per zone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeSkeleton {
    pub bases: Vec<(String, Vec<(String, usize)>)>,
}

impl TreeSkeleton {
    pub fn add_base(&mut self, base: &str) -> usize {
        match self.bases.iter().position(|(b, _)| b == base) {
            Some(i) => i,
            None => {
                self.bases.push((base.to_string(), Vec::new()));
                self.bases.len() - 1
            }
        }
    }

    /// Record `count` fragments for `zone`, keeping the larger count.
    pub fn add_zone(&mut self, base: &str, zone: &str, count: usize) {
        let b = self.add_base(base);
        let zones = &mut self.bases[b].1;
        match zones.iter_mut().find(|(z, _)| z == zone) {
            Some((_, c)) => *c = (*c).max(count),
            None => zones.push((zone.to_string(), count)),
        }
    }

    pub fn zones(&self, base: &str) -> Option<&[(String, usize)]> {
        self.bases
            .iter()
            .find(|(b, _)| b == base)
            .map(|(_, z)| z.as_slice())
    }
}

/// All-gather `local` padded to the run-wide maximum length.
fn exchange<C: Communicator, T: bytemuck::Pod>(
    comm: &C,
    tag_offset: u16,
    local: &[T],
    is_padding: impl Fn(&T) -> bool,
) -> Result<Vec<T>, CgnsError> {
    let mut len = [local.len() as u64];
    allreduce_max_u64(comm, TAG_RECONCILE.offset(tag_offset), &mut len)?;
    let max = len[0] as usize;
    let mut padded = local.to_vec();
    padded.resize(max, T::zeroed());
    let all = allgather_bytes(comm, TAG_RECONCILE.offset(tag_offset + 4), cast_slice(&padded))?;
    let mut out = Vec::with_capacity(max * all.len());
    for (peer, buf) in all.iter().enumerate() {
        let recs: Vec<T> = records_from_bytes(buf)
            .map_err(|reason| CgnsError::CommError { neighbor: peer, reason })?;
        if recs.len() != max {
            return Err(CgnsError::Reconciliation(format!(
                "rank {peer} sent {} records, agreed length is {max}",
                recs.len()
            )));
        }
        out.extend(recs.into_iter().filter(|r| !is_padding(r)));
    }
    Ok(out)
}

/// Union of every rank's skeleton: all base names, all zone names, and
/// the maximum fragment count per zone.
pub fn reconcile<C: Communicator>(comm: &C, local: &TreeSkeleton) -> Result<TreeSkeleton, CgnsError> {
    if is_serial(comm) {
        return Ok(local.clone());
    }
    let base_names: Vec<WireName> = local.bases.iter().map(|(b, _)| WireName::new(b)).collect();
    let all_bases = exchange(comm, 0, &base_names, WireName::is_padding)?;

    let zone_counts: Vec<WireZoneCount> = local
        .bases
        .iter()
        .flat_map(|(b, zones)| zones.iter().map(move |(z, c)| WireZoneCount::new(b, z, *c)))
        .collect();
    let all_zones = exchange(comm, 8, &zone_counts, WireZoneCount::is_padding)?;

    let mut out = TreeSkeleton::default();
    for b in &all_bases {
        out.add_base(&b.to_name());
    }
    for rec in &all_zones {
        out.add_zone(&rec.base.to_name(), &rec.zone.to_name(), rec.count());
    }
    trace!(
        "rank {} reconciled {} bases, {} zone records",
        comm.rank(),
        out.bases.len(),
        all_zones.len()
    );
    Ok(out)
}
