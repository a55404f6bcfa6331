//! Partition reassembler.
//!
//! Partitioned writers split one logical zone into per-process zones
//! named `<zone>_proc-<N>`. On read, fragments are grouped back under the
//! logical name, ranks agree on the tree shape via [`reconcile`], and
//! every rank builds an identically shaped [`MultiBlock`], with
//! [`Block::Empty`] standing in for fragments held elsewhere.

pub mod layout;
pub mod reconcile;

pub use layout::{Layout, align_layouts};
pub use reconcile::{TreeSkeleton, reconcile};

use crate::algs::collective::{TAG_READ_STATUS, share_outcome};
use crate::algs::communicator::Communicator;
use crate::mesh::{Block, MultiBlock};
use crate::mesh_error::CgnsError;
use log::debug;

/// Marker separating a zone name from its partition index.
pub const PARTITION_SUFFIX: &str = "_proc-";

/// Split `name` into its logical part and partition index. Names without
/// a well-formed `_proc-<digits>` tail are returned whole.
pub fn split_partition_suffix(name: &str) -> (&str, Option<usize>) {
    if let Some(pos) = name.rfind(PARTITION_SUFFIX) {
        let digits = &name[pos + PARTITION_SUFFIX.len()..];
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = digits.parse() {
                return (&name[..pos], Some(n));
            }
        }
    }
    (name, None)
}

/// Name of fragment slot `slot` of logical zone `zone`. Slots are
/// positional so every rank names them alike.
pub fn fragment_name(zone: &str, slot: usize) -> String {
    format!("{zone}{PARTITION_SUFFIX}{slot}")
}

#[derive(Debug, Default)]
struct ZoneFragments {
    name: String,
    /// `(order key, block)`; sorted before assembly.
    pieces: Vec<(usize, Block)>,
}

/// Locally read zone fragments, grouped by base and logical zone name.
#[derive(Debug, Default)]
pub struct FragmentCollector {
    bases: Vec<(String, Vec<ZoneFragments>)>,
}

impl FragmentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `base` exists even if this rank reads no zone from it.
    pub fn add_base(&mut self, base: &str) -> usize {
        match self.bases.iter().position(|(b, _)| b == base) {
            Some(i) => i,
            None => {
                self.bases.push((base.to_string(), Vec::new()));
                self.bases.len() - 1
            }
        }
    }

    /// Add one zone read from a file. The partition index in the zone name
    /// orders fragments; `fallback` (usually the file's position in the
    /// series) is used when the name carries none.
    pub fn add(&mut self, base: &str, zone: &str, fallback: usize, block: Block) {
        let (logical, index) = split_partition_suffix(zone);
        let b = self.add_base(base);
        let zones = &mut self.bases[b].1;
        let key = index.unwrap_or(fallback);
        match zones.iter_mut().find(|z| z.name == logical) {
            Some(z) => z.pieces.push((key, block)),
            None => zones.push(ZoneFragments {
                name: logical.to_string(),
                pieces: vec![(key, block)],
            }),
        }
    }

    pub fn skeleton(&self) -> TreeSkeleton {
        let mut sk = TreeSkeleton::default();
        for (base, zones) in &self.bases {
            sk.add_base(base);
            for z in zones {
                sk.add_zone(base, &z.name, z.pieces.len());
            }
        }
        sk
    }

    /// Build the tree for `global`, which must cover this collector. Zones
    /// with one slot become direct children of their base; zones with more
    /// become groups of slots, padded with empties.
    pub fn assemble(mut self, global: &TreeSkeleton) -> Result<MultiBlock, CgnsError> {
        let mut root = MultiBlock::new();
        for (base, zones) in &global.bases {
            let mut local = self
                .bases
                .iter()
                .position(|(b, _)| b == base)
                .map(|i| std::mem::take(&mut self.bases[i].1))
                .unwrap_or_default();
            let mut group = MultiBlock::new();
            for (zone, slots) in zones {
                let mut pieces = match local.iter().position(|z| &z.name == zone) {
                    Some(i) => local.swap_remove(i).pieces,
                    None => Vec::new(),
                };
                if pieces.len() > *slots {
                    return Err(CgnsError::Reconciliation(format!(
                        "zone `{base}/{zone}` has {} local fragments but {slots} agreed slots",
                        pieces.len()
                    )));
                }
                pieces.sort_by_key(|(k, _)| *k);
                let mut blocks: Vec<Block> = pieces.into_iter().map(|(_, b)| b).collect();
                blocks.resize_with(*slots, || Block::Empty);
                if blocks.len() == 1 {
                    group.push(zone.clone(), blocks.remove(0));
                } else {
                    let mut frags = MultiBlock::new();
                    for (slot, block) in blocks.into_iter().enumerate() {
                        frags.push(fragment_name(zone, slot), block);
                    }
                    group.push(zone.clone(), Block::Group(frags));
                }
            }
            if let Some(z) = local.first() {
                return Err(CgnsError::Reconciliation(format!(
                    "zone `{base}/{}` missing from the agreed tree",
                    z.name
                )));
            }
            root.push(base.clone(), Block::Group(group));
        }
        if let Some((b, _)) = self.bases.iter().find(|(b, _)| global.zones(b).is_none()) {
            return Err(CgnsError::Reconciliation(format!(
                "base `{b}` missing from the agreed tree"
            )));
        }
        Ok(root)
    }
}

/// Agree on the tree shape with every rank and assemble the local tree.
/// Padding slots take the shape of the fragment they stand in for.
pub fn reassemble<C: Communicator>(
    comm: &C,
    collector: FragmentCollector,
) -> Result<MultiBlock, CgnsError> {
    let global = reconcile(comm, &collector.skeleton())?;
    debug!(
        "rank {} assembling {} bases from partitioned fragments",
        comm.rank(),
        global.bases.len()
    );
    let assembled = collector.assemble(&global);
    let tree = share_outcome(comm, TAG_READ_STATUS.offset(4), assembled)?;
    align_layouts(comm, tree)
}
