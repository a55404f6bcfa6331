//! Fixed, versioned, little-endian wire types for the collectives.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use std::mem::{align_of, size_of};

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Decode a byte buffer into records, copying so alignment never matters.
pub fn records_from_bytes<T: Pod>(bytes: &[u8]) -> Result<Vec<T>, String> {
    if bytes.len() % size_of::<T>() != 0 {
        return Err(format!(
            "{} bytes is not a multiple of the {}-byte record size",
            bytes.len(),
            size_of::<T>()
        ));
    }
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

/// Width of a fixed name slot. Node names are at most this long.
pub const NAME_WIDTH: usize = 32;

/// All multi-byte integers in these structs are **little-endian** on the wire.
/// We store them pre-LE with `.to_le()` and decode with `.from_le()`.

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireHdr {
    pub version_le: u16,
    pub kind_le: u16,
    pub reserved_le: u32, // keep zero
}

impl WireHdr {
    pub fn new(kind: u16) -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: kind.to_le(),
            reserved_le: 0,
        }
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
}

/// Payload length announced before a variable-size message.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireLen {
    pub hdr: WireHdr,
    pub n_le: u64,
}

impl WireLen {
    pub const KIND: u16 = 1;

    pub fn new(n: usize) -> Self {
        Self {
            hdr: WireHdr::new(Self::KIND),
            n_le: (n as u64).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u64::from_le(self.n_le) as usize
    }
}

/// One name in a fixed-width slot, NUL padded. An all-zero slot is padding.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireName {
    pub bytes: [u8; NAME_WIDTH],
}

impl WireName {
    /// Encode `name`, truncating at [`NAME_WIDTH`] bytes.
    pub fn new(name: &str) -> Self {
        let mut bytes = [0u8; NAME_WIDTH];
        let raw = name.as_bytes();
        let n = raw.len().min(NAME_WIDTH);
        bytes[..n].copy_from_slice(&raw[..n]);
        Self { bytes }
    }

    pub fn is_padding(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    pub fn to_name(&self) -> String {
        let end = self
            .bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_WIDTH);
        String::from_utf8_lossy(&self.bytes[..end]).into_owned()
    }
}

/// `(base, zone)` pair plus a count, used to agree on fragment counts.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireZoneCount {
    pub base: WireName,
    pub zone: WireName,
    pub count_le: u64,
}

impl WireZoneCount {
    pub fn new(base: &str, zone: &str, count: usize) -> Self {
        Self {
            base: WireName::new(base),
            zone: WireName::new(zone),
            count_le: (count as u64).to_le(),
        }
    }
    pub fn count(&self) -> usize {
        u64::from_le(self.count_le) as usize
    }
    pub fn is_padding(&self) -> bool {
        self.base.is_padding() && self.zone.is_padding()
    }
}

// ===== Compile-time sanity checks =========================================

const_assert_eq!(size_of::<WireHdr>(), 8);
const_assert_eq!(size_of::<WireLen>(), 16);
const_assert_eq!(size_of::<WireName>(), NAME_WIDTH);
const_assert_eq!(size_of::<WireZoneCount>(), 2 * NAME_WIDTH + 8);
const_assert_eq!(align_of::<WireZoneCount>(), 8);
