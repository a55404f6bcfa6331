//! Binary container for a [`NodeTree`].
//!
//! # Layout
//! All integers little-endian.
//! - header: magic `b"CGNSNODE"`, `u16` version, `u64` node count
//! - one record per node, in pre-order:
//!   `i64` parent index (-1 for the root), `u16`-prefixed name,
//!   `u16`-prefixed label, 2-byte type code, `u8` rank, `u64` per
//!   dimension, `u64`-prefixed payload bytes.
//!
//! Decoding keeps payloads as zero-copy slices of the file image.

use crate::mesh_error::CgnsError;
use crate::node::data_type::DataType;
use crate::node::label::Label;
use crate::node::tree::{NodeData, NodeRecord, NodeTree};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::path::Path;

const MAGIC: &[u8; 8] = b"CGNSNODE";
/// Bump when the record layout changes.
pub const FORMAT_VERSION: u16 = 1;

/// Serialize `tree` into a file image.
pub fn encode(tree: &NodeTree) -> Result<Bytes, CgnsError> {
    let order = tree.preorder();
    let mut position = vec![0usize; tree.len()];
    for (pos, &id) in order.iter().enumerate() {
        position[id] = pos;
    }

    let mut out = BytesMut::with_capacity(64 * order.len());
    out.put_slice(MAGIC);
    out.put_u16_le(FORMAT_VERSION);
    out.put_u64_le(order.len() as u64);
    for &id in &order {
        let rec = tree.get(id)?;
        let parent = rec.parent.map_or(-1i64, |p| position[p] as i64);
        out.put_i64_le(parent);
        put_str(&mut out, &rec.name)?;
        put_str(&mut out, rec.label.as_str())?;
        out.put_slice(rec.data.data_type.code().as_bytes());
        let rank = u8::try_from(rec.data.dims.len())
            .map_err(|_| CgnsError::Parse(format!("node `{}` has too many dimensions", rec.name)))?;
        out.put_u8(rank);
        for &d in &rec.data.dims {
            out.put_u64_le(d as u64);
        }
        out.put_u64_le(rec.data.bytes.len() as u64);
        out.put_slice(&rec.data.bytes);
    }
    Ok(out.freeze())
}

/// Rebuild a tree from a file image.
pub fn decode(mut buf: Bytes) -> Result<NodeTree, CgnsError> {
    need(&buf, MAGIC.len() + 2 + 8, "header")?;
    if &buf[..MAGIC.len()] != MAGIC {
        return Err(CgnsError::Io("not a CGNS node file (bad magic)".into()));
    }
    buf.advance(MAGIC.len());
    let version = buf.get_u16_le();
    if version != FORMAT_VERSION {
        return Err(CgnsError::Parse(format!(
            "unsupported node file version {version}"
        )));
    }
    let count = buf.get_u64_le() as usize;
    if count == 0 {
        return Err(CgnsError::Parse("node file has no root".into()));
    }

    let mut tree = NodeTree::new();
    for index in 0..count {
        need(&buf, 8, "parent index")?;
        let parent = buf.get_i64_le();
        let name = get_str(&mut buf)?;
        let label = Label::parse(&get_str(&mut buf)?);
        need(&buf, 3, "type code")?;
        let code = std::str::from_utf8(&buf[..2])
            .map_err(|_| CgnsError::Parse("type code is not ASCII".into()))?;
        let data_type = DataType::from_code(code)
            .ok_or_else(|| CgnsError::Parse(format!("unknown data type `{code}`")))?;
        buf.advance(2);
        let rank = buf.get_u8() as usize;
        need(&buf, rank * 8 + 8, "dimensions")?;
        let dims: Vec<usize> = (0..rank).map(|_| buf.get_u64_le() as usize).collect();
        let len = buf.get_u64_le() as usize;
        need(&buf, len, "payload")?;
        let bytes = buf.copy_to_bytes(len);
        let expected = dims
            .iter()
            .try_fold(data_type.size(), |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| {
                CgnsError::Parse(format!("node `{name}` dimensions {dims:?} overflow"))
            })?;
        if data_type != DataType::Empty && bytes.len() != expected {
            return Err(CgnsError::Parse(format!(
                "node `{name}` declares {expected} payload bytes, found {}",
                bytes.len()
            )));
        }

        let data = NodeData {
            data_type,
            dims,
            bytes,
        };
        let parent = match (index, parent) {
            (0, -1) => None,
            (0, _) => return Err(CgnsError::Parse("first record must be the root".into())),
            (_, p) if p >= 0 && (p as usize) < index => Some(p as usize),
            (_, p) => {
                return Err(CgnsError::Parse(format!(
                    "node `{name}` has invalid parent index {p}"
                )));
            }
        };
        let record = NodeRecord {
            name,
            label,
            data,
            parent,
            children: Vec::new(),
        };
        if index == 0 {
            tree.clear_for_decode(record);
        } else {
            tree.push_decoded(record);
        }
    }
    Ok(tree)
}

/// Encode `tree` and write it to `path`.
pub fn save(tree: &NodeTree, path: impl AsRef<Path>) -> Result<(), CgnsError> {
    let bytes = encode(tree)?;
    std::fs::write(path, &bytes)?;
    Ok(())
}

/// Read and decode the file at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<NodeTree, CgnsError> {
    let raw = std::fs::read(path)?;
    decode(Bytes::from(raw))
}

fn need(buf: &Bytes, n: usize, what: &str) -> Result<(), CgnsError> {
    if buf.remaining() < n {
        Err(CgnsError::Parse(format!("truncated node file while reading {what}")))
    } else {
        Ok(())
    }
}

fn put_str(out: &mut BytesMut, s: &str) -> Result<(), CgnsError> {
    let len = u16::try_from(s.len())
        .map_err(|_| CgnsError::Parse(format!("string too long: {} bytes", s.len())))?;
    out.put_u16_le(len);
    out.put_slice(s.as_bytes());
    Ok(())
}

fn get_str(buf: &mut Bytes) -> Result<String, CgnsError> {
    need(buf, 2, "string length")?;
    let len = buf.get_u16_le() as usize;
    need(buf, len, "string")?;
    let raw = buf.copy_to_bytes(len);
    String::from_utf8(raw.to_vec()).map_err(|_| CgnsError::Parse("string is not UTF-8".into()))
}
