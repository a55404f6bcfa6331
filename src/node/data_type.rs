//! Element types declared by node payloads.
//!
//! Every payload carries a two-character type code (`MT`, `C1`, `I4`,
//! `I8`, `R4`, `R8`). Typed reads go through [`NodeValue`], which ties a
//! Rust scalar to exactly one code so that a mismatch is detected instead
//! of silently cast.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Declared element type of a node payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// No payload (`MT`).
    Empty,
    /// Character data (`C1`).
    Char,
    /// 32-bit signed integer (`I4`).
    Int32,
    /// 64-bit signed integer (`I8`).
    Int64,
    /// Single precision real (`R4`).
    Float32,
    /// Double precision real (`R8`).
    Float64,
}

impl DataType {
    /// Two-character type code as stored in the file.
    pub fn code(self) -> &'static str {
        match self {
            DataType::Empty => "MT",
            DataType::Char => "C1",
            DataType::Int32 => "I4",
            DataType::Int64 => "I8",
            DataType::Float32 => "R4",
            DataType::Float64 => "R8",
        }
    }

    /// Parse a stored type code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "MT" => Some(DataType::Empty),
            "C1" => Some(DataType::Char),
            "I4" => Some(DataType::Int32),
            "I8" => Some(DataType::Int64),
            "R4" => Some(DataType::Float32),
            "R8" => Some(DataType::Float64),
            _ => None,
        }
    }

    /// Size in bytes of one element.
    pub fn size(self) -> usize {
        match self {
            DataType::Empty => 0,
            DataType::Char => 1,
            DataType::Int32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::Float64 => 8,
        }
    }

    /// `true` for `R4`/`R8`.
    pub fn is_real(self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// `true` for `I4`/`I8`.
    pub fn is_integer(self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A scalar that can be stored in, and read back from, a node payload.
///
/// All payloads are little-endian on disk.
pub trait NodeValue: Copy + Default + Send + Sync + 'static {
    /// The one type code this scalar maps to.
    const DATA_TYPE: DataType;

    /// Decode a little-endian byte run. `bytes.len()` is a multiple of the
    /// element size; trailing bytes are ignored.
    fn decode_le(bytes: &[u8]) -> Vec<Self>;

    /// Append the little-endian encoding of `values`.
    fn encode_le<B: BufMut>(values: &[Self], out: &mut B);
}

macro_rules! impl_node_value {
    ($t:ty, $dt:expr, $put:ident) => {
        impl NodeValue for $t {
            const DATA_TYPE: DataType = $dt;

            fn decode_le(bytes: &[u8]) -> Vec<Self> {
                const N: usize = std::mem::size_of::<$t>();
                bytes
                    .chunks_exact(N)
                    .map(|chunk| {
                        let mut raw = [0u8; N];
                        raw.copy_from_slice(chunk);
                        <$t>::from_le_bytes(raw)
                    })
                    .collect()
            }

            fn encode_le<B: BufMut>(values: &[Self], out: &mut B) {
                for &v in values {
                    out.$put(v);
                }
            }
        }
    };
}

impl_node_value!(i32, DataType::Int32, put_i32_le);
impl_node_value!(i64, DataType::Int64, put_i64_le);
impl_node_value!(f32, DataType::Float32, put_f32_le);
impl_node_value!(f64, DataType::Float64, put_f64_le);

impl NodeValue for u8 {
    const DATA_TYPE: DataType = DataType::Char;

    fn decode_le(bytes: &[u8]) -> Vec<Self> {
        bytes.to_vec()
    }

    fn encode_le<B: BufMut>(values: &[Self], out: &mut B) {
        out.put_slice(values);
    }
}
