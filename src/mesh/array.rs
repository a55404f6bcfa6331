//! Typed data arrays and named attribute sets.

use crate::mesh_error::CgnsError;
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Floating point precision requested for coordinates and real fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Precision {
    Single,
    #[default]
    Double,
}

/// Flat, interleaved array storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
}

macro_rules! each_variant {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            ArrayData::F32($v) => $body,
            ArrayData::F64($v) => $body,
            ArrayData::I32($v) => $body,
            ArrayData::I64($v) => $body,
            ArrayData::U8($v) => $body,
        }
    };
}

fn widen<T: AsPrimitive<f64>>(v: &[T]) -> Vec<f64> {
    v.iter().map(|x| x.as_()).collect()
}

fn narrow<T: AsPrimitive<f32>>(v: &[T]) -> Vec<f32> {
    v.iter().map(|x| x.as_()).collect()
}

impl ArrayData {
    /// Number of scalar values.
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short type name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ArrayData::F32(_) => "f32",
            ArrayData::F64(_) => "f64",
            ArrayData::I32(_) => "i32",
            ArrayData::I64(_) => "i64",
            ArrayData::U8(_) => "u8",
        }
    }

    /// `true` if both arrays use the same variant.
    pub fn same_kind(&self, other: &ArrayData) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Empty array of the same variant.
    pub fn empty_like(&self) -> ArrayData {
        match self {
            ArrayData::F32(_) => ArrayData::F32(Vec::new()),
            ArrayData::F64(_) => ArrayData::F64(Vec::new()),
            ArrayData::I32(_) => ArrayData::I32(Vec::new()),
            ArrayData::I64(_) => ArrayData::I64(Vec::new()),
            ArrayData::U8(_) => ArrayData::U8(Vec::new()),
        }
    }

    /// Value at `i`, widened to `f64`.
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        match self {
            ArrayData::F32(v) => v.get(i).map(|x| f64::from(*x)),
            ArrayData::F64(v) => v.get(i).copied(),
            ArrayData::I32(v) => v.get(i).map(|x| f64::from(*x)),
            ArrayData::I64(v) => v.get(i).map(|x| *x as f64),
            ArrayData::U8(v) => v.get(i).map(|x| f64::from(*x)),
        }
    }

    /// All values widened to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            ArrayData::F32(v) => widen(v),
            ArrayData::F64(v) => v.clone(),
            ArrayData::I32(v) => widen(v),
            ArrayData::I64(v) => widen(v),
            ArrayData::U8(v) => widen(v),
        }
    }

    /// Real arrays converted to `precision`. Integer arrays are unchanged.
    pub fn with_precision(self, precision: Precision) -> ArrayData {
        match (self, precision) {
            (ArrayData::F64(v), Precision::Single) => ArrayData::F32(narrow(&v)),
            (ArrayData::F32(v), Precision::Double) => ArrayData::F64(widen(&v)),
            (other, _) => other,
        }
    }

    /// Append `other`, which must be the same variant.
    pub fn extend_from(&mut self, other: &ArrayData) -> Result<(), CgnsError> {
        match (self, other) {
            (ArrayData::F32(a), ArrayData::F32(b)) => a.extend_from_slice(b),
            (ArrayData::F64(a), ArrayData::F64(b)) => a.extend_from_slice(b),
            (ArrayData::I32(a), ArrayData::I32(b)) => a.extend_from_slice(b),
            (ArrayData::I64(a), ArrayData::I64(b)) => a.extend_from_slice(b),
            (ArrayData::U8(a), ArrayData::U8(b)) => a.extend_from_slice(b),
            (a, b) => {
                return Err(CgnsError::InvalidMesh(format!(
                    "cannot append {} data to {} data",
                    b.kind(),
                    a.kind()
                )));
            }
        }
        Ok(())
    }

    /// Append tuple `tuple` (of width `components`) from `other`.
    pub fn push_tuple_from(
        &mut self,
        other: &ArrayData,
        tuple: usize,
        components: usize,
    ) -> Result<(), CgnsError> {
        let range = tuple * components..(tuple + 1) * components;
        if range.end > other.len() {
            return Err(CgnsError::InvalidMesh(format!(
                "tuple {tuple} out of range for array of {} values",
                other.len()
            )));
        }
        match (self, other) {
            (ArrayData::F32(a), ArrayData::F32(b)) => a.extend_from_slice(&b[range]),
            (ArrayData::F64(a), ArrayData::F64(b)) => a.extend_from_slice(&b[range]),
            (ArrayData::I32(a), ArrayData::I32(b)) => a.extend_from_slice(&b[range]),
            (ArrayData::I64(a), ArrayData::I64(b)) => a.extend_from_slice(&b[range]),
            (ArrayData::U8(a), ArrayData::U8(b)) => a.extend_from_slice(&b[range]),
            (a, b) => {
                return Err(CgnsError::InvalidMesh(format!(
                    "cannot copy {} tuple into {} data",
                    b.kind(),
                    a.kind()
                )));
            }
        }
        Ok(())
    }
}

impl ArrayData {
    /// Interleave equally long single-component arrays of one variant
    /// into one tuple array.
    pub fn interleave(parts: &[ArrayData]) -> Result<ArrayData, CgnsError> {
        let Some(first) = parts.first() else {
            return Err(CgnsError::InvalidMesh("no components to interleave".into()));
        };
        let n = first.len();
        if let Some(bad) = parts.iter().find(|p| !p.same_kind(first) || p.len() != n) {
            return Err(CgnsError::InvalidMesh(format!(
                "component mismatch: {} x {} vs {} x {n}",
                bad.kind(),
                bad.len(),
                first.kind()
            )));
        }
        let mut out = first.empty_like();
        for i in 0..n {
            for p in parts {
                out.push_tuple_from(p, i, 1)?;
            }
        }
        Ok(out)
    }

    /// Component `comp` of an array of `components`-wide tuples.
    pub fn component(&self, comp: usize, components: usize) -> ArrayData {
        fn pick<T: Copy>(v: &[T], comp: usize, components: usize) -> Vec<T> {
            v.iter().skip(comp).step_by(components.max(1)).copied().collect()
        }
        match self {
            ArrayData::F32(v) => ArrayData::F32(pick(v, comp, components)),
            ArrayData::F64(v) => ArrayData::F64(pick(v, comp, components)),
            ArrayData::I32(v) => ArrayData::I32(pick(v, comp, components)),
            ArrayData::I64(v) => ArrayData::I64(pick(v, comp, components)),
            ArrayData::U8(v) => ArrayData::U8(pick(v, comp, components)),
        }
    }
}

/// A named array of `components`-wide tuples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldArray {
    pub name: String,
    pub components: usize,
    pub data: ArrayData,
}

impl FieldArray {
    pub fn new(name: impl Into<String>, components: usize, data: ArrayData) -> Result<Self, CgnsError> {
        let name = name.into();
        if components == 0 || data.len() % components != 0 {
            return Err(CgnsError::InvalidMesh(format!(
                "array `{name}` has {} values, not a multiple of {components} components",
                data.len()
            )));
        }
        Ok(Self {
            name,
            components,
            data,
        })
    }

    /// Single-component array.
    pub fn scalar(name: impl Into<String>, data: ArrayData) -> Self {
        Self {
            name: name.into(),
            components: 1,
            data,
        }
    }

    /// Number of tuples.
    pub fn tuples(&self) -> usize {
        self.data.len() / self.components.max(1)
    }
}

/// Named arrays attached to points or cells, keyed by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    arrays: BTreeMap<String, FieldArray>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `array`, replacing any array with the same name.
    pub fn insert(&mut self, array: FieldArray) -> Option<FieldArray> {
        self.arrays.insert(array.name.clone(), array)
    }

    pub fn get(&self, name: &str) -> Option<&FieldArray> {
        self.arrays.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldArray> {
        self.arrays.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Array names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.arrays.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldArray> {
        self.arrays.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_conversion_is_explicit() {
        let d = ArrayData::F64(vec![1.5, 2.25]).with_precision(Precision::Single);
        assert_eq!(d, ArrayData::F32(vec![1.5, 2.25]));
        let d = d.with_precision(Precision::Double);
        assert_eq!(d, ArrayData::F64(vec![1.5, 2.25]));
        let i = ArrayData::I32(vec![1]).with_precision(Precision::Single);
        assert_eq!(i, ArrayData::I32(vec![1]));
    }

    #[test]
    fn extend_rejects_mixed_kinds() {
        let mut a = ArrayData::F32(vec![1.0]);
        assert!(a.extend_from(&ArrayData::F64(vec![2.0])).is_err());
        a.extend_from(&ArrayData::F32(vec![2.0])).unwrap();
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn field_arrays_check_component_width() {
        assert!(FieldArray::new("v", 3, ArrayData::F64(vec![0.0; 4])).is_err());
        let f = FieldArray::new("v", 3, ArrayData::F64(vec![0.0; 6])).unwrap();
        assert_eq!(f.tuples(), 2);
    }

    #[test]
    fn interleave_and_component_are_inverse() {
        let parts = [
            ArrayData::I32(vec![1, 2]),
            ArrayData::I32(vec![3, 4]),
            ArrayData::I32(vec![5, 6]),
        ];
        let v = ArrayData::interleave(&parts).unwrap();
        assert_eq!(v, ArrayData::I32(vec![1, 3, 5, 2, 4, 6]));
        assert_eq!(v.component(1, 3), parts[1]);
        assert!(ArrayData::interleave(&[ArrayData::I32(vec![1]), ArrayData::F32(vec![1.0])]).is_err());
    }
}
