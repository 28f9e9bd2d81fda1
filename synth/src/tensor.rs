//! Shaped numeric buffers exchanged with model executors.

use std::fmt;

use crate::TensorError;

/// Element type of a [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    I64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => f.write_str("float32"),
            Self::I64 => f.write_str("int64"),
        }
    }
}

/// Flat row-major storage of a [`Tensor`].
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    I64(Vec<i64>),
}

impl TensorData {
    pub fn dtype(&self) -> DType {
        match self {
            Self::F32(_) => DType::F32,
            Self::I64(_) => DType::I64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A multi-dimensional buffer with an explicit shape.
///
/// The element count always equals the product of the shape; this is
/// checked when the tensor is built, so every accessor can rely on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: TensorData,
}

impl Tensor {
    /// Creates a tensor, checking the element count against the shape.
    pub fn new(shape: impl Into<Vec<usize>>, data: TensorData) -> Result<Self, TensorError> {
        let shape = shape.into();
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TensorError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn from_f32(shape: impl Into<Vec<usize>>, data: Vec<f32>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::F32(data))
    }

    pub fn from_i64(shape: impl Into<Vec<usize>>, data: Vec<i64>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::I64(data))
    }

    /// A float tensor of the given shape filled with `value`.
    pub fn full_f32(shape: impl Into<Vec<usize>>, value: f32) -> Self {
        let shape = shape.into();
        let len = shape.iter().product();
        Self {
            shape,
            data: TensorData::F32(vec![value; len]),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_f32(&self) -> Result<&[f32], TensorError> {
        match &self.data {
            TensorData::F32(v) => Ok(v.as_slice()),
            other => Err(TensorError::DtypeMismatch {
                expected: DType::F32,
                actual: other.dtype(),
            }),
        }
    }

    pub fn as_i64(&self) -> Result<&[i64], TensorError> {
        match &self.data {
            TensorData::I64(v) => Ok(v.as_slice()),
            other => Err(TensorError::DtypeMismatch {
                expected: DType::I64,
                actual: other.dtype(),
            }),
        }
    }

    pub fn into_f32(self) -> Result<Vec<f32>, TensorError> {
        match self.data {
            TensorData::F32(v) => Ok(v),
            other => Err(TensorError::DtypeMismatch {
                expected: DType::F32,
                actual: other.dtype(),
            }),
        }
    }

    /// Reinterprets the data under a new shape with the same element count.
    pub fn reshape(self, shape: impl Into<Vec<usize>>) -> Result<Self, TensorError> {
        Self::new(shape, self.data)
    }

    /// Repeats a batch-of-one tensor along its leading dimension.
    ///
    /// A tensor whose leading dimension already equals `batch` is returned
    /// unchanged.
    pub fn tile_batch(&self, batch: usize) -> Result<Self, TensorError> {
        let from = self.shape.first().copied().unwrap_or(0);
        if from == batch {
            return Ok(self.clone());
        }
        if from != 1 {
            return Err(TensorError::Tile { from, to: batch });
        }
        let mut shape = self.shape.clone();
        shape[0] = batch;
        let data = match &self.data {
            TensorData::F32(v) => TensorData::F32(v.repeat(batch)),
            TensorData::I64(v) => TensorData::I64(v.repeat(batch)),
        };
        Ok(Self { shape, data })
    }
}

/// Tensors keyed by name, in insertion order.
///
/// Executors return their outputs in model order, so [`first`](Self::first)
/// is the primary output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedTensors {
    entries: Vec<(String, Tensor)>,
}

impl NamedTensors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tensor, builder style.
    pub fn with(mut self, name: impl Into<String>, tensor: Tensor) -> Self {
        self.push(name, tensor);
        self
    }

    /// Appends a tensor. A repeated name replaces the earlier value in place.
    pub fn push(&mut self, name: impl Into<String>, tensor: Tensor) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = tensor,
            None => self.entries.push((name, tensor)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn first(&self) -> Option<&Tensor> {
        self.entries.first().map(|(_, t)| t)
    }

    pub fn into_first(self) -> Option<Tensor> {
        self.entries.into_iter().next().map(|(_, t)| t)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for NamedTensors {
    type Item = (String, Tensor);
    type IntoIter = std::vec::IntoIter<(String, Tensor)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Tensor)> for NamedTensors {
    fn from_iter<I: IntoIterator<Item = (S, Tensor)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (name, tensor) in iter {
            out.push(name, tensor);
        }
        out
    }
}
