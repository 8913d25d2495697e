//! Tensor descriptors: shape, element type, memory layout, derived strides
//!
//! A [`TensorDescriptor`] is an immutable description of one tensor operand.
//! It carries no data; the selection core only reasons about geometry and
//! types. Strides are derived from shape and layout, never set directly.

use serde::{Deserialize, Serialize};

use crate::error::{DespacharError, Result};

/// Element type of a tensor operand
///
/// Closed enumeration over the 8/16/32-bit integer and floating-point kinds
/// the kernel templates understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 16-bit IEEE float (half precision)
    F16,
    /// 32-bit IEEE float
    F32,
}

impl DataType {
    /// Size of one element in bytes
    #[must_use]
    pub fn size_bytes(self) -> usize {
        match self {
            DataType::I8 => 1,
            DataType::I16 | DataType::F16 => 2,
            DataType::I32 | DataType::F32 => 4,
        }
    }

    /// Whether this is a floating-point kind
    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, DataType::F16 | DataType::F32)
    }

    /// Accumulator type used internally during reduction
    ///
    /// Low-precision floats accumulate in the next-wider standard float type;
    /// the widest float accumulates in place. Integer kinds accumulate in
    /// `I32` to bound overflow.
    #[must_use]
    pub fn accumulator(self) -> DataType {
        match self {
            DataType::F16 | DataType::F32 => DataType::F32,
            DataType::I8 | DataType::I16 | DataType::I32 => DataType::I32,
        }
    }

    /// Type token consumed by a kernel template for this element type
    #[must_use]
    pub fn jit_name(self) -> &'static str {
        match self {
            DataType::I8 => "char",
            DataType::I16 => "short",
            DataType::I32 => "int",
            DataType::F16 => "half",
            DataType::F32 => "float",
        }
    }
}

/// Memory layout tag
///
/// Each tag fixes the rank a shape must have and how strides are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    /// Rank-2, row-major (`[rows, cols]`, cols contiguous)
    Nc,
    /// Rank-2, column-major (`[rows, cols]`, rows contiguous)
    Cn,
    /// Rank-4 batch-channel-height-width, fully contiguous in that order
    Nchw,
    /// Rank-4 batch-height-width-channel, fully contiguous in that order
    Nhwc,
}

impl Layout {
    /// Rank a shape must have under this layout
    #[must_use]
    pub fn expected_rank(self) -> usize {
        match self {
            Layout::Nc | Layout::Cn => 2,
            Layout::Nchw | Layout::Nhwc => 4,
        }
    }
}

/// Immutable description of one tensor operand
///
/// # Examples
///
/// ```
/// use despachar::tensor::{DataType, Layout, TensorDescriptor};
///
/// let t = TensorDescriptor::new(vec![64, 128], DataType::F32, Layout::Nc).unwrap();
/// assert_eq!(t.rank(), 2);
/// assert_eq!(t.strides(), &[128, 1]);
/// assert_eq!(t.num_elements(), 64 * 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorDescriptor {
    shape: Vec<usize>,
    strides: Vec<usize>,
    data_type: DataType,
    layout: Layout,
}

impl TensorDescriptor {
    /// Create a descriptor, deriving strides from shape and layout
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the shape rank does not match the
    /// layout's expected rank, or if any dimension is zero.
    pub fn new(shape: Vec<usize>, data_type: DataType, layout: Layout) -> Result<Self> {
        if shape.len() != layout.expected_rank() {
            return Err(DespacharError::InvalidParameter {
                reason: format!(
                    "layout {layout:?} expects rank {}, got shape {shape:?}",
                    layout.expected_rank()
                ),
            });
        }
        if shape.contains(&0) {
            return Err(DespacharError::InvalidParameter {
                reason: format!("shape dimensions cannot be zero: {shape:?}"),
            });
        }

        let strides = Self::derive_strides(&shape, layout);
        Ok(Self {
            shape,
            strides,
            data_type,
            layout,
        })
    }

    /// Contiguous strides for the given shape under the given layout
    fn derive_strides(shape: &[usize], layout: Layout) -> Vec<usize> {
        match layout {
            // Column-major: rows contiguous.
            Layout::Cn => vec![1, shape[0]],
            // Row-major over the layout's own axis order.
            Layout::Nc | Layout::Nchw | Layout::Nhwc => {
                let mut strides = vec![1; shape.len()];
                for i in (0..shape.len().saturating_sub(1)).rev() {
                    strides[i] = strides[i + 1] * shape[i + 1];
                }
                strides
            },
        }
    }

    /// Shape of the tensor, in the layout's axis order
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Derived strides, in elements
    #[must_use]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Element type
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Memory layout tag
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Number of dimensions
    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    /// Extent of dimension `i`
    ///
    /// # Panics
    ///
    /// Panics if `i >= rank()`.
    #[must_use]
    pub fn dim(&self, i: usize) -> usize {
        self.shape[i]
    }
}
