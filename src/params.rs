//! Operator parameter model
//!
//! An operator instance is described by an immutable parameter set: the
//! family tag, the tensor descriptors of every input and output, and the
//! family-specific numeric/boolean fields (for GEMM: scalar multipliers and
//! transpose flags). An [`OptionalParams`] side-channel carries tuning hints
//! that never affect correctness.
//!
//! All shapes are concrete at selection time; the upstream shape-inference
//! pass resolves symbolic dimensions before invoking this crate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DespacharError, Result};
use crate::tensor::TensorDescriptor;

/// Operator family: a class of computation with competing implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorFamily {
    /// General matrix multiply: `C = alpha * op(A) @ op(B) + beta * C`
    Gemm,
    /// Row-wise softmax (parameter model only; no built-in candidates)
    Softmax,
}

impl OperatorFamily {
    /// Fixed (inputs, outputs) arity of the family
    #[must_use]
    pub fn arity(self) -> (usize, usize) {
        match self {
            OperatorFamily::Gemm => (2, 1),
            OperatorFamily::Softmax => (1, 1),
        }
    }
}

impl fmt::Display for OperatorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorFamily::Gemm => write!(f, "gemm"),
            OperatorFamily::Softmax => write!(f, "softmax"),
        }
    }
}

/// Family tag plus input/output tensor descriptors, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseParams {
    family: OperatorFamily,
    inputs: Vec<TensorDescriptor>,
    outputs: Vec<TensorDescriptor>,
}

impl BaseParams {
    /// Create the base parameter set for one operator instance
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the input or output count does not
    /// match the family's fixed arity.
    pub fn new(
        family: OperatorFamily,
        inputs: Vec<TensorDescriptor>,
        outputs: Vec<TensorDescriptor>,
    ) -> Result<Self> {
        let (in_arity, out_arity) = family.arity();
        if inputs.len() != in_arity {
            return Err(DespacharError::InvalidParameter {
                reason: format!(
                    "{family} expects {in_arity} inputs, got {}",
                    inputs.len()
                ),
            });
        }
        if outputs.len() != out_arity {
            return Err(DespacharError::InvalidParameter {
                reason: format!(
                    "{family} expects {out_arity} outputs, got {}",
                    outputs.len()
                ),
            });
        }
        Ok(Self {
            family,
            inputs,
            outputs,
        })
    }

    /// Family tag
    #[must_use]
    pub fn family(&self) -> OperatorFamily {
        self.family
    }

    /// Input descriptors, in operator order
    #[must_use]
    pub fn inputs(&self) -> &[TensorDescriptor] {
        &self.inputs
    }

    /// Output descriptors, in operator order
    #[must_use]
    pub fn outputs(&self) -> &[TensorDescriptor] {
        &self.outputs
    }
}

/// Parameters of one GEMM instance: `C = alpha * op(A) @ op(B) + beta * C`
///
/// `op(X)` is `X` or its transpose depending on the per-input flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GemmParams {
    base: BaseParams,
    alpha: f32,
    beta: f32,
    transpose_a: bool,
    transpose_b: bool,
}

impl GemmParams {
    /// Create GEMM parameters over an already-validated base
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if:
    /// - the base family is not [`OperatorFamily::Gemm`],
    /// - `alpha` or `beta` is NaN or infinite,
    /// - any operand is not rank 2,
    /// - the inner dimensions of `op(A)` and `op(B)` disagree,
    /// - the output shape is not `[m, n]`.
    pub fn new(
        base: BaseParams,
        alpha: f32,
        beta: f32,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<Self> {
        if base.family() != OperatorFamily::Gemm {
            return Err(DespacharError::InvalidParameter {
                reason: format!("GemmParams requires family gemm, got {}", base.family()),
            });
        }
        if !alpha.is_finite() || !beta.is_finite() {
            return Err(DespacharError::InvalidParameter {
                reason: format!("alpha/beta must be finite, got alpha={alpha}, beta={beta}"),
            });
        }
        for (label, t) in [("input", &base.inputs), ("output", &base.outputs)]
            .iter()
            .flat_map(|(label, ts)| ts.iter().map(move |t| (*label, t)))
        {
            if t.rank() != 2 {
                return Err(DespacharError::InvalidParameter {
                    reason: format!("gemm {label} must be rank 2, got shape {:?}", t.shape()),
                });
            }
        }

        let params = Self {
            base,
            alpha,
            beta,
            transpose_a,
            transpose_b,
        };

        let (ka, kb) = params.inner_dims();
        if ka != kb {
            return Err(DespacharError::InvalidParameter {
                reason: format!("gemm inner dimensions disagree: op(A) has k={ka}, op(B) has k={kb}"),
            });
        }
        let out = &params.base.outputs()[0];
        if out.shape() != [params.m(), params.n()] {
            return Err(DespacharError::InvalidParameter {
                reason: format!(
                    "gemm output shape {:?} does not match [m, n] = [{}, {}]",
                    out.shape(),
                    params.m(),
                    params.n()
                ),
            });
        }
        Ok(params)
    }

    /// Convenience constructor from individual descriptors
    ///
    /// # Errors
    ///
    /// Same failure modes as [`GemmParams::new`].
    pub fn with_descriptors(
        a: TensorDescriptor,
        b: TensorDescriptor,
        output: TensorDescriptor,
        alpha: f32,
        beta: f32,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<Self> {
        let base = BaseParams::new(OperatorFamily::Gemm, vec![a, b], vec![output])?;
        Self::new(base, alpha, beta, transpose_a, transpose_b)
    }

    /// Inner (reduction) dimension of each operand after transposition
    fn inner_dims(&self) -> (usize, usize) {
        let a = &self.base.inputs()[0];
        let b = &self.base.inputs()[1];
        let ka = if self.transpose_a { a.dim(0) } else { a.dim(1) };
        let kb = if self.transpose_b { b.dim(1) } else { b.dim(0) };
        (ka, kb)
    }

    /// Base parameter set (family tag, descriptors)
    #[must_use]
    pub fn base(&self) -> &BaseParams {
        &self.base
    }

    /// Descriptor of input A
    #[must_use]
    pub fn input_a(&self) -> &TensorDescriptor {
        &self.base.inputs()[0]
    }

    /// Descriptor of input B
    #[must_use]
    pub fn input_b(&self) -> &TensorDescriptor {
        &self.base.inputs()[1]
    }

    /// Descriptor of the output C
    #[must_use]
    pub fn output(&self) -> &TensorDescriptor {
        &self.base.outputs()[0]
    }

    /// Scalar multiplier applied to `op(A) @ op(B)`
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Scalar multiplier applied to the existing output
    #[must_use]
    pub fn beta(&self) -> f32 {
        self.beta
    }

    /// Whether input A is consumed transposed
    #[must_use]
    pub fn transpose_a(&self) -> bool {
        self.transpose_a
    }

    /// Whether input B is consumed transposed
    #[must_use]
    pub fn transpose_b(&self) -> bool {
        self.transpose_b
    }

    /// Output rows, honoring the transpose flag of A
    #[must_use]
    pub fn m(&self) -> usize {
        let a = self.input_a();
        if self.transpose_a {
            a.dim(1)
        } else {
            a.dim(0)
        }
    }

    /// Output columns, honoring the transpose flag of B
    #[must_use]
    pub fn n(&self) -> usize {
        let b = self.input_b();
        if self.transpose_b {
            b.dim(0)
        } else {
            b.dim(1)
        }
    }

    /// Reduction dimension
    #[must_use]
    pub fn k(&self) -> usize {
        self.inner_dims().0
    }
}

/// Parameters of one softmax instance
///
/// Carried so the selector can report "no candidates registered" with a
/// well-formed parameter model; this crate ships no softmax kernels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxParams {
    base: BaseParams,
}

impl SoftmaxParams {
    /// Create softmax parameters over an already-validated base
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the base family is not
    /// [`OperatorFamily::Softmax`].
    pub fn new(base: BaseParams) -> Result<Self> {
        if base.family() != OperatorFamily::Softmax {
            return Err(DespacharError::InvalidParameter {
                reason: format!(
                    "SoftmaxParams requires family softmax, got {}",
                    base.family()
                ),
            });
        }
        Ok(Self { base })
    }

    /// Base parameter set (family tag, descriptors)
    #[must_use]
    pub fn base(&self) -> &BaseParams {
        &self.base
    }
}

/// Tagged-variant parameter model handed to the selector
///
/// Candidates receive this and match on their own family's variant; the
/// closed enumeration replaces the source-style dispatch over operator-name
/// strings, so unknown families cannot be expressed at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperatorParams {
    /// Matrix-multiply family
    Gemm(GemmParams),
    /// Softmax family
    Softmax(SoftmaxParams),
}

impl OperatorParams {
    /// Family tag of the wrapped parameters
    #[must_use]
    pub fn family(&self) -> OperatorFamily {
        match self {
            OperatorParams::Gemm(_) => OperatorFamily::Gemm,
            OperatorParams::Softmax(_) => OperatorFamily::Softmax,
        }
    }
}

/// Non-correctness-affecting tuning hints for one selection call
///
/// Absence of any hint is the default "let the selector decide."
///
/// # Examples
///
/// ```
/// use despachar::params::OptionalParams;
///
/// let hints = OptionalParams::default()
///     .with_denied_kernel("gemm_ref")
///     .with_preferred_group_size(8);
/// assert!(hints.forced_kernel.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalParams {
    /// Force this exact kernel; selection fails rather than falling back
    pub forced_kernel: Option<String>,
    /// Kernel names excluded from automatic selection
    pub denied_kernels: Vec<String>,
    /// Upper bound on the per-axis work-group size
    pub preferred_group_size: Option<usize>,
}

impl OptionalParams {
    /// Force selection of the named kernel
    #[must_use]
    pub fn with_forced_kernel(mut self, name: impl Into<String>) -> Self {
        self.forced_kernel = Some(name.into());
        self
    }

    /// Exclude the named kernel from automatic selection
    #[must_use]
    pub fn with_denied_kernel(mut self, name: impl Into<String>) -> Self {
        self.denied_kernels.push(name.into());
        self
    }

    /// Cap the per-axis work-group size
    #[must_use]
    pub fn with_preferred_group_size(mut self, size: usize) -> Self {
        self.preferred_group_size = Some(size);
        self
    }
}
