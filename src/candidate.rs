//! Kernel candidate contract
//!
//! A [`KernelCandidate`] is one concrete implementation of an operator
//! family. The selector treats candidates through this fixed capability
//! set: applicability, launch geometry, specialization constants,
//! accumulator policy, and cost. Everything is a pure function of its
//! arguments; candidates hold no mutable state.

use crate::dispatch::{DeviceInfo, DispatchData};
use crate::error::Result;
use crate::jit::JitConstants;
use crate::params::{OperatorFamily, OperatorParams, OptionalParams};
use crate::tensor::DataType;

/// One concrete kernel implementation of an operator family
pub trait KernelCandidate: Send + Sync {
    /// Operator family this candidate serves
    fn family(&self) -> OperatorFamily;

    /// Unique name within the family (stable, used by forcing and deny-lists)
    fn name(&self) -> &'static str;

    /// Whether this implementation can execute the instance correctly
    ///
    /// Pure predicate. Unsupported shape/layout/dtype/parameter combinations
    /// return `false`, never an error.
    fn is_applicable(&self, params: &OperatorParams) -> bool;

    /// Launch geometry for this instance on the given device
    ///
    /// Called only after [`KernelCandidate::is_applicable`] returned true.
    ///
    /// # Errors
    ///
    /// Fails only on a violated dispatch invariant, which for an applicable
    /// instance indicates a candidate bug.
    fn dispatch_data(
        &self,
        params: &OperatorParams,
        device: &DeviceInfo,
        hints: &OptionalParams,
    ) -> Result<DispatchData>;

    /// Compile-time constant bindings for this candidate's kernel template
    ///
    /// Must bind every name the template references, including transpose
    /// flags, scalar multipliers, stride expressions, and tile sizes
    /// consistent with `dispatch`.
    ///
    /// # Errors
    ///
    /// Fails only on a violated invariant for an applicable instance.
    fn jit_constants(
        &self,
        params: &OperatorParams,
        dispatch: &DispatchData,
    ) -> Result<JitConstants>;

    /// Advisory accumulator type for mixed-precision reduction
    ///
    /// Never affects applicability.
    fn accumulator_type(&self, params: &OperatorParams) -> DataType;

    /// Estimated execution time in an opaque relative unit (lower is better)
    ///
    /// Ties are broken by registration order, so equal estimates keep
    /// selection deterministic.
    fn estimate_cost(&self, params: &OperatorParams, dispatch: &DispatchData) -> f64;
}
