//! Kernel selector
//!
//! Given an operator instance, tuning hints, and a registry, the selector
//! filters to applicable candidates, ranks them by estimated cost, and
//! returns the winner's full dispatch package. It is a pure function of
//! its inputs plus the read-only registry: no hidden state, byte-identical
//! results on repeated calls, safe to run from any number of threads.

use serde::{Deserialize, Serialize};

use crate::candidate::KernelCandidate;
use crate::dispatch::{DeviceInfo, DispatchData};
use crate::error::{DespacharError, Result};
use crate::jit::JitConstants;
use crate::params::{OperatorParams, OptionalParams};
use crate::registry::CandidateRegistry;
use crate::tensor::DataType;

/// Full dispatch package of the winning candidate
///
/// Constructed once per selection, immutable, handed to the external
/// compilation stage and then discarded. The core never caches it; an
/// external cache must key on the full parameter model plus hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Name of the chosen kernel candidate
    pub kernel_name: String,
    /// Launch geometry for the chosen candidate
    pub dispatch: DispatchData,
    /// Compile-time constant bindings for the candidate's template
    pub constants: JitConstants,
    /// Estimated execution time (opaque relative unit, lower is better)
    pub estimated_cost: f64,
    /// Accumulator type the candidate committed to
    pub accumulator: DataType,
}

/// Cost-ranked kernel selection over a candidate registry
///
/// # Examples
///
/// ```
/// use despachar::params::{GemmParams, OperatorParams, OptionalParams};
/// use despachar::registry;
/// use despachar::selector::KernelSelector;
/// use despachar::tensor::{DataType, Layout, TensorDescriptor};
///
/// let desc = |shape: Vec<usize>| {
///     TensorDescriptor::new(shape, DataType::F32, Layout::Nc).unwrap()
/// };
/// let params = OperatorParams::Gemm(GemmParams::with_descriptors(
///     desc(vec![64, 128]),
///     desc(vec![128, 256]),
///     desc(vec![64, 256]),
///     1.0, 0.0, false, false,
/// ).unwrap());
///
/// let selector = KernelSelector::default();
/// let result = selector
///     .select(&params, &OptionalParams::default(), registry::global())
///     .unwrap();
/// assert_eq!(result.kernel_name, "gemm_tiled_16");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelSelector {
    device: DeviceInfo,
}

impl KernelSelector {
    /// Selector targeting the given device profile
    #[must_use]
    pub fn new(device: DeviceInfo) -> Self {
        Self { device }
    }

    /// Device profile this selector targets
    #[must_use]
    pub fn device(&self) -> DeviceInfo {
        self.device
    }

    /// Choose the best applicable candidate and assemble its dispatch package
    ///
    /// A forced kernel overrides the deny-list: a name that is both forced
    /// and denied is still selected.
    ///
    /// # Errors
    ///
    /// - `NoCandidatesRegistered` — the family has no registered kernels.
    /// - `ForcedCandidateNotFound` — a forced name is not in the registry.
    /// - `ForcedCandidateNotApplicable` — a forced kernel rejects the
    ///   instance; forcing never falls back to automatic selection.
    /// - `NoApplicableCandidate` — every candidate rejected the instance
    ///   (or survived only onto the deny-list).
    /// - `InvalidParameter` — a candidate violated a dispatch invariant.
    pub fn select(
        &self,
        params: &OperatorParams,
        hints: &OptionalParams,
        registry: &CandidateRegistry,
    ) -> Result<SelectionResult> {
        let family = params.family();
        let candidates = registry.candidates_for(family);
        if candidates.is_empty() {
            return Err(DespacharError::NoCandidatesRegistered { family });
        }

        let winner = if let Some(forced) = hints.forced_kernel.as_deref() {
            self.resolve_forced(forced, params, hints, candidates)?
        } else {
            self.rank_applicable(params, hints, candidates)?
        };

        let constants = winner.candidate.jit_constants(params, &winner.dispatch)?;
        Ok(SelectionResult {
            kernel_name: winner.candidate.name().to_string(),
            accumulator: winner.candidate.accumulator_type(params),
            dispatch: winner.dispatch,
            constants,
            estimated_cost: winner.cost,
        })
    }

    /// Restrict selection to one forced candidate; never fall back
    ///
    /// The deny-list does not apply here: forcing is the stronger override.
    fn resolve_forced<'a>(
        &self,
        forced: &str,
        params: &OperatorParams,
        hints: &OptionalParams,
        candidates: &'a [std::sync::Arc<dyn KernelCandidate>],
    ) -> Result<Ranked<'a>> {
        let family = params.family();
        let candidate = candidates
            .iter()
            .find(|c| c.name() == forced)
            .ok_or_else(|| DespacharError::ForcedCandidateNotFound {
                family,
                name: forced.to_string(),
            })?;
        if !candidate.is_applicable(params) {
            return Err(DespacharError::ForcedCandidateNotApplicable {
                family,
                name: forced.to_string(),
            });
        }
        let dispatch = candidate.dispatch_data(params, &self.device, hints)?;
        let cost = candidate.estimate_cost(params, &dispatch);
        Ok(Ranked {
            candidate: candidate.as_ref(),
            dispatch,
            cost,
        })
    }

    /// Filter to applicable candidates minus the deny-list, keep the cheapest
    ///
    /// Only a strictly lower cost replaces the current best, so equal
    /// estimates resolve to the earliest-registered candidate.
    fn rank_applicable<'a>(
        &self,
        params: &OperatorParams,
        hints: &OptionalParams,
        candidates: &'a [std::sync::Arc<dyn KernelCandidate>],
    ) -> Result<Ranked<'a>> {
        let mut best: Option<Ranked<'a>> = None;
        for candidate in candidates {
            if hints.denied_kernels.iter().any(|d| d == candidate.name()) {
                continue;
            }
            if !candidate.is_applicable(params) {
                continue;
            }
            let dispatch = candidate.dispatch_data(params, &self.device, hints)?;
            let cost = candidate.estimate_cost(params, &dispatch);
            let better = best.as_ref().is_none_or(|b| cost < b.cost);
            if better {
                best = Some(Ranked {
                    candidate: candidate.as_ref(),
                    dispatch,
                    cost,
                });
            }
        }
        best.ok_or(DespacharError::NoApplicableCandidate {
            family: params.family(),
        })
    }
}

/// One candidate with its computed geometry and cost
struct Ranked<'a> {
    candidate: &'a dyn KernelCandidate,
    dispatch: DispatchData,
    cost: f64,
}
