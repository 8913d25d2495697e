//! Candidate registry
//!
//! Static collection of every kernel candidate known per operator family.
//! Populated once during process initialization (single-threaded
//! registration phase), then shared immutably by any number of concurrent
//! selectors. Registration order is preserved; the selector's tie-break
//! depends on it.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::candidate::KernelCandidate;
use crate::error::{DespacharError, Result};
use crate::gemm::{GemmHalfVec, GemmRef, GemmTiled};
use crate::params::OperatorFamily;

/// Ordered, per-family collection of kernel candidates
#[derive(Default)]
pub struct CandidateRegistry {
    families: HashMap<OperatorFamily, Vec<Arc<dyn KernelCandidate>>>,
}

impl CandidateRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in GEMM family
    ///
    /// Registration order: `gemm_ref`, `gemm_tiled_16`, `gemm_half_vec8`.
    #[must_use]
    pub fn with_default_candidates() -> Self {
        let mut registry = Self::new();
        // The built-in set has distinct names; registration cannot collide.
        for candidate in [
            Arc::new(GemmRef) as Arc<dyn KernelCandidate>,
            Arc::new(GemmTiled),
            Arc::new(GemmHalfVec),
        ] {
            if let Err(err) = registry.register(candidate) {
                unreachable!("built-in candidate set collided: {err}");
            }
        }
        registry
    }

    /// Register a candidate under its own family tag
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCandidate` if a candidate with the same name is
    /// already registered for the same family.
    pub fn register(&mut self, candidate: Arc<dyn KernelCandidate>) -> Result<()> {
        let family = candidate.family();
        let entries = self.families.entry(family).or_default();
        if entries.iter().any(|c| c.name() == candidate.name()) {
            return Err(DespacharError::DuplicateCandidate {
                family,
                name: candidate.name().to_string(),
            });
        }
        entries.push(candidate);
        Ok(())
    }

    /// Candidates for a family, in registration order
    ///
    /// An empty slice signals "no implementation for this family."
    #[must_use]
    pub fn candidates_for(&self, family: OperatorFamily) -> &[Arc<dyn KernelCandidate>] {
        self.families.get(&family).map_or(&[], Vec::as_slice)
    }

    /// Total number of registered candidates across all families
    #[must_use]
    pub fn len(&self) -> usize {
        self.families.values().map(Vec::len).sum()
    }

    /// Whether the registry holds no candidates
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.values().all(Vec::is_empty)
    }
}

/// Process-wide registry with the built-in candidate set
///
/// Initialized on first use and immutable thereafter, so unsynchronized
/// concurrent readers are safe and selection stays deterministic.
#[must_use]
pub fn global() -> &'static CandidateRegistry {
    static REGISTRY: OnceLock<CandidateRegistry> = OnceLock::new();
    REGISTRY.get_or_init(CandidateRegistry::with_default_candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_candidates_ordered() {
        let registry = CandidateRegistry::with_default_candidates();
        let names: Vec<_> = registry
            .candidates_for(OperatorFamily::Gemm)
            .iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(names, vec!["gemm_ref", "gemm_tiled_16", "gemm_half_vec8"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = CandidateRegistry::with_default_candidates();
        let result = registry.register(Arc::new(GemmRef));
        assert!(matches!(
            result.unwrap_err(),
            DespacharError::DuplicateCandidate { name, .. } if name == "gemm_ref"
        ));
    }

    #[test]
    fn test_unknown_family_is_empty() {
        let registry = CandidateRegistry::with_default_candidates();
        assert!(registry.candidates_for(OperatorFamily::Softmax).is_empty());
    }

    #[test]
    fn test_len() {
        assert_eq!(CandidateRegistry::new().len(), 0);
        assert!(CandidateRegistry::new().is_empty());
        assert_eq!(CandidateRegistry::with_default_candidates().len(), 3);
    }

    #[test]
    fn test_global_is_populated() {
        assert!(!global().candidates_for(OperatorFamily::Gemm).is_empty());
    }
}
