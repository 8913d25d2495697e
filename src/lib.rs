//! # Despachar
//!
//! Kernel selection and dispatch configuration for heterogeneous compute
//! inference engines.
//!
//! Despachar (Spanish: "to dispatch") is the layer that decides *which
//! kernel implementation runs, with what launch geometry, and with what
//! compile-time specialization* for one operator instance at a time. Given
//! a fully resolved parameter model (shapes, data types, layouts, scalar
//! parameters) and a target device profile, it filters the registered
//! kernel candidates to the legal subset, ranks them by estimated cost,
//! computes the winner's launch grid, and emits the specialization
//! constants that turn a generic kernel template into a branch-free unit
//! for that exact instance.
//!
//! ## Example
//!
//! ```rust
//! use despachar::params::{GemmParams, OperatorParams, OptionalParams};
//! use despachar::registry;
//! use despachar::selector::KernelSelector;
//! use despachar::tensor::{DataType, Layout, TensorDescriptor};
//!
//! let a = TensorDescriptor::new(vec![64, 128], DataType::F32, Layout::Nc).unwrap();
//! let b = TensorDescriptor::new(vec![128, 256], DataType::F32, Layout::Nc).unwrap();
//! let c = TensorDescriptor::new(vec![64, 256], DataType::F32, Layout::Nc).unwrap();
//! let params = OperatorParams::Gemm(
//!     GemmParams::with_descriptors(a, b, c, 1.0, 0.0, false, false).unwrap(),
//! );
//!
//! let result = KernelSelector::default()
//!     .select(&params, &OptionalParams::default(), registry::global())
//!     .unwrap();
//!
//! assert_eq!(result.kernel_name, "gemm_tiled_16");
//! assert_eq!(result.dispatch.group_counts(), vec![4, 16]);
//! assert_eq!(result.constants.render("K").as_deref(), Some("128"));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! OperatorParams ──> CandidateRegistry (per-family, registration order)
//!                        │
//!                        ▼
//!          is_applicable filter + deny-list
//!                        │
//!                        ▼
//!          dispatch_data + estimate_cost per survivor
//!                        │
//!                        ▼
//!          minimum cost (ties: first registered)
//!                        │
//!                        ▼
//!          jit_constants ──> SelectionResult
//! ```
//!
//! Everything is a pure function of its inputs plus the read-only registry:
//! selection for independent operator instances runs fully in parallel with
//! no locking, and repeated calls produce byte-identical results. The
//! compilation and execution of the chosen kernel, graph-level optimization,
//! and tensor memory management are external collaborators, not part of
//! this crate.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)] // Not all methods need #[must_use]
#![allow(clippy::float_cmp)] // Exact float comparisons are intentional in tests
#![allow(clippy::missing_panics_doc)] // Allow missing Panics doc sections

pub mod candidate;
pub mod dispatch;
pub mod error;
pub mod gemm;
pub mod jit;
pub mod params;
pub mod registry;
pub mod selector;
pub mod tensor;

pub use candidate::KernelCandidate;
pub use dispatch::{DeviceInfo, DispatchData};
pub use error::{DespacharError, Result};
pub use jit::JitConstants;
pub use params::{OperatorFamily, OperatorParams, OptionalParams};
pub use registry::CandidateRegistry;
pub use selector::{KernelSelector, SelectionResult};
pub use tensor::{DataType, Layout, TensorDescriptor};
