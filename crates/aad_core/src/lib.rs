//! # aad_core: Vectorised random variables with reverse-mode AAD
//!
//! ## Layer 1 (Foundation) Role
//!
//! aad_core is the bottom layer of the workspace, providing:
//! - Immutable vectors of Monte-Carlo realisations (`types::vector`)
//! - A dynamically recorded computation graph over those vectors (`ad`)
//! - Backward sweeps producing per-leaf gradients (`ad::GradientEngine`)
//! - Leaf factories shared by plain and differentiable code (`traits`)
//! - Dense symmetric positive-definite solves (`math::linalg`)
//! - Error types: `AadError` (`types::error`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use aad_core::ad::{AadFactory, RetentionPolicy};
//! use aad_core::traits::RandomVariableFactory;
//! use aad_core::types::VectorValue;
//!
//! let factory = AadFactory::new(RetentionPolicy::Tape);
//! let sigma = factory.create_scalar_leaf(0.0, 0.2);
//! let z = VectorValue::new(1.0, vec![-1.0, 0.0, 1.0]);
//!
//! // S = exp(sigma * z)
//! let s = sigma.mul(&z).unwrap().exp().unwrap();
//! let mean = s.average().unwrap();
//!
//! let gradient = mean.gradient().unwrap();
//! let d_sigma = gradient.wrt(sigma.id());
//! # let expected = ((-0.2_f64).exp() * -1.0 + 0.2_f64.exp()) / 3.0;
//! # assert!((d_sigma.sum() - expected).abs() < 1e-12);
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` (default): Split elementwise kernels over large vectors across the rayon pool
//! - `serde`: Enable serialisation for VectorValue, NodeId, OperatorKind and RetentionPolicy

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod ad;
pub mod math;
pub mod traits;
pub mod types;
