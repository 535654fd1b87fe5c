//! Reverse-mode automatic differentiation over vectorised random variables.
//!
//! ## Components
//!
//! - [`OperatorKind`]: forward formulas and local partial derivatives
//! - [`DifferentiableNode`]: immutable record of one operation
//! - [`ComputationGraph`]: node arena with a [`RetentionPolicy`]
//! - [`DifferentiableVariable`]: user-facing handle that records operations
//! - [`GradientEngine`]: backward sweep producing a [`GradientMap`]
//! - [`AadFactory`]: leaf construction for model code
//!
//! ## Example
//!
//! ```
//! use aad_core::ad::{AadFactory, RetentionPolicy};
//! use aad_core::traits::RandomVariableFactory;
//!
//! let factory = AadFactory::new(RetentionPolicy::Tape);
//! let a = factory.create_leaf(0.0, vec![1.0, 2.0, 3.0]);
//! let b = factory.create_scalar_leaf(0.0, 2.0);
//!
//! // y = a * b + a
//! let y = a.add_product(&a, &b).unwrap();
//! let gradient = y.gradient().unwrap();
//!
//! assert_eq!(gradient.wrt(a.id()).to_vec(), vec![3.0, 3.0, 3.0]);
//! assert_eq!(gradient.wrt(b.id()).to_vec(), vec![1.0, 2.0, 3.0]);
//! ```

mod engine;
mod factory;
mod graph;
mod node;
mod operator;
mod variable;

pub use engine::{accumulate, GradientEngine, GradientMap};
pub use factory::AadFactory;
pub use graph::{ComputationGraph, RetentionPolicy};
pub use node::{DifferentiableNode, NodeId, Operand};
pub use operator::OperatorKind;
pub use variable::{Argument, DifferentiableVariable};
