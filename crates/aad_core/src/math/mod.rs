//! Mathematical utilities shared by the differentiation engine and solvers.
//!
//! - `linalg`: small dense symmetric positive-definite solves

pub mod linalg;
