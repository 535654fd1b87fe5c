//! Leaf construction contract.
//!
//! Code that builds model expressions asks a factory for its inputs. Swapping
//! the factory switches between plain values and recorded AD leaves without
//! touching the model code.
//!
//! ```
//! use aad_core::traits::RandomVariableFactory;
//! use aad_core::types::VectorValueFactory;
//!
//! fn drift<F: RandomVariableFactory>(factory: &F) -> F::Output {
//!     factory.create_scalar_leaf(0.0, 0.05)
//! }
//!
//! let value = drift(&VectorValueFactory);
//! assert_eq!(value.get(0), 0.05);
//! ```

/// Creates random variables from raw realisations.
pub trait RandomVariableFactory {
    /// Type of the random variables produced.
    type Output;

    /// Random variable with the given realisations observed at `time`.
    fn create_leaf(&self, time: f64, values: Vec<f64>) -> Self::Output;

    /// Deterministic random variable observed at `time`.
    fn create_scalar_leaf(&self, time: f64, value: f64) -> Self::Output;
}
