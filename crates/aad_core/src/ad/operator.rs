//! Operator table for the differentiable graph.
//!
//! Every recorded node carries an [`OperatorKind`]. The tag maps to the
//! forward formula used while the expression is built and to the local
//! partial derivatives used by the backward sweep.
//!
//! | operator | forward | ∂/∂operand |
//! |---|---|---|
//! | `Add(a, b)` | a + b | 1, 1 |
//! | `Sub(a, b)` | a − b | 1, −1 |
//! | `Mul(a, b)` | a · b | b, a |
//! | `Div(a, b)` | a / b | 1/b, −a/b² |
//! | `Pow(a; p)` | aᵖ | p·aᵖ⁻¹ |
//! | `Square(a)` | a² | 2a |
//! | `Sqrt(a)` | √a | 1/(2√a) |
//! | `Exp(a)` | eᵃ | eᵃ |
//! | `Log(a)` | ln a | 1/a |
//! | `AddProduct(s, a, b)` | s + a·b | 1, b, a |
//! | `AddRatio(s, a, b)` | s + a/b | 1, 1/b, −a/b² |
//! | `Average(a)` | E\[a\] | 1/n |

use crate::types::{AadError, VectorValue};

/// Operation that produced a node.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperatorKind {
    /// Free variable (no operands)
    Leaf,
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `a ^ exponent` for a constant exponent
    Pow {
        /// Constant exponent
        exponent: f64,
    },
    /// `a * a`
    Square,
    /// Square root
    Sqrt,
    /// Exponential
    Exp,
    /// Natural logarithm
    Log,
    /// `s + a * b`
    AddProduct,
    /// `s + a / b`
    AddRatio,
    /// Mean over realisations (deterministic result)
    Average,
}

impl OperatorKind {
    /// Number of operands the operator consumes.
    pub fn arity(&self) -> usize {
        match self {
            OperatorKind::Leaf => 0,
            OperatorKind::Pow { .. }
            | OperatorKind::Square
            | OperatorKind::Sqrt
            | OperatorKind::Exp
            | OperatorKind::Log
            | OperatorKind::Average => 1,
            OperatorKind::Add | OperatorKind::Sub | OperatorKind::Mul | OperatorKind::Div => 2,
            OperatorKind::AddProduct | OperatorKind::AddRatio => 3,
        }
    }

    /// Short lowercase name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            OperatorKind::Leaf => "leaf",
            OperatorKind::Add => "add",
            OperatorKind::Sub => "sub",
            OperatorKind::Mul => "mul",
            OperatorKind::Div => "div",
            OperatorKind::Pow { .. } => "pow",
            OperatorKind::Square => "square",
            OperatorKind::Sqrt => "sqrt",
            OperatorKind::Exp => "exp",
            OperatorKind::Log => "log",
            OperatorKind::AddProduct => "add_product",
            OperatorKind::AddRatio => "add_ratio",
            OperatorKind::Average => "average",
        }
    }

    fn check_arity(&self, operands: usize) -> Result<(), AadError> {
        if operands == self.arity() {
            Ok(())
        } else {
            Err(AadError::GraphCorruption(format!(
                "{} expects {} operands, got {}",
                self.name(),
                self.arity(),
                operands
            )))
        }
    }

    /// Forward value of the operator applied to `operands`.
    pub fn forward(&self, operands: &[&VectorValue]) -> Result<VectorValue, AadError> {
        self.check_arity(operands.len())?;
        match *self {
            OperatorKind::Leaf => Err(AadError::GraphCorruption(
                "leaf nodes have no forward formula".to_string(),
            )),
            OperatorKind::Add => operands[0].add(operands[1]),
            OperatorKind::Sub => operands[0].sub(operands[1]),
            OperatorKind::Mul => operands[0].mul(operands[1]),
            OperatorKind::Div => operands[0].div(operands[1]),
            OperatorKind::Pow { exponent } => Ok(operands[0].pow(exponent)),
            OperatorKind::Square => Ok(operands[0].squared()),
            OperatorKind::Sqrt => Ok(operands[0].sqrt()),
            OperatorKind::Exp => Ok(operands[0].exp()),
            OperatorKind::Log => Ok(operands[0].log()),
            OperatorKind::AddProduct => operands[0].add_product(operands[1], operands[2]),
            OperatorKind::AddRatio => operands[0].add_ratio(operands[1], operands[2]),
            OperatorKind::Average => Ok(VectorValue::from_scalar(
                operands[0].time(),
                operands[0].average(),
            )),
        }
    }

    /// Local partial derivative of the result with respect to operand `index`.
    ///
    /// `result` is the forward value recorded for the node.
    pub fn partial(
        &self,
        index: usize,
        operands: &[&VectorValue],
        result: &VectorValue,
    ) -> Result<VectorValue, AadError> {
        self.check_arity(operands.len())?;
        if index >= operands.len() {
            return Err(AadError::GraphCorruption(format!(
                "{} has no operand {}",
                self.name(),
                index
            )));
        }
        let one = || VectorValue::scalar(1.0);

        match (*self, index) {
            (OperatorKind::Add, _) => Ok(one()),
            (OperatorKind::Sub, 0) => Ok(one()),
            (OperatorKind::Sub, _) => Ok(VectorValue::scalar(-1.0)),
            (OperatorKind::Mul, 0) => Ok(operands[1].clone()),
            (OperatorKind::Mul, _) => Ok(operands[0].clone()),
            (OperatorKind::Div, 0) => Ok(operands[1].invert()),
            (OperatorKind::Div, _) => Ok(result.div(operands[1])?.neg()),
            (OperatorKind::Pow { exponent }, _) => {
                Ok(operands[0].pow(exponent - 1.0).mul_scalar(exponent))
            }
            (OperatorKind::Square, _) => Ok(operands[0].mul_scalar(2.0)),
            (OperatorKind::Sqrt, _) => Ok(result.invert().mul_scalar(0.5)),
            (OperatorKind::Exp, _) => Ok(result.clone()),
            (OperatorKind::Log, _) => Ok(operands[0].invert()),
            (OperatorKind::AddProduct, 0) => Ok(one()),
            (OperatorKind::AddProduct, 1) => Ok(operands[2].clone()),
            (OperatorKind::AddProduct, _) => Ok(operands[1].clone()),
            (OperatorKind::AddRatio, 0) => Ok(one()),
            (OperatorKind::AddRatio, 1) => Ok(operands[2].invert()),
            (OperatorKind::AddRatio, _) => {
                Ok(operands[1].div(&operands[2].squared())?.neg())
            }
            (OperatorKind::Average, _) => {
                Ok(VectorValue::scalar(1.0 / operands[0].size() as f64))
            }
            (OperatorKind::Leaf, _) => Err(AadError::GraphCorruption(
                "leaf nodes have no operands".to_string(),
            )),
        }
    }

    /// Adjoint contribution flowing into operand `index`.
    ///
    /// For elementwise operators this is `adjoint * partial`. The average
    /// couples every realisation, so its operand receives the summed
    /// adjoint scaled by `1/n`.
    pub fn contribution(
        &self,
        index: usize,
        adjoint: &VectorValue,
        operands: &[&VectorValue],
        result: &VectorValue,
    ) -> Result<VectorValue, AadError> {
        let partial = self.partial(index, operands, result)?;
        match self {
            OperatorKind::Average => Ok(VectorValue::from_scalar(
                adjoint.time(),
                adjoint.sum() * partial.get(0),
            )),
            _ => adjoint.mul(&partial),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn v(values: &[f64]) -> VectorValue {
        VectorValue::new(0.0, values.to_vec())
    }

    /// Central difference of `op` in operand `index` at realisation `i`.
    fn numeric_partial(op: OperatorKind, operands: &[VectorValue], index: usize, i: usize) -> f64 {
        let h = 1e-6;
        let bump = |shift: f64| {
            let shifted: Vec<VectorValue> = operands
                .iter()
                .enumerate()
                .map(|(k, x)| if k == index { x.add_scalar(shift) } else { x.clone() })
                .collect();
            let refs: Vec<&VectorValue> = shifted.iter().collect();
            op.forward(&refs).unwrap().get(i)
        };
        (bump(h) - bump(-h)) / (2.0 * h)
    }

    #[test]
    fn test_arity() {
        assert_eq!(OperatorKind::Leaf.arity(), 0);
        assert_eq!(OperatorKind::Exp.arity(), 1);
        assert_eq!(OperatorKind::Mul.arity(), 2);
        assert_eq!(OperatorKind::AddRatio.arity(), 3);
    }

    #[test]
    fn test_forward_rejects_wrong_arity() {
        let a = v(&[1.0]);
        let err = OperatorKind::Add.forward(&[&a]).unwrap_err();
        assert!(err.is_graph_corruption());
        assert!(OperatorKind::Leaf.forward(&[]).is_err());
    }

    #[test]
    fn test_partials_match_central_differences() {
        let a = v(&[0.7, 1.3, 2.1]);
        let b = v(&[1.9, 0.4, 1.1]);
        let s = v(&[0.2, -0.5, 0.9]);

        let cases: Vec<(OperatorKind, Vec<VectorValue>)> = vec![
            (OperatorKind::Add, vec![a.clone(), b.clone()]),
            (OperatorKind::Sub, vec![a.clone(), b.clone()]),
            (OperatorKind::Mul, vec![a.clone(), b.clone()]),
            (OperatorKind::Div, vec![a.clone(), b.clone()]),
            (OperatorKind::Pow { exponent: 3.5 }, vec![a.clone()]),
            (OperatorKind::Square, vec![a.clone()]),
            (OperatorKind::Sqrt, vec![a.clone()]),
            (OperatorKind::Exp, vec![a.clone()]),
            (OperatorKind::Log, vec![a.clone()]),
            (OperatorKind::AddProduct, vec![s.clone(), a.clone(), b.clone()]),
            (OperatorKind::AddRatio, vec![s.clone(), a.clone(), b.clone()]),
        ];

        for (op, operands) in cases {
            let refs: Vec<&VectorValue> = operands.iter().collect();
            let result = op.forward(&refs).unwrap();
            for index in 0..op.arity() {
                let partial = op.partial(index, &refs, &result).unwrap();
                for i in 0..3 {
                    assert_relative_eq!(
                        partial.get(i),
                        numeric_partial(op, &operands, index, i),
                        epsilon = 1e-6,
                        max_relative = 1e-6
                    );
                }
            }
        }
    }

    #[test]
    fn test_average_contribution_sums_adjoint() {
        let a = v(&[1.0, 2.0, 3.0, 4.0]);
        let result = OperatorKind::Average.forward(&[&a]).unwrap();
        assert!(result.is_deterministic());
        assert_relative_eq!(result.get(0), 2.5);

        let adjoint = VectorValue::scalar(1.0);
        let c = OperatorKind::Average
            .contribution(0, &adjoint, &[&a], &result)
            .unwrap();
        assert_relative_eq!(c.get(0), 0.25);

        let adjoint = v(&[1.0, 1.0, 2.0, 0.0]);
        let c = OperatorKind::Average
            .contribution(0, &adjoint, &[&a], &result)
            .unwrap();
        assert_relative_eq!(c.get(3), 1.0);
    }

    #[test]
    fn test_partial_out_of_range() {
        let a = v(&[1.0]);
        let result = a.squared();
        assert!(OperatorKind::Square.partial(1, &[&a], &result).is_err());
    }
}
