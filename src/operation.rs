//! Graph-building forward operations. Each one computes the result payload
//! through the ndarray kernels, then wraps it in a tensor that records its
//! provenance when some operand tracks gradients; an untracked result is a
//! plain leaf with no graph edges.

use ndarray::{ArrayD, IxDyn};

use crate::autograd::Op;
use crate::broadcast::{co_broadcast, matmul_nd, reduce_axes};
use crate::error::TensorError;
use crate::tensor::Tensor;

impl Tensor {
    /// Elementwise sum with numpy-style broadcasting. Fails with
    /// [`TensorError::ShapeMismatch`] before any graph node is created.
    pub fn add(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        let data = {
            let a = self.data();
            let b = other.data();
            let (av, bv) = co_broadcast(&a, &b)?;
            &av + &bv
        };
        Ok(self.binary_result(other, data, Op::Add(self.clone(), other.clone())))
    }

    /// Elementwise product with numpy-style broadcasting.
    pub fn mul(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        let data = {
            let a = self.data();
            let b = other.data();
            let (av, bv) = co_broadcast(&a, &b)?;
            &av * &bv
        };
        Ok(self.binary_result(other, data, Op::Mul(self.clone(), other.clone())))
    }

    /// Elementwise power with a fixed exponent.
    pub fn pow(&self, exponent: f32) -> Tensor {
        let data = self.data().mapv(|x| x.powf(exponent));
        let requires_grad = self.requires_grad();
        let op = if requires_grad {
            Op::Pow(self.clone(), exponent)
        } else {
            Op::Leaf
        };
        Tensor::from_op(data, requires_grad, op)
    }

    /// Sum of all elements as a 0-D tensor.
    pub fn sum(&self) -> Tensor {
        let total = self.data().sum();
        let data = ArrayD::from_elem(IxDyn(&[]), total);
        let requires_grad = self.requires_grad();
        let op = if requires_grad {
            Op::Sum(self.clone())
        } else {
            Op::Leaf
        };
        Tensor::from_op(data, requires_grad, op)
    }

    /// Matrix multiplication over the trailing two axes, with 1-D operands
    /// given an implicit axis and leading axes broadcast. The leading-axis
    /// reduce sets for the backward pass are fixed here, at construction.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        let data = matmul_nd(&self.data(), &other.data())?;
        let requires_grad = self.requires_grad() || other.requires_grad();
        let op = if requires_grad {
            let a = self.data();
            let b = other.data();
            let l_lead = &a.shape()[..a.ndim().saturating_sub(2)];
            let r_lead = &b.shape()[..b.ndim().saturating_sub(2)];
            let (lhs_reduce, rhs_reduce) = reduce_axes(l_lead, r_lead);
            Op::MatMul {
                lhs: self.clone(),
                rhs: other.clone(),
                lhs_1d: a.ndim() == 1,
                rhs_1d: b.ndim() == 1,
                lhs_reduce,
                rhs_reduce,
            }
        } else {
            Op::Leaf
        };
        Ok(Tensor::from_op(data, requires_grad, op))
    }

    /// Negation, derived: `-a = a * (-1)`.
    pub fn neg(&self) -> Tensor {
        self.mul(&Tensor::scalar(-1.0))
            .expect("a 0-d scalar broadcasts against any shape")
    }

    /// Subtraction, derived: `a - b = a + (-b)`.
    pub fn sub(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        self.add(&other.neg())
    }

    /// Division, derived: `a / b = a * b^-1`.
    pub fn div(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        self.mul(&other.pow(-1.0))
    }

    fn binary_result(&self, other: &Tensor, data: ArrayD<f32>, op: Op) -> Tensor {
        let requires_grad = self.requires_grad() || other.requires_grad();
        let op = if requires_grad { op } else { Op::Leaf };
        Tensor::from_op(data, requires_grad, op)
    }
}
