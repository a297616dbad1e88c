use ndarray::{ArrayD, Axis};

use crate::broadcast::{matmul_nd, sum_axes};
use crate::tensor::Tensor;

/// Provenance of a tensor: the operation that produced it, handles to its
/// direct operands, and the axis metadata its backward formula needs.
/// Leaves and results whose operands are all untracked carry `Leaf`, which
/// has no graph edges and a no-op backward step.
#[derive(Clone)]
pub(crate) enum Op {
    Leaf,
    Add(Tensor, Tensor),
    Mul(Tensor, Tensor),
    /// Elementwise power with a fixed exponent.
    Pow(Tensor, f32),
    /// Full reduction to a 0-D scalar.
    Sum(Tensor),
    /// Matrix multiplication. The 1-D flags record which operands received
    /// an implicit axis in the forward pass; the reduce sets are the leading
    /// axis positions each operand's gradient is summed over to undo
    /// broadcasting, computed once at construction.
    MatMul {
        lhs: Tensor,
        rhs: Tensor,
        lhs_1d: bool,
        rhs_1d: bool,
        lhs_reduce: Vec<usize>,
        rhs_reduce: Vec<usize>,
    },
}

impl Op {
    pub(crate) fn operands(&self) -> Vec<Tensor> {
        match self {
            Op::Leaf => Vec::new(),
            Op::Add(a, b) | Op::Mul(a, b) => vec![a.clone(), b.clone()],
            Op::Pow(a, _) | Op::Sum(a) => vec![a.clone()],
            Op::MatMul { lhs, rhs, .. } => vec![lhs.clone(), rhs.clone()],
        }
    }
}

/// One chain-rule step: read the node's (already finalized) gradient and
/// accumulate the local contributions into each tracking operand.
pub(crate) fn backward_step(node: &Tensor) {
    let (op, grad) = {
        let t = node.inner.borrow();
        (t.op.clone(), t.grad.clone())
    };
    match op {
        Op::Leaf => {}
        Op::Add(a, b) => {
            // d(a + b)/da = d(a + b)/db = identity
            if a.requires_grad() {
                a.accumulate_grad(&grad);
            }
            if b.requires_grad() {
                b.accumulate_grad(&grad);
            }
        }
        Op::Mul(a, b) => {
            if a.requires_grad() {
                let contribution = &grad * &*b.data();
                a.accumulate_grad(&contribution);
            }
            if b.requires_grad() {
                let contribution = &grad * &*a.data();
                b.accumulate_grad(&contribution);
            }
        }
        Op::Pow(a, p) => {
            if a.requires_grad() {
                // d(x^p)/dx = p * x^(p-1)
                let local = a.data().mapv(|x| p * x.powf(p - 1.0));
                let contribution = &grad * &local;
                a.accumulate_grad(&contribution);
            }
        }
        Op::Sum(a) => {
            if a.requires_grad() {
                let g = grad.sum();
                let contribution = ArrayD::from_elem(a.data().raw_dim(), g);
                a.accumulate_grad(&contribution);
            }
        }
        Op::MatMul {
            lhs,
            rhs,
            lhs_1d,
            rhs_1d,
            lhs_reduce,
            rhs_reduce,
        } => {
            // Re-expand the result gradient at the axes the forward pass
            // removed, so both backward products are plain matmuls again.
            let mut ge = grad;
            if lhs_1d {
                ge = ge.insert_axis(Axis(0));
            }
            if rhs_1d {
                let axis = ge.ndim();
                ge = ge.insert_axis(Axis(axis));
            }

            if lhs.requires_grad() {
                // g @ swapaxes(rhs, -1, -2), summed over the leading axes
                // that were broadcast on the left side
                let mut rt = rhs.data().clone();
                if rhs_1d {
                    let axis = rt.ndim();
                    rt = rt.insert_axis(Axis(axis));
                }
                let n = rt.ndim();
                rt.swap_axes(n - 1, n - 2);
                let contribution =
                    reduce_to_operand(matmul_backward_product(&ge, &rt), &lhs_reduce, &lhs);
                lhs.accumulate_grad(&contribution);
            }
            if rhs.requires_grad() {
                let mut lt = lhs.data().clone();
                if lhs_1d {
                    lt = lt.insert_axis(Axis(0));
                }
                let n = lt.ndim();
                lt.swap_axes(n - 1, n - 2);
                let contribution =
                    reduce_to_operand(matmul_backward_product(&lt, &ge), &rhs_reduce, &rhs);
                rhs.accumulate_grad(&contribution);
            }
        }
    }
}

fn matmul_backward_product(lhs: &ArrayD<f32>, rhs: &ArrayD<f32>) -> ArrayD<f32> {
    match matmul_nd(lhs, rhs) {
        Ok(product) => product,
        // shapes here derive from a forward pass that already succeeded
        Err(e) => panic!("matmul backward invariant violated: {e}"),
    }
}

/// Sum a backward product over the broadcast leading axes and reshape it to
/// the operand's original shape.
fn reduce_to_operand(product: ArrayD<f32>, axes: &[usize], operand: &Tensor) -> ArrayD<f32> {
    let dim = operand.data().raw_dim();
    let reduced = sum_axes(product, axes);
    match reduced.into_shape(dim) {
        Ok(contribution) => contribution,
        Err(_) => panic!(
            "matmul backward produced a gradient that cannot take the operand shape {:?} \
             (leading axes of equal size reduce on the left operand)",
            operand.shape()
        ),
    }
}
