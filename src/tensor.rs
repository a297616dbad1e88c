use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use ndarray::{Array1, ArrayD, IxDyn};
use rand::distributions::{Distribution, Uniform};

use crate::autograd::Op;

/// A dense `f32` array with optional gradient tracking.
///
/// `Tensor` is a cheap shared handle: cloning it clones an `Rc`, and a
/// tensor produced by an operation keeps handles to its direct operands, so
/// one tensor can feed many results. The payload is never mutated after
/// construction; operations always produce new tensors.
#[derive(Clone)]
pub struct Tensor {
    pub(crate) inner: Rc<RefCell<TensorData>>,
}

pub(crate) struct TensorData {
    pub(crate) data: ArrayD<f32>,
    pub(crate) grad: ArrayD<f32>,
    pub(crate) requires_grad: bool,
    pub(crate) op: Op,
}

impl Tensor {
    /// Leaf tensor from an array payload. The gradient buffer starts at
    /// zero and keeps the payload's shape for the tensor's whole lifetime.
    pub fn new(data: impl Into<ArrayD<f32>>, requires_grad: bool) -> Tensor {
        Tensor::from_op(data.into(), requires_grad, Op::Leaf)
    }

    /// 1-D leaf tensor from a plain vector.
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Tensor {
        Tensor::new(Array1::from(data).into_dyn(), requires_grad)
    }

    /// 0-D untracked leaf, used to coerce raw numeric operands.
    pub fn scalar(value: f32) -> Tensor {
        Tensor::new(ArrayD::from_elem(IxDyn(&[]), value), false)
    }

    pub fn zeros(shape: &[usize], requires_grad: bool) -> Tensor {
        Tensor::new(ArrayD::zeros(IxDyn(shape)), requires_grad)
    }

    pub fn ones(shape: &[usize], requires_grad: bool) -> Tensor {
        Tensor::new(ArrayD::ones(IxDyn(shape)), requires_grad)
    }

    /// Leaf tensor sampled uniformly from [-1, 1).
    pub fn rand(shape: &[usize], requires_grad: bool) -> Tensor {
        let mut rng = rand::thread_rng();
        let dist = Uniform::new(-1.0_f32, 1.0);
        let data = ArrayD::from_shape_fn(IxDyn(shape), |_| dist.sample(&mut rng));
        Tensor::new(data, requires_grad)
    }

    pub(crate) fn from_op(data: ArrayD<f32>, requires_grad: bool, op: Op) -> Tensor {
        let grad = ArrayD::zeros(data.raw_dim());
        Tensor {
            inner: Rc::new(RefCell::new(TensorData {
                data,
                grad,
                requires_grad,
                op,
            })),
        }
    }

    pub fn data(&self) -> Ref<'_, ArrayD<f32>> {
        Ref::map(self.inner.borrow(), |t| &t.data)
    }

    pub fn grad(&self) -> Ref<'_, ArrayD<f32>> {
        Ref::map(self.inner.borrow(), |t| &t.grad)
    }

    pub fn requires_grad(&self) -> bool {
        self.inner.borrow().requires_grad
    }

    pub fn shape(&self) -> Vec<usize> {
        self.inner.borrow().data.shape().to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.inner.borrow().data.ndim()
    }

    /// Reset the gradient buffer to zero. `backward` accumulates across
    /// calls, so callers clear gradients between unrelated steps.
    pub fn zero_grad(&self) {
        let mut t = self.inner.borrow_mut();
        let dim = t.data.raw_dim();
        t.grad = ArrayD::zeros(dim);
    }

    /// Graph identity: the address of the shared allocation. Two handles to
    /// the same tensor compare equal here even though `Tensor` itself has no
    /// `Eq`.
    pub(crate) fn id(&self) -> *const () {
        Rc::as_ptr(&self.inner) as *const ()
    }

    pub(crate) fn op(&self) -> Op {
        self.inner.borrow().op.clone()
    }

    /// Add a backward contribution in place. Engine-only: user-facing
    /// operators never touch gradient buffers.
    pub(crate) fn accumulate_grad(&self, contribution: &ArrayD<f32>) {
        let mut t = self.inner.borrow_mut();
        if contribution.shape() != t.grad.shape() {
            panic!(
                "gradient of shape {:?} cannot be accumulated into a tensor of shape {:?}",
                contribution.shape(),
                t.grad.shape()
            );
        }
        t.grad += contribution;
    }

    /// Seed for the reverse sweep: d(output)/d(output) = 1.
    pub(crate) fn seed_grad_ones(&self) {
        let mut t = self.inner.borrow_mut();
        let dim = t.data.raw_dim();
        t.grad = ArrayD::ones(dim);
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.inner.borrow();
        if t.requires_grad {
            write!(f, "Tensor({}, requires_grad=true)", t.data)
        } else {
            write!(f, "Tensor({})", t.data)
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<f32> for Tensor {
    fn from(value: f32) -> Tensor {
        Tensor::scalar(value)
    }
}

impl From<Vec<f32>> for Tensor {
    fn from(values: Vec<f32>) -> Tensor {
        Tensor::from_vec(values, false)
    }
}
