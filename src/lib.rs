//! Minimal reverse-mode automatic differentiation over [`ndarray`] tensors.
//!
//! Arithmetic on [`Tensor`] values builds a dynamic computation graph; a
//! single [`Tensor::backward`] call on a result then fills in the gradient
//! of that result with respect to every tensor in the expression that was
//! constructed with gradient tracking.
//!
//! ```
//! use ndarray::array;
//! use revgrad::Tensor;
//!
//! let x = Tensor::new(array![1.0_f32, 2.0, 3.0].into_dyn(), true);
//! let y = Tensor::new(array![4.0_f32, 5.0, 6.0].into_dyn(), true);
//!
//! let z = (&x * &y).sum();
//! z.backward();
//!
//! assert_eq!(*x.grad(), array![4.0_f32, 5.0, 6.0].into_dyn());
//! assert_eq!(*y.grad(), array![1.0_f32, 2.0, 3.0].into_dyn());
//! ```

mod arith;
mod autograd;
mod broadcast;
mod engine;
mod error;
mod operation;
mod tensor;

pub use error::TensorError;
pub use tensor::Tensor;
