use thiserror::Error;

/// Errors surfaced by the forward operations. A failed operation returns
/// before any graph node is created, so the computation graph is never left
/// in a partial state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("shapes {lhs:?} and {rhs:?} cannot be broadcast together")]
    ShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },

    #[error("incompatible shapes for matmul: {lhs:?} @ {rhs:?}")]
    MatmulShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },
}
