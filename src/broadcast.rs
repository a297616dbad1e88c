use ndarray::{Array3, ArrayD, ArrayViewD, Axis, IxDyn};

use crate::error::TensorError;

/// Numpy-style broadcast of two shapes: right-align, pad the shorter with
/// size-1 axes, then each aligned pair must match or contain a 1.
pub(crate) fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>, TensorError> {
    let ndim = lhs.len().max(rhs.len());
    let mut shape = Vec::with_capacity(ndim);
    for i in 0..ndim {
        let l = padded(lhs, ndim, i);
        let r = padded(rhs, ndim, i);
        if l == r || l == 1 || r == 1 {
            shape.push(l.max(r));
        } else {
            return Err(TensorError::ShapeMismatch {
                lhs: lhs.to_vec(),
                rhs: rhs.to_vec(),
            });
        }
    }
    Ok(shape)
}

/// Views of both arrays broadcast to their common shape.
pub(crate) fn co_broadcast<'a>(
    lhs: &'a ArrayD<f32>,
    rhs: &'a ArrayD<f32>,
) -> Result<(ArrayViewD<'a, f32>, ArrayViewD<'a, f32>), TensorError> {
    let shape = broadcast_shape(lhs.shape(), rhs.shape())?;
    let err = || TensorError::ShapeMismatch {
        lhs: lhs.shape().to_vec(),
        rhs: rhs.shape().to_vec(),
    };
    let lv = lhs.broadcast(IxDyn(&shape)).ok_or_else(err)?;
    let rv = rhs.broadcast(IxDyn(&shape)).ok_or_else(err)?;
    Ok((lv, rv))
}

/// Split the aligned leading-axis positions of a matmul into the two sets
/// its backward pass sums over. A position where the left size is not
/// greater than the right belongs to the left set, otherwise to the right;
/// a tie (including two broadcast 1s) goes to the left set.
pub(crate) fn reduce_axes(left: &[usize], right: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let ndim = left.len().max(right.len());
    let mut left_axes = Vec::new();
    let mut right_axes = Vec::new();
    for i in 0..ndim {
        if padded(left, ndim, i) > padded(right, ndim, i) {
            right_axes.push(i);
        } else {
            left_axes.push(i);
        }
    }
    (left_axes, right_axes)
}

/// Sum over the given ascending axis positions, removing each.
pub(crate) fn sum_axes(mut array: ArrayD<f32>, axes: &[usize]) -> ArrayD<f32> {
    for &axis in axes.iter().rev() {
        array = array.sum_axis(Axis(axis));
    }
    array
}

/// Broadcast-aware matrix multiplication over dynamic-dimension arrays.
/// A 1-D left operand gets an implicit leading axis, a 1-D right operand an
/// implicit trailing axis; both are removed from the result again. Leading
/// axes broadcast by the usual rules and are flattened into one batch axis
/// for the per-matrix `dot` calls.
pub(crate) fn matmul_nd(lhs: &ArrayD<f32>, rhs: &ArrayD<f32>) -> Result<ArrayD<f32>, TensorError> {
    let mismatch = || TensorError::MatmulShapeMismatch {
        lhs: lhs.shape().to_vec(),
        rhs: rhs.shape().to_vec(),
    };
    if lhs.ndim() == 0 || rhs.ndim() == 0 {
        return Err(mismatch());
    }

    let lhs_1d = lhs.ndim() == 1;
    let rhs_1d = rhs.ndim() == 1;
    let lv = if lhs_1d {
        lhs.view().insert_axis(Axis(0))
    } else {
        lhs.view()
    };
    let rv = if rhs_1d {
        rhs.view().insert_axis(Axis(1))
    } else {
        rhs.view()
    };

    let rows = lv.shape()[lv.ndim() - 2];
    let inner = lv.shape()[lv.ndim() - 1];
    let cols = rv.shape()[rv.ndim() - 1];
    if inner != rv.shape()[rv.ndim() - 2] {
        return Err(mismatch());
    }

    let batch = broadcast_shape(&lv.shape()[..lv.ndim() - 2], &rv.shape()[..rv.ndim() - 2])
        .map_err(|_| mismatch())?;
    let batch_len: usize = batch.iter().product();

    let lb = flatten_batch(&lv, &batch, rows, inner).ok_or_else(mismatch)?;
    let rb = flatten_batch(&rv, &batch, inner, cols).ok_or_else(mismatch)?;

    let mut out = Array3::<f32>::zeros((batch_len, rows, cols));
    for i in 0..batch_len {
        let product = lb.index_axis(Axis(0), i).dot(&rb.index_axis(Axis(0), i));
        out.index_axis_mut(Axis(0), i).assign(&product);
    }

    let mut shape = batch;
    shape.push(rows);
    shape.push(cols);
    let mut result = out.into_shape(IxDyn(&shape)).map_err(|_| mismatch())?;
    if lhs_1d {
        let axis = result.ndim() - 2;
        result = result.remove_axis(Axis(axis));
    }
    if rhs_1d {
        let axis = result.ndim() - 1;
        result = result.remove_axis(Axis(axis));
    }
    Ok(result)
}

fn padded(shape: &[usize], ndim: usize, i: usize) -> usize {
    if i + shape.len() >= ndim {
        shape[i + shape.len() - ndim]
    } else {
        1
    }
}

/// Broadcast the leading axes of a matrix stack to `batch` and flatten them
/// into a single axis.
fn flatten_batch(
    view: &ArrayViewD<'_, f32>,
    batch: &[usize],
    rows: usize,
    cols: usize,
) -> Option<Array3<f32>> {
    let mut full = batch.to_vec();
    full.push(rows);
    full.push(cols);
    let batch_len: usize = batch.iter().product();
    // the incoming view may carry permuted strides (swap_axes); into_shape
    // requires a standard-layout copy
    let owned = view.broadcast(IxDyn(&full))?.as_standard_layout().into_owned();
    owned.into_shape((batch_len, rows, cols)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, ArrayD};

    #[test]
    fn broadcast_shape_pads_and_expands() {
        assert_eq!(broadcast_shape(&[2, 1, 3], &[4, 1]).unwrap(), vec![2, 4, 3]);
        assert_eq!(broadcast_shape(&[], &[5]).unwrap(), vec![5]);
        assert_eq!(broadcast_shape(&[3], &[3]).unwrap(), vec![3]);
    }

    #[test]
    fn broadcast_shape_rejects_mismatch() {
        assert!(broadcast_shape(&[3], &[4]).is_err());
        assert!(broadcast_shape(&[2, 3], &[3, 3]).is_err());
    }

    #[test]
    fn reduce_axes_assigns_broadcast_positions() {
        // right is broadcast over the left's leading axis
        assert_eq!(reduce_axes(&[2], &[]), (vec![], vec![0]));
        // left is broadcast over the right's leading axis
        assert_eq!(reduce_axes(&[], &[2]), (vec![0], vec![]));
        // equal sizes: the tie goes to the left set
        assert_eq!(reduce_axes(&[3], &[3]), (vec![0], vec![]));
        assert_eq!(
            reduce_axes(&[4, 1, 3], &[2, 3]),
            (vec![1, 2], vec![0])
        );
    }

    #[test]
    fn matmul_nd_dot_product_is_scalar() {
        let a = arr1(&[1.0_f32, 2.0, 3.0]).into_dyn();
        let b = arr1(&[4.0_f32, 5.0, 6.0]).into_dyn();
        let out = matmul_nd(&a, &b).unwrap();
        assert_eq!(out.ndim(), 0);
        assert_eq!(out.sum(), 32.0);
    }

    #[test]
    fn matmul_nd_matrix_vector() {
        let a = arr2(&[[1.0_f32, 2.0], [3.0, 4.0]]).into_dyn();
        let v = arr1(&[1.0_f32, 1.0]).into_dyn();
        let out = matmul_nd(&a, &v).unwrap();
        assert_eq!(out, arr1(&[3.0, 7.0]).into_dyn());
    }

    #[test]
    fn matmul_nd_broadcasts_leading_axes() {
        let a = ArrayD::from_shape_vec(
            ndarray::IxDyn(&[2, 2, 2]),
            vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        )
        .unwrap();
        let b = arr2(&[[1.0_f32, 0.0], [0.0, 1.0]]).into_dyn();
        let out = matmul_nd(&a, &b).unwrap();
        assert_eq!(out, a);
    }

    #[test]
    fn matmul_nd_accepts_permuted_strides() {
        // swap_axes leaves the array with non-standard strides, as the
        // backward pass does before its transposed products
        let mut a = ArrayD::from_shape_vec(
            ndarray::IxDyn(&[2, 2, 2]),
            vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        )
        .unwrap();
        a.swap_axes(1, 2);
        let b = arr2(&[[1.0_f32, 0.0], [0.0, 1.0]]).into_dyn();
        let out = matmul_nd(&a, &b).unwrap();
        assert_eq!(out, a);
    }

    #[test]
    fn matmul_nd_rejects_inner_mismatch() {
        let a = arr2(&[[1.0_f32, 2.0, 3.0]]).into_dyn();
        let b = arr2(&[[1.0_f32, 2.0]]).into_dyn();
        assert!(matmul_nd(&a, &b).is_err());
    }

    #[test]
    fn sum_axes_removes_requested_positions() {
        let a = ArrayD::from_shape_vec(ndarray::IxDyn(&[2, 3]), vec![1.0_f32; 6]).unwrap();
        let out = sum_axes(a, &[0]);
        assert_eq!(out, arr1(&[2.0, 2.0, 2.0]).into_dyn());
    }
}
