//! Scatter values computed on a subset back into a larger index space.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{Error, Result};

fn check_indices(indices: &[usize], len: usize, total: usize) -> Result<()> {
    if indices.len() != len {
        return Err(Error::InvalidIndexMap(format!(
            "{} indices for {} values",
            indices.len(),
            len
        )));
    }
    if let Some(&last) = indices.last() {
        if last >= total {
            return Err(Error::InvalidIndexMap(format!(
                "index {last} out of range for length {total}"
            )));
        }
    }
    if indices.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::InvalidIndexMap(
            "indices must be strictly increasing".into(),
        ));
    }
    Ok(())
}

/// Place `values[i]` at position `indices[i]` of a length-`total` array,
/// `fill` everywhere else.
pub fn unmap<T: Clone>(
    values: ArrayView1<T>,
    total: usize,
    indices: &[usize],
    fill: T,
) -> Result<Array1<T>> {
    check_indices(indices, values.len(), total)?;
    let mut out = Array1::from_elem(total, fill);
    for (value, &index) in values.iter().zip(indices) {
        out[index] = value.clone();
    }
    Ok(out)
}

/// Row-wise variant of [`unmap`]: `values` is `K x D`, the result `total x D`.
pub fn unmap_rows<T: Clone>(
    values: ArrayView2<T>,
    total: usize,
    indices: &[usize],
    fill: T,
) -> Result<Array2<T>> {
    check_indices(indices, values.nrows(), total)?;
    let mut out = Array2::from_elem((total, values.ncols()), fill);
    for (row, &index) in values.axis_iter(Axis(0)).zip(indices) {
        out.row_mut(index).assign(&row);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    fn test_unmap() {
        let values = array![7, 8];
        let out = unmap(values.view(), 5, &[1, 3], -1).unwrap();
        assert_eq!(out, array![-1, 7, -1, 8, -1]);
    }

    #[test]
    fn test_unmap_rows() {
        let values = array![[1.0, 2.0], [3.0, 4.0]];
        let out = unmap_rows(values.view(), 3, &[0, 2], 0.0).unwrap();
        assert_eq!(out, array![[1.0, 2.0], [0.0, 0.0], [3.0, 4.0]]);
    }

    #[test]
    fn test_unmap_empty() {
        let values = Array2::<f32>::zeros((0, 4));
        let out = unmap_rows(values.view(), 3, &[], 0.0).unwrap();
        assert_eq!(out, Array2::<f32>::zeros((3, 4)));
    }

    #[test]
    fn test_unmap_rejects_bad_indices() {
        let values = array![1, 2];
        assert!(unmap(values.view(), 4, &[2, 1], 0).is_err());
        assert!(unmap(values.view(), 4, &[1, 1], 0).is_err());
        assert!(unmap(values.view(), 4, &[1, 4], 0).is_err());
        assert!(unmap(values.view(), 4, &[1], 0).is_err());
    }
}
