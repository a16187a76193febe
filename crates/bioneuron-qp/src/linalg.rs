// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Dense vector and sparse matrix-vector kernels over CSC storage

use sprs::{CsMat, CsMatView, TriMat};

#[inline]
pub(crate) fn norm_inf(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `A x` for a CSC matrix
pub(crate) fn mat_vec(a: CsMatView<'_, f64>, x: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.rows()];
    for (j, col) in a.outer_iterator().enumerate() {
        let xj = x[j];
        if xj == 0.0 {
            continue;
        }
        for (i, &v) in col.iter() {
            out[i] += v * xj;
        }
    }
    out
}

/// `Aᵀ y` for a CSC matrix
pub(crate) fn mat_t_vec(a: CsMatView<'_, f64>, y: &[f64]) -> Vec<f64> {
    a.outer_iterator()
        .map(|col| col.iter().map(|(i, &v)| v * y[i]).sum())
        .collect()
}

/// `P x` where only the upper triangle of the symmetric `P` is stored
pub(crate) fn sym_mat_vec(p: CsMatView<'_, f64>, x: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; p.rows()];
    for (j, col) in p.outer_iterator().enumerate() {
        for (i, &v) in col.iter() {
            out[i] += v * x[j];
            if i != j {
                out[j] += v * x[i];
            }
        }
    }
    out
}

/// `½ xᵀ P x + qᵀ x`
pub(crate) fn objective(p: CsMatView<'_, f64>, q: &[f64], x: &[f64]) -> f64 {
    0.5 * dot(x, &sym_mat_vec(p, x)) + dot(q, x)
}

/// Column-wise ∞-norms of the full symmetric matrix stored as its upper triangle
pub(crate) fn sym_col_norms(p: CsMatView<'_, f64>) -> Vec<f64> {
    let mut norms = vec![0.0_f64; p.cols()];
    for (j, col) in p.outer_iterator().enumerate() {
        for (i, &v) in col.iter() {
            norms[j] = norms[j].max(v.abs());
            if i != j {
                norms[i] = norms[i].max(v.abs());
            }
        }
    }
    norms
}

/// Column and row ∞-norms of a CSC matrix
pub(crate) fn col_row_norms(a: CsMatView<'_, f64>) -> (Vec<f64>, Vec<f64>) {
    let mut cols = vec![0.0_f64; a.cols()];
    let mut rows = vec![0.0_f64; a.rows()];
    for (j, col) in a.outer_iterator().enumerate() {
        for (i, &v) in col.iter() {
            cols[j] = cols[j].max(v.abs());
            rows[i] = rows[i].max(v.abs());
        }
    }
    (cols, rows)
}

/// `c · diag(row) · M · diag(col)` as a fresh CSC matrix
pub(crate) fn rescale(m: CsMatView<'_, f64>, row: &[f64], col: &[f64], c: f64) -> CsMat<f64> {
    let mut tri = TriMat::with_capacity((m.rows(), m.cols()), m.nnz());
    for (j, column) in m.outer_iterator().enumerate() {
        for (i, &v) in column.iter() {
            tri.add_triplet(i, j, c * row[i] * v * col[j]);
        }
    }
    tri.to_csc()
}

/// Keep the listed rows of `a`, in the listed order
pub(crate) fn select_rows(a: CsMatView<'_, f64>, rows: &[usize]) -> CsMat<f64> {
    let mut target = vec![None; a.rows()];
    for (r, &i) in rows.iter().enumerate() {
        target[i] = Some(r);
    }
    let mut tri = TriMat::new((rows.len(), a.cols()));
    for (j, col) in a.outer_iterator().enumerate() {
        for (i, &v) in col.iter() {
            if let Some(r) = target[i] {
                tri.add_triplet(r, j, v);
            }
        }
    }
    tri.to_csc()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CsMat<f64> {
        // [[1, 2], [0, 3], [4, 0]]
        let mut tri = TriMat::new((3, 2));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(2, 0, 4.0);
        tri.add_triplet(0, 1, 2.0);
        tri.add_triplet(1, 1, 3.0);
        tri.to_csc()
    }

    #[test]
    fn test_mat_vec_and_transpose() {
        let a = sample();
        assert_eq!(mat_vec(a.view(), &[1.0, 1.0]), vec![3.0, 3.0, 4.0]);
        assert_eq!(mat_t_vec(a.view(), &[1.0, 1.0, 1.0]), vec![5.0, 5.0]);
    }

    #[test]
    fn test_sym_mat_vec_uses_both_triangles() {
        // upper triangle of [[2, 1], [1, 3]]
        let mut tri = TriMat::new((2, 2));
        tri.add_triplet(0, 0, 2.0);
        tri.add_triplet(0, 1, 1.0);
        tri.add_triplet(1, 1, 3.0);
        let p: CsMat<f64> = tri.to_csc();
        assert_eq!(sym_mat_vec(p.view(), &[1.0, 2.0]), vec![4.0, 7.0]);
        assert_eq!(sym_col_norms(p.view()), vec![2.0, 3.0]);
        assert!((objective(p.view(), &[1.0, 1.0], &[1.0, 2.0]) - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_select_rows() {
        let a = sample();
        let reduced = select_rows(a.view(), &[2, 0]);
        assert_eq!(reduced.rows(), 2);
        assert_eq!(mat_vec(reduced.view(), &[1.0, 1.0]), vec![4.0, 3.0]);
    }

    #[test]
    fn test_norms() {
        let a = sample();
        let (cols, rows) = col_row_norms(a.view());
        assert_eq!(cols, vec![4.0, 3.0]);
        assert_eq!(rows, vec![2.0, 3.0, 4.0]);
        assert_eq!(norm_inf(&[-5.0, 2.0]), 5.0);
    }
}
