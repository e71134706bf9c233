#![allow(non_snake_case)]

//! Randomized PCA.
//!
//! Gaussian random projection followed by a few power iterations with
//! Gram-Schmidt re-orthonormalization, then an exact eigendecomposition of
//! the small projected Gram matrix by cyclic Jacobi rotations. Everything
//! runs on plain `ndarray` matrix products, so no BLAS/LAPACK backend is
//! required, and all randomness flows from the explicit seed.

use anyhow::{format_err, Error};
use ndarray::prelude::*;
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// Result of a PCA run
pub struct PcaResult {
    /// cells x k principal-component coordinates
    pub coords: Array2<f64>,
    /// singular values of the centered matrix, largest first
    pub singular_values: Array1<f64>,
    /// k x features principal axes
    pub components: Array2<f64>,
}

/// Orthonormalize the columns of `y` in place by modified Gram-Schmidt.
/// Columns that become numerically zero are left as zero vectors.
fn orthonormalize(mut y: Array2<f64>) -> Array2<f64> {
    let cols = y.ncols();
    for j in 0..cols {
        for i in 0..j {
            let proj = y.column(i).dot(&y.column(j));
            let vi = y.column(i).to_owned();
            y.column_mut(j).zip_mut_with(&vi, |a, b| *a -= proj * b);
        }
        let norm = y.column(j).dot(&y.column(j)).sqrt();
        if norm > 1e-12 {
            y.column_mut(j).mapv_inplace(|v| v / norm);
        } else {
            y.column_mut(j).fill(0.0);
        }
    }
    y
}

/// Eigendecomposition of a small symmetric matrix by cyclic Jacobi
/// rotations. Returns `(eigenvalues, eigenvectors)` with eigenvectors in
/// columns, unsorted.
fn jacobi_eigh(mut a: Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::<f64>::eye(n);
    for _sweep in 0..100 {
        let mut off = 0.0;
        for p in 0..n {
            for q in p + 1..n {
                off += a[[p, q]] * a[[p, q]];
            }
        }
        if off.sqrt() < 1e-12 {
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                if a[[p, q]].abs() < 1e-300 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * a[[p, q]]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }
    (a.diag().to_owned(), v)
}

/// Run a rank-`k` PCA of `x` (cells x features) with `n_iter` power
/// iterations. Features are centered first. Deterministic for a fixed
/// `seed`.
pub fn run_pca(x: &ArrayView2<f64>, k: usize, n_iter: usize, seed: u64) -> Result<PcaResult, Error> {
    let (m, n) = x.dim();
    if m < 2 || n < 2 {
        return Err(format_err!("The input matrix must be at least 2x2."));
    }
    if k == 0 || k > std::cmp::min(m, n) {
        return Err(format_err!("invalid k"));
    }

    let means = x.mean_axis(Axis(0)).unwrap();
    let xc = x - &means.view().insert_axis(Axis(0));

    // block size: oversample by 2x, as in randomized block Krylov SVD
    let l = std::cmp::min(std::cmp::min(m, n), 2 * k);

    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let unif = Uniform::new(-1.0, 1.0);
    let omega = Array2::from_shape_fn((n, l), |_| unif.sample(&mut rng));

    let mut q = orthonormalize(xc.dot(&omega));
    for _ in 0..n_iter {
        let z = xc.t().dot(&q);
        q = orthonormalize(xc.dot(&z));
    }

    let b = q.t().dot(&xc);
    let gram = b.dot(&b.t());
    let (eigvals, w) = jacobi_eigh(gram);

    let mut order: Vec<usize> = (0..l).collect();
    order.sort_by(|&i, &j| eigvals[j].partial_cmp(&eigvals[i]).unwrap());
    order.truncate(k);

    let mut singular_values = Array1::<f64>::zeros(k);
    let mut w_k = Array2::<f64>::zeros((l, k));
    for (out_col, &src_col) in order.iter().enumerate() {
        singular_values[out_col] = eigvals[src_col].max(0.0).sqrt();
        w_k.column_mut(out_col).assign(&w.column(src_col));
    }

    let u_k = q.dot(&w_k);
    let coords = &u_k * &singular_values.view().insert_axis(Axis(0));

    let mut components = u_k.t().dot(&xc);
    for (mut row, &s) in components.rows_mut().into_iter().zip(&singular_values) {
        if s > 1e-12 {
            row.mapv_inplace(|v| v / s);
        }
    }

    Ok(PcaResult {
        coords,
        singular_values,
        components,
    })
}
