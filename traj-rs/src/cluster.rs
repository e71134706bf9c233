use anyhow::{bail, Error};
use log::info;
use ndarray::prelude::*;
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::collections::{BTreeMap, HashMap};

fn bincount(values: &[i16]) -> BTreeMap<i16, usize> {
    let mut res = BTreeMap::default();
    for &v in values {
        *res.entry(v).or_insert(0) += 1;
    }
    res
}

/// Relabel a clustering from greatest cluster size to least
pub fn relabel_by_size(mut labels: Vec<i16>) -> Vec<i16> {
    let mut hist = bincount(&labels).into_iter().collect::<Vec<_>>();
    hist.sort_by(|(_, x), (_, y)| y.cmp(x));
    let map = hist
        .into_iter()
        .enumerate()
        .map(|(i, j)| (j.0, i as i16))
        .collect::<HashMap<_, _>>();
    for x in labels.iter_mut() {
        *x = map[x];
    }
    labels
}

fn sq_dist(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (y - x).powi(2)).sum()
}

/// K-means over the rows of `embedding` with k-means++ seeding and Lloyd
/// iterations, capped at `max_iter`. Labels come back relabeled by size
/// (largest cluster first). Deterministic for a fixed `seed`.
pub fn kmeans(embedding: &ArrayView2<f64>, k: usize, max_iter: usize, seed: u64) -> Result<Vec<i16>, Error> {
    let (cells, dims) = embedding.dim();
    if k == 0 || k > cells {
        bail!("invalid cluster count {} for {} cells", k, cells);
    }

    let mut rng = Pcg64Mcg::seed_from_u64(seed);

    // k-means++ initialization
    let mut centers = Array2::<f64>::zeros((k, dims));
    let first = rng.gen_range(0..cells);
    centers.row_mut(0).assign(&embedding.row(first));
    let mut best_sq = Array1::<f64>::from_elem(cells, f64::INFINITY);
    for c in 1..k {
        for (i, row) in embedding.rows().into_iter().enumerate() {
            let d = sq_dist(&row, &centers.row(c - 1));
            if d < best_sq[i] {
                best_sq[i] = d;
            }
        }
        let total: f64 = best_sq.sum();
        let next = if total > 0.0 {
            WeightedIndex::new(best_sq.iter().copied())?.sample(&mut rng)
        } else {
            // all points coincide with a chosen center
            rng.gen_range(0..cells)
        };
        centers.row_mut(c).assign(&embedding.row(next));
    }

    let mut labels = vec![0i16; cells];
    for iter in 0..max_iter {
        let mut changed = false;
        for (i, row) in embedding.rows().into_iter().enumerate() {
            let mut best = 0usize;
            let mut best_d = f64::INFINITY;
            for c in 0..k {
                let d = sq_dist(&row, &centers.row(c));
                if d < best_d {
                    best_d = d;
                    best = c;
                }
            }
            if labels[i] != best as i16 {
                labels[i] = best as i16;
                changed = true;
            }
        }
        if !changed && iter > 0 {
            info!("k-means converged after {} iterations", iter);
            break;
        }

        let mut sums = Array2::<f64>::zeros((k, dims));
        let mut counts = vec![0usize; k];
        for (i, row) in embedding.rows().into_iter().enumerate() {
            sums.row_mut(labels[i] as usize).zip_mut_with(&row, |a, b| *a += b);
            counts[labels[i] as usize] += 1;
        }
        for c in 0..k {
            if counts[c] > 0 {
                centers.row_mut(c).assign(&(&sums.row(c) / counts[c] as f64));
            } else {
                // re-seed an empty cluster from the point farthest from its
                // current center
                let far = (0..cells)
                    .max_by(|&a, &b| {
                        let da = sq_dist(&embedding.row(a), &centers.row(labels[a] as usize));
                        let db = sq_dist(&embedding.row(b), &centers.row(labels[b] as usize));
                        da.partial_cmp(&db).unwrap()
                    })
                    .unwrap();
                centers.row_mut(c).assign(&embedding.row(far));
            }
        }
    }

    Ok(relabel_by_size(labels))
}

/// Mean position of each cluster in embedding space, one row per label in
/// `0..k`. Fails on labels outside that range or on empty clusters.
pub fn centroids(embedding: &ArrayView2<f64>, labels: &[i16], k: usize) -> Result<Array2<f64>, Error> {
    let (cells, dims) = embedding.dim();
    if labels.len() != cells {
        bail!("label count ({}) does not match cell count ({})", labels.len(), cells);
    }
    let mut sums = Array2::<f64>::zeros((k, dims));
    let mut counts = vec![0usize; k];
    for (i, &l) in labels.iter().enumerate() {
        if l < 0 || l as usize >= k {
            bail!("label {} outside 0..{}", l, k);
        }
        sums.row_mut(l as usize).zip_mut_with(&embedding.row(i), |a, b| *a += b);
        counts[l as usize] += 1;
    }
    for c in 0..k {
        if counts[c] == 0 {
            bail!("cluster {} has no cells", c);
        }
        sums.row_mut(c).mapv_inplace(|v| v / counts[c] as f64);
    }
    Ok(sums)
}
