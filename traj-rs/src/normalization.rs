use crate::stats::median_mut;
use anyhow::{bail, Error};
use ndarray::prelude::*;
use sprs::CsMat;
use std::str::FromStr;

/// Normalization scheme for a genes x cells count matrix
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Normalization {
    /// Cell count totals are scaled to the median total and the
    /// transformation `x -> log2(1 + x)` is applied
    MedianLog2,
    /// Cell count totals are scaled to 10,000 and the transformation
    /// `x -> ln(1 + x)` is applied
    TenKLog1p,
    /// vanilla `x -> log2(1 + x)`, no scaling
    PlainLog2,
}

impl FromStr for Normalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medianlog2" => Ok(Normalization::MedianLog2),
            "log1p10k" => Ok(Normalization::TenKLog1p),
            "plainlog2" => Ok(Normalization::PlainLog2),
            _ => bail!("Normalization not recognized: {}", s),
        }
    }
}

/// Base of logarithm used by log_normalize
#[derive(Clone, Copy)]
pub enum LogBase {
    /// ln
    E,
    /// log2
    Two,
    /// log10
    Ten,
}

/// Log-normalize a genes x cells count matrix into a dense matrix:
/// 1. Scale each column (cell) so its total count equals the target
///    implied by `norm` (or `target_count`, when given)
/// 2. Apply the log1p transform in the base implied by `norm`
///
/// Zero entries stay zero under `log(1 + 0)`, so only stored entries are
/// transformed.
pub fn log_normalize(matrix: &CsMat<u32>, norm: Normalization, target_count: Option<f64>) -> Array2<f64> {
    let (genes, cells) = matrix.shape();

    let mut col_sums = Array1::<u64>::zeros(cells);
    for (&v, (_, c)) in matrix.iter() {
        col_sums[c] += u64::from(v);
    }

    let (target, log_base) = match norm {
        Normalization::MedianLog2 => {
            // Clone because median_mut sorts its argument in place.
            let median = median_mut(&mut col_sums.clone()).map_or(1.0, |m: u64| (m as f64).max(1.0));
            (target_count.unwrap_or(median), LogBase::Two)
        }
        Normalization::TenKLog1p => (target_count.unwrap_or(10_000.0), LogBase::E),
        Normalization::PlainLog2 => (f64::NAN, LogBase::Two),
    };

    let log1p_fn = match log_base {
        LogBase::E => |x: f64| (x + 1.0).ln(),
        LogBase::Two => |x: f64| (x + 1.0).log2(),
        LogBase::Ten => |x: f64| (x + 1.0).log10(),
    };

    let mut out = Array2::<f64>::zeros((genes, cells));
    for (&v, (r, c)) in matrix.iter() {
        let scaled = match norm {
            Normalization::PlainLog2 => f64::from(v),
            _ => {
                let total = (col_sums[c] as f64).max(1.0);
                f64::from(v) * target / total
            }
        };
        out[[r, c]] = log1p_fn(scaled);
    }
    out
}
