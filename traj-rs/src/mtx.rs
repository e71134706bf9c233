use anyhow::{bail, format_err, Context, Error};
use flate2::bufread::MultiGzDecoder;
use sprs::{CsMat, TriMat};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Load a genes x cells count matrix from gzipped MTX format
pub fn load_mtx(path: impl AsRef<Path>) -> Result<CsMat<u32>, Error> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path).with_context(|| path.display().to_string())?);
    let mut gz = BufReader::new(MultiGzDecoder::new(file));
    let mut line = String::new();
    let mut mat: Option<TriMat<u32>> = None;
    let mut declared_nnz = 0;

    loop {
        let sz = gz.read_line(&mut line).with_context(|| path.display().to_string())?;
        if sz == 0 {
            break;
        }
        if line.starts_with('%') {
            line.clear();
            continue;
        }
        let mut data = line.split_whitespace();
        if mat.is_none() {
            let nrow = data.next().ok_or_else(|| format_err!("no NROW"))?.parse::<usize>()?;
            let ncol = data.next().ok_or_else(|| format_err!("no NCOL"))?.parse::<usize>()?;
            declared_nnz = data.next().ok_or_else(|| format_err!("no NNZ"))?.parse::<usize>()?;
            mat = Some(TriMat::with_capacity((nrow, ncol), declared_nnz));
        } else {
            let row = data
                .next()
                .ok_or_else(|| format_err!("missing ROW"))?
                .parse::<usize>()?
                - 1;
            let col = data
                .next()
                .ok_or_else(|| format_err!("missing COL"))?
                .parse::<usize>()?
                - 1;
            let val = data.next().ok_or_else(|| format_err!("missing VAL"))?.parse::<u32>()?;
            let m = mat.as_mut().unwrap();
            if row >= m.rows() || col >= m.cols() {
                bail!(
                    "entry ({}, {}) outside declared shape ({}, {})",
                    row + 1,
                    col + 1,
                    m.rows(),
                    m.cols()
                );
            }
            m.add_triplet(row, col, val);
        }
        line.clear();
    }

    let Some(matrix) = mat else { bail!("no matrix found") };
    if matrix.nnz() != declared_nnz {
        bail!(
            "header declares {} entries but file contains {}",
            declared_nnz,
            matrix.nnz()
        );
    }
    Ok(matrix.to_csr())
}
