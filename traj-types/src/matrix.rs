use anyhow::{bail, Error};
use sprs::CsMat;
use std::collections::HashSet;

/// A genes x cells count matrix with its row and column identifiers.
///
/// Alignment between the matrix and its identifiers is validated once, at
/// construction. Downstream code may index rows/columns without re-checking.
#[derive(Clone, Debug)]
pub struct CountMatrix {
    pub name: String,
    pub cell_barcodes: Vec<String>,
    pub gene_ids: Vec<String>,
    pub gene_symbols: Vec<String>,
    pub matrix: CsMat<u32>,
}

impl CountMatrix {
    /// Build a `CountMatrix`, validating the row-name/column-name
    /// correspondence invariant:
    /// - `gene_ids` and `gene_symbols` both match the number of matrix rows
    /// - `cell_barcodes` matches the number of matrix columns
    /// - barcodes are unique (they key the join against cell metadata)
    pub fn new(
        name: impl Into<String>,
        cell_barcodes: Vec<String>,
        gene_ids: Vec<String>,
        gene_symbols: Vec<String>,
        matrix: CsMat<u32>,
    ) -> Result<CountMatrix, Error> {
        if gene_ids.len() != matrix.rows() {
            bail!(
                "gene id count ({}) does not match matrix rows ({})",
                gene_ids.len(),
                matrix.rows()
            );
        }
        if gene_symbols.len() != gene_ids.len() {
            bail!(
                "gene symbol count ({}) does not match gene id count ({})",
                gene_symbols.len(),
                gene_ids.len()
            );
        }
        if cell_barcodes.len() != matrix.cols() {
            bail!(
                "cell barcode count ({}) does not match matrix columns ({})",
                cell_barcodes.len(),
                matrix.cols()
            );
        }
        let mut seen = HashSet::with_capacity(cell_barcodes.len());
        for bc in &cell_barcodes {
            if !seen.insert(bc.as_str()) {
                bail!("duplicate cell barcode: {}", bc);
            }
        }
        Ok(CountMatrix {
            name: name.into(),
            cell_barcodes,
            gene_ids,
            gene_symbols,
            matrix,
        })
    }

    pub fn genes(&self) -> usize {
        self.matrix.rows()
    }

    pub fn cells(&self) -> usize {
        self.matrix.cols()
    }
}
