use anyhow::{Context, Error};
use std::fs::File;
use std::path::Path;
use traj_types::matrix::CountMatrix;
use traj_types::metadata::{CellMetadata, CellRecord, GeneRecord};

/// Read per-cell metadata from a CSV with a header and a mandatory
/// `barcode` column, then join it against the matrix barcodes. The join
/// validates coverage both ways and reorders records to matrix column
/// order; downstream code indexes by position without re-checking.
pub fn load_cell_metadata(path: impl AsRef<Path>, matrix: &CountMatrix) -> Result<CellMetadata, Error> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| path.display().to_string())?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for (i, rec) in reader.deserialize().enumerate() {
        let rec: CellRecord = rec.with_context(|| format!("{}: record {}", path.display(), i + 1))?;
        records.push(rec);
    }
    CellMetadata::join(records, &matrix.cell_barcodes).with_context(|| path.display().to_string())
}

/// Read the gene table from a CSV with `gene_id` and `gene_symbol` columns.
pub fn load_gene_metadata(path: impl AsRef<Path>) -> Result<Vec<GeneRecord>, Error> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| path.display().to_string())?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for (i, rec) in reader.deserialize().enumerate() {
        let rec: GeneRecord = rec.with_context(|| format!("{}: record {}", path.display(), i + 1))?;
        records.push(rec);
    }
    Ok(records)
}

#[cfg(test)]
mod test {
    use super::*;
    use sprs::TriMat;
    use std::io::Write;

    fn tiny_count_matrix(barcodes: &[&str]) -> CountMatrix {
        let mut tri = TriMat::new((2, barcodes.len()));
        tri.add_triplet(0, 0, 1u32);
        CountMatrix::new(
            "test",
            barcodes.iter().map(|s| s.to_string()).collect(),
            vec!["g1".into(), "g2".into()],
            vec!["S1".into(), "S2".into()],
            tri.to_csr(),
        )
        .unwrap()
    }

    fn write_csv(name: &str, body: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("traj_rs_metadata_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        File::create(&path).unwrap().write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_cell_metadata() {
        let matrix = tiny_count_matrix(&["AAA", "CCC"]);
        let path = write_csv(
            "cells.csv",
            "barcode,batch,timepoint,cell_type\nCCC,b1,E12,neuron\nAAA,b1,E9,progenitor\n",
        );
        let meta = load_cell_metadata(&path, &matrix).unwrap();
        assert_eq!(meta.len(), 2);
        // reordered to matrix column order, `timepoint` aliased to time_label
        assert_eq!(meta.records[0].barcode, "AAA");
        assert_eq!(meta.time_labels(), vec![Some("E9"), Some("E12")]);
    }

    #[test]
    fn test_incomplete_table_fails() {
        let matrix = tiny_count_matrix(&["AAA", "CCC"]);
        let path = write_csv("cells_incomplete.csv", "barcode\nAAA\n");
        assert!(load_cell_metadata(&path, &matrix).is_err());
    }

    #[test]
    fn test_load_gene_metadata() {
        let path = write_csv("genes.csv", "gene_id,gene_symbol\nENSG1,ACTB\nENSG2,GAPDH\n");
        let genes = load_gene_metadata(&path).unwrap();
        assert_eq!(genes.len(), 2);
        assert_eq!(genes[1].gene_symbol, "GAPDH");
    }
}
