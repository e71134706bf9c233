use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One record per cell, foreign-keyed to the matrix columns by barcode.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CellRecord {
    pub barcode: String,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default, alias = "timepoint")]
    pub time_label: Option<String>,
    #[serde(default)]
    pub cell_type: Option<String>,
}

/// Per-cell metadata, stored in matrix column order after the join.
#[derive(Clone, Debug, Default)]
pub struct CellMetadata {
    pub records: Vec<CellRecord>,
}

impl CellMetadata {
    /// Join a set of records against the matrix barcodes. The table must
    /// cover every matrix barcode exactly once and contain nothing else;
    /// the result is reordered to matrix column order.
    pub fn join(records: Vec<CellRecord>, cell_barcodes: &[String]) -> Result<CellMetadata, Error> {
        let mut by_barcode: HashMap<&str, CellRecord> = HashMap::with_capacity(records.len());
        for rec in &records {
            if by_barcode.insert(rec.barcode.as_str(), rec.clone()).is_some() {
                bail!("duplicate barcode in cell metadata: {}", rec.barcode);
            }
        }
        let mut ordered = Vec::with_capacity(cell_barcodes.len());
        for bc in cell_barcodes {
            match by_barcode.remove(bc.as_str()) {
                Some(rec) => ordered.push(rec),
                None => bail!("matrix barcode {} missing from cell metadata", bc),
            }
        }
        if !by_barcode.is_empty() {
            let stray = by_barcode.keys().next().unwrap();
            bail!(
                "cell metadata contains {} barcodes not present in the matrix (e.g. {})",
                by_barcode.len(),
                stray
            );
        }
        Ok(CellMetadata { records: ordered })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Per-cell time labels, `None` where the column was absent.
    pub fn time_labels(&self) -> Vec<Option<&str>> {
        self.records.iter().map(|r| r.time_label.as_deref()).collect()
    }
}

/// One record per gene; `gene_symbol` is the mandatory human-readable field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneRecord {
    pub gene_id: String,
    pub gene_symbol: String,
}

#[cfg(test)]
mod test {
    use super::*;

    fn rec(bc: &str, time: Option<&str>) -> CellRecord {
        CellRecord {
            barcode: bc.to_string(),
            time_label: time.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_join_reorders() {
        let barcodes = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let records = vec![rec("c", Some("E12")), rec("a", Some("E10")), rec("b", None)];
        let meta = CellMetadata::join(records, &barcodes).unwrap();
        assert_eq!(meta.time_labels(), vec![Some("E10"), None, Some("E12")]);
    }

    #[test]
    fn test_join_missing_barcode() {
        let barcodes = vec!["a".to_string(), "b".to_string()];
        let records = vec![rec("a", None)];
        assert!(CellMetadata::join(records, &barcodes).is_err());
    }

    #[test]
    fn test_join_stray_barcode() {
        let barcodes = vec!["a".to_string()];
        let records = vec![rec("a", None), rec("z", None)];
        assert!(CellMetadata::join(records, &barcodes).is_err());
    }

    #[test]
    fn test_join_duplicate() {
        let barcodes = vec!["a".to_string(), "b".to_string()];
        let records = vec![rec("a", None), rec("a", None), rec("b", None)];
        assert!(CellMetadata::join(records, &barcodes).is_err());
    }
}
