use serde::{Deserialize, Serialize};

/// Per-cell pseudotime. `None` marks cells whose assigned node is not
/// reachable from any root: explicitly undefined, never defaulted to zero
/// and never dropped from the vector.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PseudotimeVector {
    pub values: Vec<Option<f64>>,
}

impl PseudotimeVector {
    pub fn new(values: Vec<Option<f64>>) -> PseudotimeVector {
        PseudotimeVector { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of cells with a defined pseudotime.
    pub fn defined(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defined_count() {
        let pt = PseudotimeVector::new(vec![Some(0.0), None, Some(1.5)]);
        assert_eq!(pt.len(), 3);
        assert_eq!(pt.defined(), 2);
    }
}
