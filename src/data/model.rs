use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// SampleTable – columns of values keyed by variable identifier
// ---------------------------------------------------------------------------

/// Weighted samples, one column per variable.
#[derive(Debug, Clone)]
pub struct SampleTable {
    /// Variable identifier → column index.
    lookup_table: BTreeMap<String, usize>,
    columns: Vec<Vec<f64>>,
    /// Importance weights, one per sample.
    weights: Vec<f64>,
}

impl SampleTable {
    /// Build a table from named columns.
    ///
    /// Names must be unique and every column (and the weights, if given) must
    /// hold the same number of samples. Missing weights default to 1.
    pub fn new(names: Vec<String>, columns: Vec<Vec<f64>>, weights: Option<Vec<f64>>) -> Result<Self> {
        if names.len() != columns.len() {
            bail!("{} variable names for {} columns", names.len(), columns.len());
        }

        let n_samples = columns.first().map(Vec::len).unwrap_or(0);
        for (name, column) in names.iter().zip(&columns) {
            if column.len() != n_samples {
                bail!("column '{name}' has {} samples, expected {n_samples}", column.len());
            }
        }

        let weights = match weights {
            Some(w) if !columns.is_empty() && w.len() != n_samples => {
                bail!("{} weights for {n_samples} samples", w.len())
            }
            Some(w) => w,
            None => vec![1.0; n_samples],
        };

        let mut lookup_table = BTreeMap::new();
        for (idx, name) in names.into_iter().enumerate() {
            if lookup_table.contains_key(&name) {
                bail!("duplicate variable '{name}'");
            }
            lookup_table.insert(name, idx);
        }

        Ok(SampleTable {
            lookup_table,
            columns,
            weights,
        })
    }

    pub fn lookup_table(&self) -> &BTreeMap<String, usize> {
        &self.lookup_table
    }

    /// Samples of a single variable, if present.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let idx = *self.lookup_table.get(name)?;
        self.columns.get(idx).map(Vec::as_slice)
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Backing stores
// ---------------------------------------------------------------------------

/// Importance-weighted parameter samples, keyed by parameter identifier.
#[derive(Debug, Clone)]
pub struct ImportanceSamples {
    path: PathBuf,
    table: SampleTable,
}

impl ImportanceSamples {
    pub fn new(path: impl Into<PathBuf>, table: SampleTable) -> Self {
        ImportanceSamples {
            path: path.into(),
            table,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &SampleTable {
        &self.table
    }
}

/// One entry of a prediction's `description.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservableDescription {
    pub name: String,
    #[serde(default)]
    pub kinematics: BTreeMap<String, f64>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Observable predictions, keyed by observable identifier.
#[derive(Debug, Clone)]
pub struct Prediction {
    path: PathBuf,
    observables: Vec<ObservableDescription>,
    table: SampleTable,
}

impl Prediction {
    pub fn new(path: impl Into<PathBuf>, observables: Vec<ObservableDescription>, table: SampleTable) -> Self {
        Prediction {
            path: path.into(),
            observables,
            table,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Observables in column order, with their kinematics and options.
    pub fn observables(&self) -> &[ObservableDescription] {
        &self.observables
    }

    pub fn table(&self) -> &SampleTable {
        &self.table
    }
}
