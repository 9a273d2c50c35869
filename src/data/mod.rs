//! Keyed feature matrix.
//!
//! Rows are data items identified by a unique key (the time-series `mkey`),
//! columns are named `f32` features. An optional integer label column carries
//! labels that already exist in the source data; it is never treated as a
//! feature.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};
use crate::primitives::Matrix;

/// Row-wise feature lookup.
///
/// Labeling functions receive the active row through this trait instead of
/// closing over a shared table.
pub trait FeatureLookup {
    /// Value of `name` for this row, `None` when the column does not exist.
    fn feature(&self, name: &str) -> Option<f32>;
}

impl FeatureLookup for HashMap<String, f32> {
    fn feature(&self, name: &str) -> Option<f32> {
        self.get(name).copied()
    }
}

impl FeatureLookup for std::collections::BTreeMap<String, f32> {
    fn feature(&self, name: &str) -> Option<f32> {
        self.get(name).copied()
    }
}

/// An existing label column (label index per row, `-1` for unlabeled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelColumn {
    /// Column name in the source data.
    pub name: String,
    /// One value per row.
    pub values: Vec<i32>,
}

/// A named feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Feature name.
    pub name: String,
    /// One value per row.
    pub values: Vec<f32>,
}

/// Items × named feature columns, keyed by item identifier.
///
/// # Examples
///
/// ```
/// use labelsmith::data::{FeatureLookup, FeatureMatrix};
///
/// let fm = FeatureMatrix::new(
///     vec!["ts-1".into(), "ts-2".into()],
///     vec![("mean".into(), vec![0.5, 1.5]), ("std".into(), vec![0.1, 0.2])],
/// )
/// .expect("valid columns");
///
/// assert_eq!(fm.shape(), (2, 2));
/// let row = fm.row_by_key("ts-2").expect("key exists");
/// assert_eq!(row.feature("mean"), Some(1.5));
/// assert_eq!(row.feature("median"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FeatureMatrixRecord", into = "FeatureMatrixRecord")]
pub struct FeatureMatrix {
    keys: Vec<String>,
    columns: Vec<Column>,
    label_column: Option<LabelColumn>,
    key_index: HashMap<String, usize>,
    column_index: HashMap<String, usize>,
}

/// Serialized shape of a [`FeatureMatrix`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureMatrixRecord {
    keys: Vec<String>,
    columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_column: Option<LabelColumn>,
}

impl TryFrom<FeatureMatrixRecord> for FeatureMatrix {
    type Error = LabelError;

    fn try_from(record: FeatureMatrixRecord) -> Result<Self> {
        let columns = record
            .columns
            .into_iter()
            .map(|c| (c.name, c.values))
            .collect();
        let fm = Self::new(record.keys, columns)?;
        match record.label_column {
            Some(label) => fm.with_label_column(label.name, label.values),
            None => Ok(fm),
        }
    }
}

impl From<FeatureMatrix> for FeatureMatrixRecord {
    fn from(fm: FeatureMatrix) -> Self {
        Self {
            keys: fm.keys,
            columns: fm.columns,
            label_column: fm.label_column,
        }
    }
}

impl FeatureMatrix {
    /// Creates a feature matrix from item keys and named columns.
    ///
    /// # Errors
    ///
    /// Returns an error if keys are duplicated, a column name is empty or
    /// duplicated, or a column length differs from the number of keys.
    pub fn new(keys: Vec<String>, columns: Vec<(String, Vec<f32>)>) -> Result<Self> {
        let mut key_index = HashMap::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            if key_index.insert(key.clone(), i).is_some() {
                return Err(format!("Duplicate item key '{key}'").into());
            }
        }

        let mut column_index = HashMap::with_capacity(columns.len());
        let mut stored = Vec::with_capacity(columns.len());
        for (i, (name, values)) in columns.into_iter().enumerate() {
            if name.is_empty() {
                return Err("Column names cannot be empty".into());
            }
            if values.len() != keys.len() {
                return Err(LabelError::DimensionMismatch {
                    expected: format!("{} values in column '{name}'", keys.len()),
                    actual: values.len().to_string(),
                });
            }
            if column_index.insert(name.clone(), i).is_some() {
                return Err(format!("Duplicate column name '{name}'").into());
            }
            stored.push(Column { name, values });
        }

        Ok(Self {
            keys,
            columns: stored,
            label_column: None,
            key_index,
            column_index,
        })
    }

    /// Attaches an existing label column.
    ///
    /// # Errors
    ///
    /// Returns an error if the length differs from the row count or the name
    /// collides with a feature column.
    pub fn with_label_column(mut self, name: impl Into<String>, values: Vec<i32>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.keys.len() {
            return Err(LabelError::DimensionMismatch {
                expected: format!("{} label values", self.keys.len()),
                actual: values.len().to_string(),
            });
        }
        if self.column_index.contains_key(&name) {
            return Err(format!("Label column '{name}' collides with a feature column").into());
        }
        self.label_column = Some(LabelColumn { name, values });
        Ok(self)
    }

    /// Returns the shape as (`n_rows`, `n_feature_columns`).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.keys.len(), self.columns.len())
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.keys.len()
    }

    /// Returns true when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Item keys in row order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Feature column names in column order (the label column is excluded).
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns true if a feature column with this name exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    /// Returns a feature column by name.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::MissingFeature`] if the column doesn't exist.
    pub fn column(&self, name: &str) -> Result<&[f32]> {
        self.column_index
            .get(name)
            .map(|&i| self.columns[i].values.as_slice())
            .ok_or_else(|| LabelError::MissingFeature {
                feature: name.to_string(),
            })
    }

    /// The existing label column, if any.
    #[must_use]
    pub fn label_column(&self) -> Option<&LabelColumn> {
        self.label_column.as_ref()
    }

    /// Row position of an item key.
    #[must_use]
    pub fn row_index(&self, key: &str) -> Option<usize> {
        self.key_index.get(key).copied()
    }

    /// Row view at position `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    #[must_use]
    pub fn row(&self, idx: usize) -> FeatureRow<'_> {
        assert!(idx < self.keys.len(), "row index out of bounds");
        FeatureRow { matrix: self, idx }
    }

    /// Row view for an item key.
    #[must_use]
    pub fn row_by_key(&self, key: &str) -> Option<FeatureRow<'_>> {
        self.row_index(key).map(|idx| FeatureRow { matrix: self, idx })
    }

    /// Selects feature columns by name, keeping keys (and dropping the label column).
    ///
    /// # Errors
    ///
    /// Returns an error if any column doesn't exist.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let mut selected = Vec::with_capacity(names.len());
        for &name in names {
            selected.push((name.to_string(), self.column(name)?.to_vec()));
        }
        Self::new(self.keys.clone(), selected)
    }

    /// Gathers rows by position into a new matrix, carrying the label column.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let keys: Vec<String> = indices.iter().map(|&i| self.keys[i].clone()).collect();
        let key_index = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i))
            .collect();
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: indices.iter().map(|&i| c.values[i]).collect(),
            })
            .collect();
        let label_column = self.label_column.as_ref().map(|l| LabelColumn {
            name: l.name.clone(),
            values: indices.iter().map(|&i| l.values[i]).collect(),
        });
        Self {
            keys,
            columns,
            label_column,
            key_index,
            column_index: self.column_index.clone(),
        }
    }

    /// Dense row-major matrix over all feature columns, in column order.
    #[must_use]
    pub fn to_matrix(&self) -> Matrix<f32> {
        let n_cols = self.columns.len();
        let mut data = Vec::with_capacity(self.keys.len() * n_cols);
        for row in 0..self.keys.len() {
            data.extend(self.columns.iter().map(|c| c.values[row]));
        }
        Matrix::from_vec(self.keys.len(), n_cols, data)
            .unwrap_or_else(|_| Matrix::zeros(self.keys.len(), n_cols))
    }
}

/// Borrowed view of one row of a [`FeatureMatrix`].
#[derive(Debug, Clone, Copy)]
pub struct FeatureRow<'a> {
    matrix: &'a FeatureMatrix,
    idx: usize,
}

impl<'a> FeatureRow<'a> {
    /// Item key of this row.
    #[must_use]
    pub fn key(&self) -> &'a str {
        &self.matrix.keys[self.idx]
    }

    /// Row position.
    #[must_use]
    pub fn index(&self) -> usize {
        self.idx
    }
}

impl FeatureLookup for FeatureRow<'_> {
    fn feature(&self, name: &str) -> Option<f32> {
        self.matrix
            .column_index
            .get(name)
            .map(|&c| self.matrix.columns[c].values[self.idx])
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
