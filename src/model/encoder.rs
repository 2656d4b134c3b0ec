//! One-hot encoding of categorical features

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One-hot encoder: each categorical column expands to one 0/1 slot per
/// fitted category. A value not seen during fitting encodes as all zeros
/// rather than failing, matching an "ignore unknown" policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    /// Create an encoder from per-column category dictionaries.
    #[must_use]
    pub fn new(categories: Vec<Vec<String>>) -> Self {
        Self { categories }
    }

    /// Load a fitted encoder from a JSON file.
    ///
    /// # Errors
    /// Returns error if the file is missing or malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        super::load_json(path)
    }

    /// Number of categorical input columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.categories.len()
    }

    /// Total width of the encoded output (sum of category counts).
    #[must_use]
    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Encode one row of categorical values.
    ///
    /// # Errors
    /// Returns error if the row width differs from the fitted column count.
    pub fn transform_row(&self, row: &[String]) -> Result<Vec<f64>> {
        if row.len() != self.num_columns() {
            return Err(Error::Model(format!(
                "Encoder fitted on {} columns, row has {}",
                self.num_columns(),
                row.len()
            )));
        }

        let mut out = Vec::with_capacity(self.width());
        for (value, cats) in row.iter().zip(&self.categories) {
            let hit = cats.iter().position(|c| c == value);
            for i in 0..cats.len() {
                out.push(if hit == Some(i) { 1.0 } else { 0.0 });
            }
        }
        Ok(out)
    }

    /// Encode a batch of rows.
    ///
    /// # Errors
    /// Returns error on the first row of mismatched width.
    pub fn transform(&self, rows: &[Vec<String>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}
