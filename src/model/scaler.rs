//! Per-feature standardization

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Standard scaler: `(x - mean) / std` per feature.
///
/// Features with zero standard deviation are shifted but not scaled
/// (scale falls back to 1), so constant columns stay finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Create a scaler from fitted means and standard deviations.
    ///
    /// # Errors
    /// Returns error if the two vectors differ in length.
    pub fn new(means: Vec<f64>, stds: Vec<f64>) -> Result<Self> {
        if means.len() != stds.len() {
            return Err(Error::Model(format!(
                "Scaler has {} means but {} stds",
                means.len(),
                stds.len()
            )));
        }
        Ok(Self { means, stds })
    }

    /// Load a fitted scaler from a JSON file.
    ///
    /// # Errors
    /// Returns error if the file is missing or malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let scaler: Self = super::load_json(path)?;
        Self::new(scaler.means, scaler.stds)
    }

    /// Number of features the scaler was fitted on.
    #[must_use]
    pub fn width(&self) -> usize {
        self.means.len()
    }

    /// Standardize one feature row.
    ///
    /// # Errors
    /// Returns error if the row width differs from the fitted width.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.width() {
            return Err(Error::Model(format!(
                "Scaler fitted on {} features, row has {}",
                self.width(),
                row.len()
            )));
        }

        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(&x, (&mean, &std))| {
                let scale = if std == 0.0 { 1.0 } else { std };
                (x - mean) / scale
            })
            .collect())
    }

    /// Standardize a batch of rows.
    ///
    /// # Errors
    /// Returns error on the first row of mismatched width.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}
