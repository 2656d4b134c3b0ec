//! Collaborative-filtering recommender (matrix factorization)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// SVD-style matrix factorization model.
///
/// Prediction for a (user, item) pair is the biased dot product
/// `mu + b_u + b_i + p_u . q_i`, clipped to the rating range. Ids unseen
/// during training contribute nothing to the missing terms, so a fully
/// unknown pair falls back to the global mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixFactorization {
    global_mean: f64,
    user_bias: HashMap<i64, f64>,
    item_bias: HashMap<i64, f64>,
    user_factors: HashMap<i64, Vec<f64>>,
    item_factors: HashMap<i64, Vec<f64>>,
    rating_range: (f64, f64),
}

impl MatrixFactorization {
    /// Assemble a model from fitted parameters.
    ///
    /// # Errors
    /// Returns error if factor vectors disagree on rank or the rating range
    /// is inverted.
    pub fn new(
        global_mean: f64,
        user_bias: HashMap<i64, f64>,
        item_bias: HashMap<i64, f64>,
        user_factors: HashMap<i64, Vec<f64>>,
        item_factors: HashMap<i64, Vec<f64>>,
        rating_range: (f64, f64),
    ) -> Result<Self> {
        let model = Self {
            global_mean,
            user_bias,
            item_bias,
            user_factors,
            item_factors,
            rating_range,
        };
        model.validate()?;
        Ok(model)
    }

    /// Load a fitted model from a JSON file.
    ///
    /// # Errors
    /// Returns error if the file is missing, malformed, or internally
    /// inconsistent.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let model: Self = super::load_json(path)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let (lo, hi) = self.rating_range;
        if lo > hi {
            return Err(Error::Model(format!(
                "Inverted rating range: {lo} > {hi}"
            )));
        }

        let rank = self
            .user_factors
            .values()
            .chain(self.item_factors.values())
            .map(Vec::len)
            .next();
        if let Some(rank) = rank {
            let consistent = self
                .user_factors
                .values()
                .chain(self.item_factors.values())
                .all(|v| v.len() == rank);
            if !consistent {
                return Err(Error::Model(
                    "Factor vectors disagree on latent rank".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Bounds predictions are clipped to.
    #[must_use]
    pub const fn rating_range(&self) -> (f64, f64) {
        self.rating_range
    }

    /// Predict the rating for one (user, item) pair.
    #[must_use]
    pub fn predict(&self, user_id: i64, item_id: i64) -> f64 {
        let mut est = self.global_mean;
        est += self.user_bias.get(&user_id).copied().unwrap_or(0.0);
        est += self.item_bias.get(&item_id).copied().unwrap_or(0.0);

        if let (Some(pu), Some(qi)) = (
            self.user_factors.get(&user_id),
            self.item_factors.get(&item_id),
        ) {
            est += pu.iter().zip(qi).map(|(p, q)| p * q).sum::<f64>();
        }

        let (lo, hi) = self.rating_range;
        est.clamp(lo, hi)
    }

    /// Predict for a batch of pairs, one rating per pair, in input order.
    ///
    /// # Errors
    /// Returns error if the two id slices differ in length.
    pub fn predict_batch(&self, user_ids: &[i64], item_ids: &[i64]) -> Result<Vec<f64>> {
        if user_ids.len() != item_ids.len() {
            return Err(Error::Model(format!(
                "Got {} user ids but {} item ids",
                user_ids.len(),
                item_ids.len()
            )));
        }

        Ok(user_ids
            .iter()
            .zip(item_ids)
            .map(|(&u, &i)| self.predict(u, i))
            .collect())
    }
}
