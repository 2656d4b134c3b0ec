//! Opaque predictive models
//!
//! Models are deserialized once from JSON files at process start and treated
//! as immutable for the process lifetime; prediction takes `&self`. The query
//! layer never looks inside a model, it only marshals columns in and
//! predictions out through [`crate::udf`] adapters.
//!
//! Two model families cover the inference benchmarks:
//! - [`InferencePipeline`]: feature scaling + one-hot encoding + decision
//!   tree over mixed numeric/categorical rows.
//! - [`MatrixFactorization`]: SVD-style collaborative filtering over
//!   (user, item) id pairs.

mod encoder;
mod factorization;
mod pipeline;
mod scaler;
mod tree;

pub use encoder::OneHotEncoder;
pub use factorization::MatrixFactorization;
pub use pipeline::InferencePipeline;
pub use scaler::StandardScaler;
pub use tree::{DecisionTree, TreeNode};

use crate::Result;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Deserialize a model from a JSON file.
pub(crate) fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}
