//! Decision tree inference

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One node of a fitted binary decision tree, stored flat by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Internal split: `feature <= threshold` descends left, else right.
    Branch {
        /// Index into the feature vector
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Node index of the left child
        left: usize,
        /// Node index of the right child
        right: usize,
    },
    /// Terminal node carrying the prediction.
    Leaf {
        /// Predicted value
        value: f64,
    },
}

/// A fitted binary decision tree. Prediction walks from node 0 to a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Create a tree from flat node storage; node 0 is the root.
    #[must_use]
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Load a fitted tree from a JSON file.
    ///
    /// # Errors
    /// Returns error if the file is missing or malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        super::load_json(path)
    }

    /// Number of nodes.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Predict for one feature vector.
    ///
    /// # Errors
    /// Returns error for an empty tree, a feature index beyond the vector,
    /// a child index beyond the node storage, or a cycle (more steps than
    /// nodes without reaching a leaf).
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if self.nodes.is_empty() {
            return Err(Error::Model("Decision tree has no nodes".to_string()));
        }

        let mut index = 0;
        // A well-formed tree reaches a leaf in at most num_nodes steps.
        for _ in 0..=self.nodes.len() {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Branch {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features.get(*feature).ok_or_else(|| {
                        Error::Model(format!(
                            "Tree node {index} splits on feature {feature}, row has {}",
                            features.len()
                        ))
                    })?;
                    let child = if *x <= *threshold { *left } else { *right };
                    if child >= self.nodes.len() {
                        return Err(Error::Model(format!(
                            "Tree node {index} points at missing child {child}"
                        )));
                    }
                    index = child;
                }
            }
        }

        Err(Error::Model(
            "Decision tree walk did not terminate (cycle in node indices)".to_string(),
        ))
    }

    /// Predict for a batch of feature vectors.
    ///
    /// # Errors
    /// Returns error on the first malformed row.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}
