//! Model-backed UDF adapters
//!
//! Glue between [`crate::model`] predictors and the columnar UDF interface:
//! unpack Arrow columns into feature rows, run the model batch, and wrap the
//! predictions back into a Float64 column. The model itself stays opaque.

use super::{NullHandling, ScalarUdf};
use crate::model::{InferencePipeline, MatrixFactorization};
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use std::sync::Arc;

/// Build a scalar UDF around a scaling/encoding/tree pipeline.
///
/// The first `numeric_width` arguments feed the scaler and must be Float64
/// or Int64; the remaining arguments feed the one-hot encoder and must be
/// Utf8, Int64, or Boolean (non-string values encode via their display
/// form). Output is one Float64 prediction per row.
///
/// # Errors
/// Returns error if `numeric_width` exceeds the argument count or any
/// argument type is unsupported for its position.
pub fn pipeline_udf(
    name: impl Into<String>,
    arg_types: Vec<DataType>,
    numeric_width: usize,
    pipeline: Arc<InferencePipeline>,
    null_handling: NullHandling,
) -> Result<ScalarUdf> {
    let name = name.into();
    if numeric_width > arg_types.len() {
        return Err(Error::InvalidInput(format!(
            "UDF '{name}': numeric width {numeric_width} exceeds {} arguments",
            arg_types.len()
        )));
    }
    for dt in &arg_types[..numeric_width] {
        if !matches!(dt, DataType::Float64 | DataType::Int64) {
            return Err(Error::InvalidInput(format!(
                "UDF '{name}': numeric argument type {dt:?} not supported"
            )));
        }
    }
    for dt in &arg_types[numeric_width..] {
        if !matches!(dt, DataType::Utf8 | DataType::Int64 | DataType::Boolean) {
            return Err(Error::InvalidInput(format!(
                "UDF '{name}': categorical argument type {dt:?} not supported"
            )));
        }
    }

    let udf_name = name.clone();
    Ok(ScalarUdf::new(
        name,
        arg_types,
        DataType::Float64,
        null_handling,
        Arc::new(move |args: &[ArrayRef]| {
            let rows = args.first().map_or(0, |a| a.len());

            let numeric_cols: Vec<Vec<f64>> = args[..numeric_width]
                .iter()
                .map(|a| column_to_f64(a, &udf_name))
                .collect::<Result<_>>()?;
            let categorical_cols: Vec<Vec<String>> = args[numeric_width..]
                .iter()
                .map(|a| column_to_strings(a, &udf_name))
                .collect::<Result<_>>()?;

            // Column-major to row-major, the layout the pipeline expects.
            let numeric: Vec<Vec<f64>> = (0..rows)
                .map(|r| numeric_cols.iter().map(|c| c[r]).collect())
                .collect();
            let categorical: Vec<Vec<String>> = (0..rows)
                .map(|r| categorical_cols.iter().map(|c| c[r].clone()).collect())
                .collect();

            let predictions = pipeline.predict_batch(&numeric, &categorical)?;
            Ok(Arc::new(Float64Array::from(predictions)) as ArrayRef)
        }),
    ))
}

/// Build a scalar UDF around a matrix-factorization recommender.
///
/// Signature is `(Int64 user_id, Int64 item_id) -> Float64`; predictions
/// come back in row order.
#[must_use]
pub fn recommender_udf(
    name: impl Into<String>,
    model: Arc<MatrixFactorization>,
    null_handling: NullHandling,
) -> ScalarUdf {
    let name = name.into();
    let udf_name = name.clone();
    ScalarUdf::new(
        name,
        vec![DataType::Int64, DataType::Int64],
        DataType::Float64,
        null_handling,
        Arc::new(move |args: &[ArrayRef]| {
            let users = column_to_i64(&args[0], &udf_name)?;
            let items = column_to_i64(&args[1], &udf_name)?;
            let predictions = model.predict_batch(&users, &items)?;
            Ok(Arc::new(Float64Array::from(predictions)) as ArrayRef)
        }),
    )
}

fn null_reached(udf: &str) -> Error {
    Error::InvalidInput(format!(
        "UDF '{udf}' cannot infer over null values; register with NullHandling::Special"
    ))
}

fn column_to_f64(array: &ArrayRef, udf: &str) -> Result<Vec<f64>> {
    if array.null_count() > 0 {
        return Err(null_reached(udf));
    }
    match array.data_type() {
        DataType::Float64 => {
            let a = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| Error::Other("Failed to downcast to Float64Array".to_string()))?;
            Ok(a.values().to_vec())
        }
        #[allow(clippy::cast_precision_loss)]
        DataType::Int64 => {
            let a = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| Error::Other("Failed to downcast to Int64Array".to_string()))?;
            Ok(a.values().iter().map(|&v| v as f64).collect())
        }
        dt => Err(Error::InvalidInput(format!(
            "UDF '{udf}': cannot read {dt:?} as numeric"
        ))),
    }
}

fn column_to_i64(array: &ArrayRef, udf: &str) -> Result<Vec<i64>> {
    if array.null_count() > 0 {
        return Err(null_reached(udf));
    }
    let a = array
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| Error::Other("Failed to downcast to Int64Array".to_string()))?;
    Ok(a.values().to_vec())
}

fn column_to_strings(array: &ArrayRef, udf: &str) -> Result<Vec<String>> {
    if array.null_count() > 0 {
        return Err(null_reached(udf));
    }
    match array.data_type() {
        DataType::Utf8 => {
            let a = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| Error::Other("Failed to downcast to StringArray".to_string()))?;
            Ok((0..a.len()).map(|i| a.value(i).to_string()).collect())
        }
        DataType::Int64 => {
            let a = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| Error::Other("Failed to downcast to Int64Array".to_string()))?;
            Ok(a.values().iter().map(ToString::to_string).collect())
        }
        DataType::Boolean => {
            let a = array
                .as_any()
                .downcast_ref::<BooleanArray>()
                .ok_or_else(|| Error::Other("Failed to downcast to BooleanArray".to_string()))?;
            Ok((0..a.len()).map(|i| a.value(i).to_string()).collect())
        }
        dt => Err(Error::InvalidInput(format!(
            "UDF '{udf}': cannot read {dt:?} as categorical"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionTree, OneHotEncoder, StandardScaler, TreeNode};
    use arrow::array::Array;
    use std::collections::HashMap;

    fn pipeline() -> Arc<InferencePipeline> {
        let scaler = StandardScaler::new(vec![0.0], vec![1.0]).unwrap();
        let encoder = OneHotEncoder::new(vec![vec!["a".to_string(), "b".to_string()]]);
        let tree = DecisionTree::new(vec![
            TreeNode::Branch {
                feature: 0,
                threshold: 0.0,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: 0.0 },
            TreeNode::Leaf { value: 1.0 },
        ]);
        Arc::new(InferencePipeline::new(scaler, encoder, tree))
    }

    #[test]
    fn test_pipeline_udf_end_to_end() {
        let udf = pipeline_udf(
            "score",
            vec![DataType::Float64, DataType::Utf8],
            1,
            pipeline(),
            NullHandling::Invoke,
        )
        .unwrap();

        let numeric: ArrayRef = Arc::new(Float64Array::from(vec![-1.0, 2.0]));
        let categorical: ArrayRef =
            Arc::new(StringArray::from(vec!["a".to_string(), "b".to_string()]));

        let result = udf.invoke_batch(&[numeric, categorical]).unwrap();
        let result = result.as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(result.values().to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_pipeline_udf_rejects_bad_width() {
        let result = pipeline_udf(
            "score",
            vec![DataType::Float64],
            2,
            pipeline(),
            NullHandling::Invoke,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pipeline_udf_special_nulls() {
        let udf = pipeline_udf(
            "score",
            vec![DataType::Float64, DataType::Utf8],
            1,
            pipeline(),
            NullHandling::Special,
        )
        .unwrap();

        let numeric: ArrayRef = Arc::new(Float64Array::from(vec![Some(-1.0), None, Some(2.0)]));
        let categorical: ArrayRef = Arc::new(StringArray::from(vec![
            Some("a".to_string()),
            Some("a".to_string()),
            Some("b".to_string()),
        ]));

        let result = udf.invoke_batch(&[numeric, categorical]).unwrap();
        let result = result.as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(result.value(0), 0.0);
        assert!(result.is_null(1));
        assert_eq!(result.value(2), 1.0);
    }

    #[test]
    fn test_recommender_udf_end_to_end() {
        let mut user_bias = HashMap::new();
        user_bias.insert(1, 1.0);
        let model = MatrixFactorization::new(
            3.0,
            user_bias,
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
            (1.0, 5.0),
        )
        .unwrap();

        let udf = recommender_udf("rate", Arc::new(model), NullHandling::Special);
        let users: ArrayRef = Arc::new(Int64Array::from(vec![1, 2]));
        let items: ArrayRef = Arc::new(Int64Array::from(vec![7, 7]));

        let result = udf.invoke_batch(&[users, items]).unwrap();
        let result = result.as_any().downcast_ref::<Float64Array>().unwrap();
        assert!((result.value(0) - 4.0).abs() < 1e-9);
        assert!((result.value(1) - 3.0).abs() < 1e-9);
    }
}
