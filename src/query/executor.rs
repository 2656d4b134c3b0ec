//! Query execution engine
//!
//! Executes parsed query plans against Arrow storage. UDF projections are
//! bound and signature-checked up front, before any filtering or invocation
//! work, so a mis-declared call fails ahead of anything a benchmark would
//! time.

use super::{Predicate, Projection, QueryPlan};
use crate::storage::StorageEngine;
use crate::udf::{ScalarUdf, UdfRegistry};
use crate::{Error, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    PrimitiveArray, RecordBatch, StringArray, UInt32Array,
};
use arrow::compute;
use arrow::datatypes::{ArrowPrimitiveType, DataType, Field, Schema, SchemaRef};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

/// Executor for parsed query plans
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryExecutor;

/// A UDF projection resolved against actual columns, validated and ready to
/// invoke.
struct BoundCall<'a> {
    udf: &'a Arc<ScalarUdf>,
    args: Vec<ArrayRef>,
    output_name: String,
}

impl QueryExecutor {
    /// Create a new query executor
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Execute a query plan against storage
    ///
    /// # Arguments
    /// * `plan` - Parsed query plan from `QueryEngine::parse()`
    /// * `storage` - Storage engine containing the table's data
    /// * `registry` - Registered scalar functions
    ///
    /// # Errors
    /// Returns error if:
    /// - Column not found in schema
    /// - A projected function is not registered
    /// - A registered function's signature does not match the columns
    /// - Filter literal cannot be coerced to the column type
    pub fn execute(
        &self,
        plan: &QueryPlan,
        storage: &StorageEngine,
        registry: &UdfRegistry,
    ) -> Result<RecordBatch> {
        let batches = storage.batches();
        if batches.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Table '{}' has no data",
                plan.table
            )));
        }

        let combined = Self::combine_batches(batches)?;

        let mut result = combined;
        for predicate in &plan.filters {
            result = Self::apply_filter(&result, predicate)?;
        }

        if !plan.group_by.is_empty() {
            result = Self::deduplicate(&result, &plan.group_by)?;
        }

        let result = Self::apply_projections(&result, &plan.projections, registry)?;

        if let Some(limit) = plan.limit {
            return Ok(result.slice(0, limit.min(result.num_rows())));
        }

        Ok(result)
    }

    /// Combine multiple batches into single batch
    fn combine_batches(batches: &[RecordBatch]) -> Result<RecordBatch> {
        if batches.len() == 1 {
            return Ok(batches[0].clone());
        }

        compute::concat_batches(&batches[0].schema(), batches)
            .map_err(|e| Error::Storage(format!("Failed to combine batches: {e}")))
    }

    fn column_index(schema: &SchemaRef, name: &str) -> Result<usize> {
        schema
            .fields()
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| Error::InvalidInput(format!("Column not found: {name}")))
    }

    /// Apply one WHERE predicate
    fn apply_filter(batch: &RecordBatch, predicate: &Predicate) -> Result<RecordBatch> {
        let schema = batch.schema();
        let column_index = Self::column_index(&schema, &predicate.column)?;
        let column = batch.column(column_index);

        let mask = match column.data_type() {
            DataType::Int32 => Self::primitive_mask::<arrow::datatypes::Int32Type>(
                downcast::<Int32Array>(column, "Int32Array")?,
                predicate,
            )?,
            DataType::Int64 => Self::primitive_mask::<arrow::datatypes::Int64Type>(
                downcast::<Int64Array>(column, "Int64Array")?,
                predicate,
            )?,
            DataType::Float32 => Self::primitive_mask::<arrow::datatypes::Float32Type>(
                downcast::<Float32Array>(column, "Float32Array")?,
                predicate,
            )?,
            DataType::Float64 => Self::primitive_mask::<arrow::datatypes::Float64Type>(
                downcast::<Float64Array>(column, "Float64Array")?,
                predicate,
            )?,
            DataType::Utf8 => {
                let array = downcast::<StringArray>(column, "StringArray")?;
                Self::string_mask(array, predicate)
            }
            DataType::Boolean => {
                let array = downcast::<BooleanArray>(column, "BooleanArray")?;
                let value: bool = predicate.value.parse().map_err(|_| {
                    Error::Parse(format!("Invalid Boolean literal: {}", predicate.value))
                })?;
                let values: Vec<bool> = array
                    .iter()
                    .map(|v| v.is_some_and(|x| predicate.op.eval(&x, &value)))
                    .collect();
                BooleanArray::from(values)
            }
            dt => {
                return Err(Error::InvalidInput(format!(
                    "Filter not supported for data type: {dt:?}"
                )))
            }
        };

        compute::filter_record_batch(batch, &mask)
            .map_err(|e| Error::Storage(format!("Failed to apply filter: {e}")))
    }

    /// Build a comparison mask for any primitive column type. Null rows
    /// never match.
    fn primitive_mask<T>(array: &PrimitiveArray<T>, predicate: &Predicate) -> Result<BooleanArray>
    where
        T: ArrowPrimitiveType,
        T::Native: PartialOrd + FromStr,
    {
        let value: T::Native = predicate.value.parse().map_err(|_| {
            Error::Parse(format!(
                "Invalid {:?} literal: {}",
                array.data_type(),
                predicate.value
            ))
        })?;

        let values: Vec<bool> = array
            .iter()
            .map(|v| v.is_some_and(|x| predicate.op.eval(&x, &value)))
            .collect();
        Ok(BooleanArray::from(values))
    }

    fn string_mask(array: &StringArray, predicate: &Predicate) -> BooleanArray {
        let value = predicate.value.as_str();
        let values: Vec<bool> = array
            .iter()
            .map(|v| v.is_some_and(|x| predicate.op.eval(&x, &value)))
            .collect();
        BooleanArray::from(values)
    }

    /// GROUP BY over bare columns: keep the first row of each distinct key.
    fn deduplicate(batch: &RecordBatch, keys: &[String]) -> Result<RecordBatch> {
        let schema = batch.schema();
        let key_indices: Vec<usize> = keys
            .iter()
            .map(|k| Self::column_index(&schema, k))
            .collect::<Result<_>>()?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut keep: Vec<u32> = Vec::new();

        for row in 0..batch.num_rows() {
            let mut key = String::new();
            for &col in &key_indices {
                key.push_str(&Self::format_value(batch.column(col), row)?);
                key.push('\u{1f}');
            }
            if seen.insert(key) {
                keep.push(u32::try_from(row).map_err(|_| {
                    Error::InvalidInput("Batch exceeds u32 row indexing".to_string())
                })?);
            }
        }

        let indices = UInt32Array::from(keep);
        let columns: Vec<ArrayRef> = batch
            .columns()
            .iter()
            .map(|c| compute::take(c, &indices, None).map_err(Error::from))
            .collect::<Result<_>>()?;

        RecordBatch::try_new(schema, columns)
            .map_err(|e| Error::Storage(format!("Failed to deduplicate batch: {e}")))
    }

    /// Render one cell for deduplication keying.
    fn format_value(column: &ArrayRef, row: usize) -> Result<String> {
        if column.is_null(row) {
            return Ok("<null>".to_string());
        }
        match column.data_type() {
            DataType::Int32 => Ok(downcast::<Int32Array>(column, "Int32Array")?
                .value(row)
                .to_string()),
            DataType::Int64 => Ok(downcast::<Int64Array>(column, "Int64Array")?
                .value(row)
                .to_string()),
            DataType::Float32 => Ok(downcast::<Float32Array>(column, "Float32Array")?
                .value(row)
                .to_string()),
            DataType::Float64 => Ok(downcast::<Float64Array>(column, "Float64Array")?
                .value(row)
                .to_string()),
            DataType::Utf8 => Ok(downcast::<StringArray>(column, "StringArray")?
                .value(row)
                .to_string()),
            DataType::Boolean => Ok(downcast::<BooleanArray>(column, "BooleanArray")?
                .value(row)
                .to_string()),
            dt => Err(Error::InvalidInput(format!(
                "GROUP BY not supported for data type: {dt:?}"
            ))),
        }
    }

    /// Evaluate the SELECT list. All UDF projections are bound and
    /// signature-validated before the first one is invoked.
    fn apply_projections(
        batch: &RecordBatch,
        projections: &[Projection],
        registry: &UdfRegistry,
    ) -> Result<RecordBatch> {
        if projections.len() == 1 {
            if let Projection::Column { name, .. } = &projections[0] {
                if name == "*" {
                    return Ok(batch.clone());
                }
            }
        }

        let schema = batch.schema();

        // Bind phase: resolve names, gather columns, validate signatures.
        let mut bound: Vec<Option<BoundCall<'_>>> = Vec::with_capacity(projections.len());
        for projection in projections {
            match projection {
                Projection::Column { .. } => bound.push(None),
                Projection::FunctionCall { name, args, alias } => {
                    let udf = registry
                        .get(name)
                        .ok_or_else(|| Error::UnknownFunction(name.clone()))?;
                    let arg_arrays: Vec<ArrayRef> = args
                        .iter()
                        .map(|a| {
                            Self::column_index(&schema, a).map(|i| batch.column(i).clone())
                        })
                        .collect::<Result<_>>()?;
                    udf.validate_args(&arg_arrays)?;

                    bound.push(Some(BoundCall {
                        udf,
                        args: arg_arrays,
                        output_name: alias.clone().unwrap_or_else(|| name.clone()),
                    }));
                }
            }
        }

        // Invoke phase.
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(projections.len());
        let mut fields: Vec<Field> = Vec::with_capacity(projections.len());

        for (projection, call) in projections.iter().zip(bound) {
            match (projection, call) {
                (Projection::Column { name, alias }, None) => {
                    let index = Self::column_index(&schema, name)?;
                    columns.push(batch.column(index).clone());
                    let field = schema.field(index);
                    fields.push(match alias {
                        Some(alias) => {
                            Field::new(alias.as_str(), field.data_type().clone(), field.is_nullable())
                        }
                        None => field.clone(),
                    });
                }
                (Projection::FunctionCall { .. }, Some(call)) => {
                    let output = call.udf.invoke_batch(&call.args)?;
                    fields.push(Field::new(
                        call.output_name.as_str(),
                        call.udf.return_type().clone(),
                        true,
                    ));
                    columns.push(output);
                }
                _ => unreachable!("bind phase mirrors the projection list"),
            }
        }

        let result_schema = Arc::new(Schema::new(fields));
        RecordBatch::try_new(result_schema, columns)
            .map_err(|e| Error::Storage(format!("Failed to build result batch: {e}")))
    }
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, label: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Other(format!("Failed to downcast to {label}")))
}
