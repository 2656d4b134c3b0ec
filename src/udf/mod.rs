//! Registered scalar functions
//!
//! A [`ScalarUdf`] is a columnar function the query executor can invoke in a
//! SELECT projection: it declares per-argument element types and an output
//! type, and receives equal-length Arrow arrays in one batch call rather than
//! one call per row. Registration is process-lifetime; a function registered
//! before a benchmark run never changes underneath it.
//!
//! Null handling is configurable. Under [`NullHandling::Special`] the engine
//! compacts away rows with any null argument, invokes the function on the
//! survivors, and scatters the results back with nulls in the skipped slots.
//! The function body can then assume fully valid inputs.

mod infer;

pub use infer::{pipeline_udf, recommender_udf};

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute;
use arrow::datatypes::DataType;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Batch function over equal-length columnar arguments.
pub type UdfFunc = Arc<dyn Fn(&[ArrayRef]) -> Result<ArrayRef> + Send + Sync>;

/// Policy for rows containing null arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullHandling {
    /// Pass nulls through; the function sees them and decides.
    #[default]
    Invoke,
    /// Engine skips null-containing rows and emits null for them.
    Special,
}

/// A scalar user-defined function with a declared columnar signature.
#[derive(Clone)]
pub struct ScalarUdf {
    name: String,
    arg_types: Vec<DataType>,
    return_type: DataType,
    null_handling: NullHandling,
    func: UdfFunc,
}

impl std::fmt::Debug for ScalarUdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarUdf")
            .field("name", &self.name)
            .field("arg_types", &self.arg_types)
            .field("return_type", &self.return_type)
            .field("null_handling", &self.null_handling)
            .finish_non_exhaustive()
    }
}

impl ScalarUdf {
    /// Create a scalar UDF.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        arg_types: Vec<DataType>,
        return_type: DataType,
        null_handling: NullHandling,
        func: UdfFunc,
    ) -> Self {
        Self {
            name: name.into(),
            arg_types,
            return_type,
            null_handling,
            func,
        }
    }

    /// Function name as referenced from SQL.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared argument element types.
    #[must_use]
    pub fn arg_types(&self) -> &[DataType] {
        &self.arg_types
    }

    /// Declared output element type.
    #[must_use]
    pub const fn return_type(&self) -> &DataType {
        &self.return_type
    }

    /// Null-handling policy.
    #[must_use]
    pub const fn null_handling(&self) -> NullHandling {
        self.null_handling
    }

    /// Human-readable signature, used in mismatch errors.
    #[must_use]
    pub fn signature(&self) -> String {
        let args: Vec<String> = self.arg_types.iter().map(|t| format!("{t:?}")).collect();
        format!("({}) -> {:?}", args.join(", "), self.return_type)
    }

    /// Validate the supplied columns against the declared signature.
    ///
    /// Checked when the query plan is bound, before any per-row work and
    /// before the benchmark harness records a single duration.
    ///
    /// # Errors
    /// Returns [`Error::SignatureMismatch`] on arity or element-type
    /// mismatch, [`Error::InvalidInput`] on unequal column lengths.
    pub fn validate_args(&self, args: &[ArrayRef]) -> Result<()> {
        if args.len() != self.arg_types.len() {
            return Err(Error::SignatureMismatch {
                udf: self.name.clone(),
                expected: self.signature(),
                actual: format!("{} argument(s)", args.len()),
            });
        }

        for (i, (arg, expected)) in args.iter().zip(&self.arg_types).enumerate() {
            if arg.data_type() != expected {
                return Err(Error::SignatureMismatch {
                    udf: self.name.clone(),
                    expected: self.signature(),
                    actual: format!("{:?} at argument {i}", arg.data_type()),
                });
            }
        }

        if let Some(first) = args.first() {
            let rows = first.len();
            if args.iter().any(|a| a.len() != rows) {
                return Err(Error::InvalidInput(format!(
                    "UDF '{}' received columns of unequal length",
                    self.name
                )));
            }
        }

        Ok(())
    }

    /// Invoke the function over one batch of columns, applying the null
    /// policy, and check the output against the declared contract.
    ///
    /// # Errors
    /// Signature errors as in [`validate_args`](Self::validate_args); also
    /// fails if the function returns the wrong output length or type, or
    /// fails itself.
    pub fn invoke_batch(&self, args: &[ArrayRef]) -> Result<ArrayRef> {
        self.validate_args(args)?;

        let rows = args.first().map_or(0, |a| a.len());
        let has_nulls = args.iter().any(|a| a.null_count() > 0);

        let result = if self.null_handling == NullHandling::Special && has_nulls {
            let valid = self.valid_mask(args)?;
            let compacted: Vec<ArrayRef> = args
                .iter()
                .map(|a| compute::filter(a, &valid).map_err(Error::from))
                .collect::<Result<_>>()?;
            let compact_result = (self.func)(&compacted)?;
            self.check_output(&compact_result, compacted.first().map_or(0, |a| a.len()))?;
            self.scatter(&compact_result, &valid)?
        } else {
            let result = (self.func)(args)?;
            self.check_output(&result, rows)?;
            result
        };

        Ok(result)
    }

    /// Rows where every argument is non-null.
    fn valid_mask(&self, args: &[ArrayRef]) -> Result<BooleanArray> {
        let mut any_null = compute::is_null(args[0].as_ref())?;
        for arg in &args[1..] {
            any_null = compute::or(&any_null, &compute::is_null(arg.as_ref())?)?;
        }
        Ok(compute::not(&any_null)?)
    }

    fn check_output(&self, result: &ArrayRef, expected_rows: usize) -> Result<()> {
        if result.len() != expected_rows {
            return Err(Error::InvalidInput(format!(
                "UDF '{}' returned {} rows for {} input rows",
                self.name,
                result.len(),
                expected_rows
            )));
        }
        if result.data_type() != &self.return_type {
            return Err(Error::InvalidInput(format!(
                "UDF '{}' returned {:?}, declared {:?}",
                self.name,
                result.data_type(),
                self.return_type
            )));
        }
        Ok(())
    }

    /// Expand a compacted result back to full length, null where skipped.
    fn scatter(&self, compact: &ArrayRef, valid: &BooleanArray) -> Result<ArrayRef> {
        match self.return_type {
            DataType::Float64 => {
                let values = downcast::<Float64Array>(compact, "Float64Array")?;
                let mut taken = 0;
                let out: Float64Array = (0..valid.len())
                    .map(|i| {
                        if valid.value(i) {
                            let v = values.value(taken);
                            taken += 1;
                            Some(v)
                        } else {
                            None
                        }
                    })
                    .collect();
                Ok(Arc::new(out))
            }
            DataType::Int64 => {
                let values = downcast::<Int64Array>(compact, "Int64Array")?;
                let mut taken = 0;
                let out: Int64Array = (0..valid.len())
                    .map(|i| {
                        if valid.value(i) {
                            let v = values.value(taken);
                            taken += 1;
                            Some(v)
                        } else {
                            None
                        }
                    })
                    .collect();
                Ok(Arc::new(out))
            }
            DataType::Utf8 => {
                let values = downcast::<StringArray>(compact, "StringArray")?;
                let mut taken = 0;
                let out: StringArray = (0..valid.len())
                    .map(|i| {
                        if valid.value(i) {
                            let v = values.value(taken);
                            taken += 1;
                            Some(v.to_string())
                        } else {
                            None
                        }
                    })
                    .collect();
                Ok(Arc::new(out))
            }
            DataType::Boolean => {
                let values = downcast::<BooleanArray>(compact, "BooleanArray")?;
                let mut taken = 0;
                let out: BooleanArray = (0..valid.len())
                    .map(|i| {
                        if valid.value(i) {
                            let v = values.value(taken);
                            taken += 1;
                            Some(v)
                        } else {
                            None
                        }
                    })
                    .collect();
                Ok(Arc::new(out))
            }
            ref dt => Err(Error::InvalidInput(format!(
                "Null scatter not supported for output type {dt:?}"
            ))),
        }
    }
}

/// Downcast helper shared by the scatter paths.
fn downcast<'a, T: 'static>(array: &'a ArrayRef, label: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Other(format!("Failed to downcast to {label}")))
}

/// Name → function registry owned by the database.
#[derive(Default)]
pub struct UdfRegistry {
    udfs: HashMap<String, Arc<ScalarUdf>>,
}

impl UdfRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function; re-registering a name replaces it.
    pub fn register(&mut self, udf: ScalarUdf) {
        debug!(name = udf.name(), signature = %udf.signature(), "UDF registered");
        self.udfs.insert(udf.name().to_string(), Arc::new(udf));
    }

    /// Look up a function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<ScalarUdf>> {
        self.udfs.get(name)
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.udfs.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.udfs.is_empty()
    }
}
