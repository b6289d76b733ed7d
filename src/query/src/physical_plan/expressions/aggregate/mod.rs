use std::fmt::Debug;
use std::sync::Arc;

use arrow::array::Array;
use arrow::array::ArrayRef;
use arrow::array::AsArray;
use arrow::array::Float64Array;
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::datatypes::Float64Type;
use arrow::record_batch::RecordBatch;
use common::query::AggregateFunction;
use datafusion_common::ScalarValue;
use fnv::FnvHashSet;
use storage::star_tree::MetricPair;
use storage::star_tree::PartialAggregate;

use crate::error::QueryError;
use crate::error::Result;

pub mod avg;
pub mod count;
pub mod distinct_count;
pub mod min_max;
pub mod sum;

/// Intermediate state of one aggregation function over the blocks seen so far.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count(i64),
    Sum(f64),
    Min(Option<f64>),
    Max(Option<f64>),
    Avg { sum: f64, count: i64 },
    DistinctCount(FnvHashSet<ScalarValue>),
}

impl From<&PartialAggregate> for Accumulator {
    fn from(partial: &PartialAggregate) -> Self {
        match partial {
            PartialAggregate::Count(v) => Accumulator::Count(*v),
            PartialAggregate::Sum(v) => Accumulator::Sum(*v),
            PartialAggregate::Min(v) => Accumulator::Min(*v),
            PartialAggregate::Max(v) => Accumulator::Max(*v),
            PartialAggregate::Avg { sum, count } => Accumulator::Avg {
                sum: *sum,
                count: *count,
            },
        }
    }
}

/// Aggregation over a single optional column.
///
/// Functions are stateless; all state lives in the [Accumulator] they create, so one function
/// instance can be shared between operators.
pub trait AggregationFunction: Send + Sync + Debug {
    fn function_type(&self) -> AggregateFunction;
    /// Input column, `None` for `count(*)`.
    fn column(&self) -> Option<&str>;
    fn result_type(&self) -> DataType;
    fn create_accumulator(&self) -> Accumulator;
    /// Folds every row of the block into the accumulator.
    fn aggregate(&self, acc: &mut Accumulator, block: &RecordBatch) -> Result<()>;
    fn merge(&self, acc: &mut Accumulator, other: &Accumulator) -> Result<()>;
    fn evaluate(&self, acc: &Accumulator) -> Result<ScalarValue>;

    /// Star-tree metric holding this function's precomputed partial, `None` when the function
    /// can't be answered from pre-aggregates.
    fn star_tree_metric(&self) -> Option<MetricPair> {
        Some(MetricPair::new(
            self.function_type(),
            self.column().map(str::to_string),
        ))
    }

    fn to_explain_string(&self) -> String {
        format!(
            "{}({})",
            self.function_type().name(),
            self.column().unwrap_or("*")
        )
    }
}

pub fn create_aggregation_function(
    function: AggregateFunction,
    column: Option<String>,
) -> Result<Arc<dyn AggregationFunction>> {
    let required = |column: Option<String>| {
        column.ok_or_else(|| QueryError::Plan(format!("{} requires a column", function.name())))
    };

    let f: Arc<dyn AggregationFunction> = match function {
        AggregateFunction::Count => Arc::new(count::Count::new(column)),
        AggregateFunction::Sum => Arc::new(sum::Sum::new(required(column)?)),
        AggregateFunction::Min => Arc::new(min_max::MinMax::new_min(required(column)?)),
        AggregateFunction::Max => Arc::new(min_max::MinMax::new_max(required(column)?)),
        AggregateFunction::Avg => Arc::new(avg::Avg::new(required(column)?)),
        AggregateFunction::DistinctCount => {
            Arc::new(distinct_count::DistinctCount::new(required(column)?))
        }
    };

    Ok(f)
}

fn input_column<'a>(block: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    block
        .column_by_name(name)
        .ok_or_else(|| QueryError::Execution(format!("column {name:?} is not in the block")))
}

/// Input column as Float64. Only numeric columns are accepted.
fn numeric_column(block: &RecordBatch, name: &str) -> Result<Float64Array> {
    let arr = input_column(block, name)?;
    if !arr.data_type().is_numeric() {
        return Err(QueryError::Execution(format!(
            "column {name:?} must be numeric, got {}",
            arr.data_type()
        )));
    }

    Ok(cast(arr, &DataType::Float64)?
        .as_primitive::<Float64Type>()
        .clone())
}

fn accumulator_mismatch(function: AggregateFunction, acc: &Accumulator) -> QueryError {
    QueryError::Internal(format!(
        "{} can't use accumulator {acc:?}",
        function.name()
    ))
}
