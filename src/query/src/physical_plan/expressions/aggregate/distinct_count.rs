use arrow::array::Array;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use common::query::AggregateFunction;
use datafusion_common::ScalarValue;
use fnv::FnvHashSet;
use storage::star_tree::MetricPair;

use crate::error::Result;
use crate::physical_plan::expressions::aggregate::accumulator_mismatch;
use crate::physical_plan::expressions::aggregate::input_column;
use crate::physical_plan::expressions::aggregate::Accumulator;
use crate::physical_plan::expressions::aggregate::AggregationFunction;

/// Exact number of distinct non-null values. Works on any column type.
#[derive(Debug, Clone)]
pub struct DistinctCount {
    column: String,
}

impl DistinctCount {
    pub fn new(column: String) -> Self {
        Self { column }
    }
}

impl AggregationFunction for DistinctCount {
    fn function_type(&self) -> AggregateFunction {
        AggregateFunction::DistinctCount
    }

    fn column(&self) -> Option<&str> {
        Some(&self.column)
    }

    fn result_type(&self) -> DataType {
        DataType::Int64
    }

    fn create_accumulator(&self) -> Accumulator {
        Accumulator::DistinctCount(FnvHashSet::default())
    }

    fn aggregate(&self, acc: &mut Accumulator, block: &RecordBatch) -> Result<()> {
        let arr = input_column(block, &self.column)?;
        let values = match acc {
            Accumulator::DistinctCount(values) => values,
            other => return Err(accumulator_mismatch(self.function_type(), other)),
        };

        for idx in 0..arr.len() {
            if arr.is_valid(idx) {
                values.insert(ScalarValue::try_from_array(arr, idx)?);
            }
        }

        Ok(())
    }

    fn merge(&self, acc: &mut Accumulator, other: &Accumulator) -> Result<()> {
        match (acc, other) {
            (Accumulator::DistinctCount(values), Accumulator::DistinctCount(other)) => {
                values.extend(other.iter().cloned())
            }
            (_, other) => return Err(accumulator_mismatch(self.function_type(), other)),
        }

        Ok(())
    }

    fn evaluate(&self, acc: &Accumulator) -> Result<ScalarValue> {
        match acc {
            Accumulator::DistinctCount(values) => Ok(ScalarValue::Int64(Some(values.len() as i64))),
            other => Err(accumulator_mismatch(self.function_type(), other)),
        }
    }

    // set of values can't be rebuilt from pre-aggregated counts
    fn star_tree_metric(&self) -> Option<MetricPair> {
        None
    }
}
