use arrow::array::Array;
use arrow::compute;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use common::query::AggregateFunction;
use datafusion_common::ScalarValue;

use crate::error::Result;
use crate::physical_plan::expressions::aggregate::accumulator_mismatch;
use crate::physical_plan::expressions::aggregate::numeric_column;
use crate::physical_plan::expressions::aggregate::Accumulator;
use crate::physical_plan::expressions::aggregate::AggregationFunction;

/// Mean of non-null values. Carries sum and count so partial results merge exactly.
#[derive(Debug, Clone)]
pub struct Avg {
    column: String,
}

impl Avg {
    pub fn new(column: String) -> Self {
        Self { column }
    }
}

impl AggregationFunction for Avg {
    fn function_type(&self) -> AggregateFunction {
        AggregateFunction::Avg
    }

    fn column(&self) -> Option<&str> {
        Some(&self.column)
    }

    fn result_type(&self) -> DataType {
        DataType::Float64
    }

    fn create_accumulator(&self) -> Accumulator {
        Accumulator::Avg { sum: 0., count: 0 }
    }

    fn aggregate(&self, acc: &mut Accumulator, block: &RecordBatch) -> Result<()> {
        let arr = numeric_column(block, &self.column)?;
        let block_sum = compute::sum(&arr).unwrap_or_default();
        let block_count = (arr.len() - arr.null_count()) as i64;
        match acc {
            Accumulator::Avg { sum, count } => {
                *sum += block_sum;
                *count += block_count;
            }
            other => return Err(accumulator_mismatch(self.function_type(), other)),
        }

        Ok(())
    }

    fn merge(&self, acc: &mut Accumulator, other: &Accumulator) -> Result<()> {
        match (acc, other) {
            (
                Accumulator::Avg { sum, count },
                Accumulator::Avg {
                    sum: other_sum,
                    count: other_count,
                },
            ) => {
                *sum += other_sum;
                *count += other_count;
            }
            (_, other) => return Err(accumulator_mismatch(self.function_type(), other)),
        }

        Ok(())
    }

    fn evaluate(&self, acc: &Accumulator) -> Result<ScalarValue> {
        match acc {
            Accumulator::Avg { count: 0, .. } => Ok(ScalarValue::Float64(None)),
            Accumulator::Avg { sum, count } => Ok(ScalarValue::Float64(Some(*sum / *count as f64))),
            other => Err(accumulator_mismatch(self.function_type(), other)),
        }
    }
}
