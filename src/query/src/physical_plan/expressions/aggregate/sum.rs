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

/// Sum of non-null values as Float64. Zero over empty input.
#[derive(Debug, Clone)]
pub struct Sum {
    column: String,
}

impl Sum {
    pub fn new(column: String) -> Self {
        Self { column }
    }
}

impl AggregationFunction for Sum {
    fn function_type(&self) -> AggregateFunction {
        AggregateFunction::Sum
    }

    fn column(&self) -> Option<&str> {
        Some(&self.column)
    }

    fn result_type(&self) -> DataType {
        DataType::Float64
    }

    fn create_accumulator(&self) -> Accumulator {
        Accumulator::Sum(0.)
    }

    fn aggregate(&self, acc: &mut Accumulator, block: &RecordBatch) -> Result<()> {
        let arr = numeric_column(block, &self.column)?;
        let v = compute::sum(&arr).unwrap_or_default();
        match acc {
            Accumulator::Sum(sum) => *sum += v,
            other => return Err(accumulator_mismatch(self.function_type(), other)),
        }

        Ok(())
    }

    fn merge(&self, acc: &mut Accumulator, other: &Accumulator) -> Result<()> {
        match (acc, other) {
            (Accumulator::Sum(sum), Accumulator::Sum(v)) => *sum += v,
            (_, other) => return Err(accumulator_mismatch(self.function_type(), other)),
        }

        Ok(())
    }

    fn evaluate(&self, acc: &Accumulator) -> Result<ScalarValue> {
        match acc {
            Accumulator::Sum(sum) => Ok(ScalarValue::Float64(Some(*sum))),
            other => Err(accumulator_mismatch(self.function_type(), other)),
        }
    }
}
