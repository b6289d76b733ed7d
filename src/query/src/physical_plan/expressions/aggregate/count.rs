use arrow::array::Array;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use common::query::AggregateFunction;
use datafusion_common::ScalarValue;

use crate::error::Result;
use crate::physical_plan::expressions::aggregate::accumulator_mismatch;
use crate::physical_plan::expressions::aggregate::input_column;
use crate::physical_plan::expressions::aggregate::Accumulator;
use crate::physical_plan::expressions::aggregate::AggregationFunction;

/// `count(*)` counts rows, `count(col)` counts non-null values of `col`.
#[derive(Debug, Clone)]
pub struct Count {
    column: Option<String>,
}

impl Count {
    pub fn new(column: Option<String>) -> Self {
        Self { column }
    }
}

impl AggregationFunction for Count {
    fn function_type(&self) -> AggregateFunction {
        AggregateFunction::Count
    }

    fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    fn result_type(&self) -> DataType {
        DataType::Int64
    }

    fn create_accumulator(&self) -> Accumulator {
        Accumulator::Count(0)
    }

    fn aggregate(&self, acc: &mut Accumulator, block: &RecordBatch) -> Result<()> {
        let n = match &self.column {
            None => block.num_rows(),
            Some(col) => {
                let arr = input_column(block, col)?;
                arr.len() - arr.null_count()
            }
        };

        match acc {
            Accumulator::Count(count) => *count += n as i64,
            other => return Err(accumulator_mismatch(self.function_type(), other)),
        }

        Ok(())
    }

    fn merge(&self, acc: &mut Accumulator, other: &Accumulator) -> Result<()> {
        match (acc, other) {
            (Accumulator::Count(count), Accumulator::Count(v)) => *count += v,
            (_, other) => return Err(accumulator_mismatch(self.function_type(), other)),
        }

        Ok(())
    }

    fn evaluate(&self, acc: &Accumulator) -> Result<ScalarValue> {
        match acc {
            Accumulator::Count(count) => Ok(ScalarValue::Int64(Some(*count))),
            other => Err(accumulator_mismatch(self.function_type(), other)),
        }
    }
}
