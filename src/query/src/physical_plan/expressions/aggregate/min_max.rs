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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Min,
    Max,
}

/// Minimum or maximum of non-null values as Float64. Null over empty input.
#[derive(Debug, Clone)]
pub struct MinMax {
    column: String,
    kind: Kind,
}

impl MinMax {
    pub fn new_min(column: String) -> Self {
        Self {
            column,
            kind: Kind::Min,
        }
    }

    pub fn new_max(column: String) -> Self {
        Self {
            column,
            kind: Kind::Max,
        }
    }

    fn pick(&self, a: Option<f64>, b: Option<f64>) -> Option<f64> {
        match (a, b) {
            (Some(a), Some(b)) => Some(match self.kind {
                Kind::Min => a.min(b),
                Kind::Max => a.max(b),
            }),
            (a, None) => a,
            (None, b) => b,
        }
    }

    fn state<'a>(&self, acc: &'a mut Accumulator) -> Result<&'a mut Option<f64>> {
        match (self.kind, acc) {
            (Kind::Min, Accumulator::Min(v)) | (Kind::Max, Accumulator::Max(v)) => Ok(v),
            (_, other) => Err(accumulator_mismatch(self.function_type(), other)),
        }
    }
}

impl AggregationFunction for MinMax {
    fn function_type(&self) -> AggregateFunction {
        match self.kind {
            Kind::Min => AggregateFunction::Min,
            Kind::Max => AggregateFunction::Max,
        }
    }

    fn column(&self) -> Option<&str> {
        Some(&self.column)
    }

    fn result_type(&self) -> DataType {
        DataType::Float64
    }

    fn create_accumulator(&self) -> Accumulator {
        match self.kind {
            Kind::Min => Accumulator::Min(None),
            Kind::Max => Accumulator::Max(None),
        }
    }

    fn aggregate(&self, acc: &mut Accumulator, block: &RecordBatch) -> Result<()> {
        let arr = numeric_column(block, &self.column)?;
        let v = match self.kind {
            Kind::Min => compute::min(&arr),
            Kind::Max => compute::max(&arr),
        };
        let state = self.state(acc)?;
        *state = self.pick(*state, v);

        Ok(())
    }

    fn merge(&self, acc: &mut Accumulator, other: &Accumulator) -> Result<()> {
        let v = match (self.kind, other) {
            (Kind::Min, Accumulator::Min(v)) | (Kind::Max, Accumulator::Max(v)) => *v,
            (_, other) => return Err(accumulator_mismatch(self.function_type(), other)),
        };
        let state = self.state(acc)?;
        *state = self.pick(*state, v);

        Ok(())
    }

    fn evaluate(&self, acc: &Accumulator) -> Result<ScalarValue> {
        match (self.kind, acc) {
            (Kind::Min, Accumulator::Min(v)) | (Kind::Max, Accumulator::Max(v)) => {
                Ok(ScalarValue::Float64(*v))
            }
            (_, other) => Err(accumulator_mismatch(self.function_type(), other)),
        }
    }
}
