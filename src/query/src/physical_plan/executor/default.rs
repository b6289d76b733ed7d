use std::sync::Arc;

use arrow::record_batch::RecordBatch;

use crate::error::QueryError;
use crate::error::Result;
use crate::physical_plan::executor::AggregationExecutor;
use crate::physical_plan::expressions::aggregate::Accumulator;
use crate::physical_plan::expressions::aggregate::AggregationFunction;
use crate::physical_plan::ValueBlock;

/// Aggregates raw documents.
#[derive(Debug)]
pub struct DefaultAggregationExecutor {
    functions: Vec<Arc<dyn AggregationFunction>>,
    accumulators: Vec<Accumulator>,
}

impl DefaultAggregationExecutor {
    pub fn new(functions: Vec<Arc<dyn AggregationFunction>>) -> Self {
        let accumulators = functions.iter().map(|f| f.create_accumulator()).collect();
        Self {
            functions,
            accumulators,
        }
    }
}

pub(super) fn aggregate_documents(
    functions: &[Arc<dyn AggregationFunction>],
    accumulators: &mut [Accumulator],
    batch: &RecordBatch,
) -> Result<()> {
    for (f, acc) in functions.iter().zip(accumulators.iter_mut()) {
        f.aggregate(acc, batch)?;
    }

    Ok(())
}

impl AggregationExecutor for DefaultAggregationExecutor {
    fn name(&self) -> &'static str {
        "default"
    }

    fn aggregate(&mut self, block: &ValueBlock) -> Result<()> {
        match block {
            ValueBlock::Documents(batch) => {
                aggregate_documents(&self.functions, &mut self.accumulators, batch)
            }
            ValueBlock::StarTreeNode(id) => Err(QueryError::Internal(format!(
                "star-tree node {id} passed to the default executor"
            ))),
        }
    }

    fn result(self: Box<Self>) -> Vec<Accumulator> {
        self.accumulators
    }
}
